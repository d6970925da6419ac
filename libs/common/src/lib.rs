//! Common library for the library service
//!
//! This crate provides the persistence plumbing shared by the API server and
//! the overdue sweep: connection pooling, schema bootstrap, health checks
//! and the database error type.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     common::schema::apply(&pool).await?;
//!     println!("Database health check: {}", health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod schema;

pub use database::{DatabaseConfig, connect_in_memory, health_check, init_pool};
pub use error::{DatabaseError, DatabaseResult};
