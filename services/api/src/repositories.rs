//! Repositories for database operations
//!
//! Each repository owns a clone of the pool handed to it at construction.
//! Workflows that both check and write start with the write, so SQLite takes
//! its write lock before anything is read.

use chrono::Utc;
use common::error::DatabaseError;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::models::{NewUser, Role, User};

pub mod book;
pub mod borrow;
pub mod review;

pub use book::BookRepository;
pub use borrow::BorrowRepository;
pub use review::ReviewRepository;

/// Domain-level failure of a repository operation
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The named resource does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::Database(DatabaseError::Query(e))
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// The constraint message of a UNIQUE violation, e.g.
/// `UNIQUE constraint failed: users.email`
pub(crate) fn unique_violation(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => Some(db.message().to_string()),
        _ => None,
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, is_active, created_at";

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, new_user: &NewUser) -> RepositoryResult<User> {
        info!("Creating new user: {}", new_user.username);

        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role, is_active, created_at)
             VALUES (?, ?, ?, ?, 1, ?)
             RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(new_user.role)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(msg) if msg.contains("users.email") => {
                    RepositoryError::Conflict("Email already exists".to_string())
                }
                Some(_) => RepositoryError::Conflict("Username already exists".to_string()),
                None => e.into(),
            })
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Change a user's role. Only used by the startup admin bootstrap.
    pub async fn set_role(&self, id: i64, role: Role) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("User"));
        }
        Ok(())
    }
}
