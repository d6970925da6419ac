//! Authentication primitives for the library service
//!
//! Password hashing, bearer token issuance/validation and account field
//! validation. Storage of accounts is left to the caller.

pub mod error;
pub mod jwt;
pub mod password;
pub mod validation;

pub use error::{AuthError, AuthResult};
pub use jwt::{Claims, JwtConfig, JwtService, SigningKeys};
pub use password::{hash_password, verify_password};
pub use validation::{ValidationError, validate_email, validate_password, validate_username};
