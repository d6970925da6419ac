//! Error type for the authentication primitives

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or unreadable signing material
    #[error("JWT configuration error: {0}")]
    Configuration(String),

    /// Token could not be signed, or failed signature/expiry validation
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Password hashing failed or a stored hash is malformed
    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("System clock error: {0}")]
    Clock(String),
}

pub type AuthResult<T> = Result<T, AuthError>;
