//! JWT service for bearer token generation and validation
//!
//! Tokens carry a fixed payload: the numeric user id in `sub`, the user's
//! role at issue time, and the usual `iat`/`exp` timestamps. Tokens are
//! signed with HS256 from a shared secret, or with RS256 when a PEM key pair
//! is configured.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use crate::error::{AuthError, AuthResult};

/// Default access token lifetime: one day
pub const DEFAULT_ACCESS_TOKEN_EXPIRY: u64 = 86_400;

/// Signing material for tokens
#[derive(Debug, Clone)]
pub enum SigningKeys {
    /// HS256 shared secret
    Secret(String),
    /// RS256 key pair in PEM format
    Rsa {
        private_key: String,
        public_key: String,
    },
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub keys: SigningKeys,
    /// Access token expiration time in seconds
    pub access_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY` / `JWT_PUBLIC_KEY`: RS256 key pair, either PEM text
    ///   or a path to a PEM file. Takes precedence over `JWT_SECRET`.
    /// - `JWT_SECRET`: HS256 shared secret
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 86400)
    pub fn from_env() -> AuthResult<Self> {
        let private_key = std::env::var("JWT_PRIVATE_KEY").ok();
        let public_key = std::env::var("JWT_PUBLIC_KEY").ok();

        let keys = match (private_key, public_key) {
            (Some(private_key), Some(public_key)) => SigningKeys::Rsa {
                private_key: read_pem(&private_key, "private")?,
                public_key: read_pem(&public_key, "public")?,
            },
            (Some(_), None) | (None, Some(_)) => {
                return Err(AuthError::Configuration(
                    "JWT_PRIVATE_KEY and JWT_PUBLIC_KEY must be set together".to_string(),
                ));
            }
            (None, None) => {
                let secret = std::env::var("JWT_SECRET").map_err(|_| {
                    AuthError::Configuration(
                        "JWT_SECRET environment variable not set".to_string(),
                    )
                })?;
                SigningKeys::Secret(secret)
            }
        };

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRY);

        Ok(JwtConfig {
            keys,
            access_token_expiry,
        })
    }

    /// HS256 configuration with the default expiry
    pub fn with_secret(secret: impl Into<String>) -> Self {
        JwtConfig {
            keys: SigningKeys::Secret(secret.into()),
            access_token_expiry: DEFAULT_ACCESS_TOKEN_EXPIRY,
        }
    }
}

/// Accept PEM text as-is; anything else is a file path, tried relative to
/// the working directory and then to the crate root.
fn read_pem(value: &str, kind: &str) -> AuthResult<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }

    std::fs::read_to_string(value)
        .or_else(|_| {
            let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            path.push(value);
            std::fs::read_to_string(path)
        })
        .map(|pem| pem.trim().to_string())
        .map_err(|e| AuthError::Configuration(format!("Failed to read {} key file: {}", kind, e)))
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    /// User role (`user` or `admin`)
    pub role: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        let (algorithm, encoding_key, decoding_key) = match &config.keys {
            SigningKeys::Secret(secret) => {
                if secret.is_empty() {
                    return Err(AuthError::Configuration(
                        "JWT secret must not be empty".to_string(),
                    ));
                }
                (
                    Algorithm::HS256,
                    EncodingKey::from_secret(secret.as_bytes()),
                    DecodingKey::from_secret(secret.as_bytes()),
                )
            }
            SigningKeys::Rsa {
                private_key,
                public_key,
            } => (
                Algorithm::RS256,
                EncodingKey::from_rsa_pem(private_key.as_bytes())?,
                DecodingKey::from_rsa_pem(public_key.as_bytes())?,
            ),
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;

        info!("JWT service initialized with {:?}", algorithm);

        Ok(JwtService {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user_id: i64, role: &str) -> AuthResult<String> {
        let now = now_secs()?;

        let claims = Claims {
            sub: user_id,
            role: role.to_string(),
            iat: now,
            exp: now + self.config.access_token_expiry,
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> AuthResult<String> {
        let token = encode(&Header::new(self.algorithm), claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

fn now_secs() -> AuthResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AuthError::Clock(e.to_string()))
}
