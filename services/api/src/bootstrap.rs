//! Startup provisioning of the administrator account

use std::env;

use auth::{hash_password, validate_email, validate_password, validate_username};
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    models::{NewUser, Role, User},
    repositories::UserRepository,
};

/// Administrator credentials taken from `ADMIN_USERNAME`, `ADMIN_EMAIL` and
/// `ADMIN_PASSWORD`
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AdminBootstrap {
    /// `None` unless all three variables are set and non-empty
    pub fn from_env() -> Option<Self> {
        let read = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
        Some(Self {
            username: read("ADMIN_USERNAME")?.trim().to_string(),
            email: read("ADMIN_EMAIL")?.trim().to_string(),
            password: read("ADMIN_PASSWORD")?,
        })
    }

    /// Make sure an admin account with this email exists. An existing
    /// account keeps its password and is promoted if needed.
    pub async fn ensure_admin(&self, users: &UserRepository) -> ApiResult<User> {
        if let Some(existing) = users.find_by_email(&self.email).await? {
            if existing.role != Role::Admin {
                users.set_role(existing.id, Role::Admin).await?;
                info!("Promoted {} to admin", existing.username);
            }
            return users
                .find_by_id(existing.id)
                .await?
                .ok_or_else(|| ApiError::NotFound("User not found".to_string()));
        }

        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;

        let admin = users
            .create(&NewUser {
                username: self.username.clone(),
                email: self.email.clone(),
                password_hash: hash_password(&self.password)?,
                role: Role::Admin,
            })
            .await?;

        info!("Created admin account {}", admin.username);
        Ok(admin)
    }
}
