//! Seeding of the first administrator
//!
//! Every catalog write and all user management require an administrator, so
//! a fresh deployment names one through the environment. The account signs in
//! like any other user, through a confirmation code sent to its email.

use anyhow::Result;
use common::error::DatabaseResult;
use tracing::info;
use validator::ValidateEmail;

use crate::models::{NewUser, Role, User};
use crate::repositories::UserRepository;
use crate::validation::{EMAIL_MAX_LENGTH, USERNAME_MAX_LENGTH, validate_username};

/// Administrator account to make sure of at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub username: String,
    pub email: String,
}

impl AdminConfig {
    /// Create a new AdminConfig from environment variables
    ///
    /// # Environment Variables
    /// - `ADMIN_USERNAME`: Username of the administrator
    /// - `ADMIN_EMAIL`: Email of the administrator
    ///
    /// Both or neither must be set; `None` when neither is.
    pub fn from_env() -> Result<Option<Self>> {
        let username = std::env::var("ADMIN_USERNAME").ok();
        let email = std::env::var("ADMIN_EMAIL").ok();

        let (username, email) = match (username, email) {
            (Some(username), Some(email)) => (username, email),
            (None, None) => return Ok(None),
            _ => anyhow::bail!("ADMIN_USERNAME and ADMIN_EMAIL must be set together"),
        };

        if username.chars().count() as u64 > USERNAME_MAX_LENGTH {
            anyhow::bail!("ADMIN_USERNAME is longer than {} characters", USERNAME_MAX_LENGTH);
        }
        validate_username(&username)
            .map_err(|e| anyhow::anyhow!("Invalid ADMIN_USERNAME: {}", e))?;

        if email.chars().count() as u64 > EMAIL_MAX_LENGTH || !email.validate_email() {
            anyhow::bail!("Invalid ADMIN_EMAIL: {}", email);
        }

        Ok(Some(AdminConfig { username, email }))
    }
}

/// Make sure the configured administrator exists and is a superuser
///
/// An existing account with that username is promoted; otherwise one is
/// created with the admin role.
pub async fn ensure_admin(users: &UserRepository, config: &AdminConfig) -> DatabaseResult<User> {
    if let Some(user) = users.grant_superuser(&config.username).await? {
        info!("Administrator {} already exists", user.username);
        return Ok(user);
    }

    let user = users
        .create(&NewUser {
            username: config.username.clone(),
            email: config.email.clone(),
            role: Role::Admin,
            is_superuser: true,
            ..NewUser::default()
        })
        .await?;

    info!("Created administrator {}", user.username);
    Ok(user)
}
