//! Sign-up and token exchange
//!
//! [`AuthService`] composes the identity store, the confirmation code service,
//! the token issuer and the rate limiter into the two public flows:
//!
//! 1. `signup(username, email)` finds or creates the account and emails it a
//!    confirmation code.
//! 2. `exchange_code(username, code)` verifies the code and returns an access
//!    token, consuming the code in the process.

use common::error::{DatabaseError, FieldErrors};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::confirmation::ConfirmationCodeService;
use crate::jwt::JwtService;
use crate::mailer::MailError;
use crate::models::{NewUser, User};
use crate::rate_limiter::RateLimiter;
use crate::repositories::UserRepository;

const USERNAME_TAKEN: &str = "A user with this username already exists.";
const EMAIL_TAKEN: &str = "A user with this email already exists.";

/// Errors raised by the authentication flows
#[derive(Error, Debug)]
pub enum AuthError {
    /// Input was rejected; messages are keyed by field
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// No account with the given username
    #[error("User not found")]
    UserNotFound,

    /// The confirmation code is malformed, expired, consumed or forged
    #[error("Invalid confirmation code")]
    InvalidCode,

    /// The bearer token is invalid or its user is gone
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Too many code exchange attempts for this username
    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    /// The confirmation code could not be delivered
    #[error("Failed to deliver confirmation code: {0}")]
    MailDelivery(#[from] MailError),

    /// Token signing failed
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Authentication flows over the identity store
#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    codes: ConfirmationCodeService,
    jwt: JwtService,
    limiter: RateLimiter,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        codes: ConfirmationCodeService,
        jwt: JwtService,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            users,
            codes,
            jwt,
            limiter,
        }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Register an account, or re-send a code to an existing one
    ///
    /// The pair must either be unknown or belong to one account. The account
    /// is created in the same transaction that sends the code, so a delivery
    /// failure leaves no account behind.
    pub async fn signup(&self, username: &str, email: &str) -> Result<User, AuthError> {
        let mut tx = self.users.pool().begin().await.map_err(DatabaseError::from)?;

        let by_username = UserRepository::find_by_username_in(&mut tx, username).await?;
        let by_email = UserRepository::find_by_email_in(&mut tx, email).await?;

        let user = match (by_username, by_email) {
            (Some(a), Some(b)) if a.id == b.id => {
                info!("Re-sending confirmation code to user {}", a.id);
                a
            }
            (None, None) => UserRepository::insert(&mut tx, &NewUser::signup(username, email))
                .await
                .map_err(|e| match e.constraint() {
                    Some(constraint) if e.is_unique_violation() => {
                        warn!("Concurrent sign-up lost on {}", constraint);
                        AuthError::Validation(taken_field_errors(constraint))
                    }
                    _ => AuthError::Database(e),
                })?,
            (by_username, by_email) => {
                let mut errors = FieldErrors::new();
                if by_username.is_some() {
                    errors.add("username", USERNAME_TAKEN);
                }
                if by_email.is_some() {
                    errors.add("email", EMAIL_TAKEN);
                }
                return Err(AuthError::Validation(errors));
            }
        };

        self.codes.generate_and_send(&user).await.map_err(|e| {
            error!("Failed to send confirmation code to user {}: {}", user.id, e);
            AuthError::MailDelivery(e)
        })?;

        tx.commit().await.map_err(DatabaseError::from)?;
        Ok(user)
    }

    /// Exchange a confirmation code for an access token
    pub async fn exchange_code(&self, username: &str, code: &str) -> Result<String, AuthError> {
        if !self.limiter.is_allowed(username).await {
            warn!("Too many code exchange attempts for {}", username);
            return Err(AuthError::TooManyAttempts);
        }

        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.codes.verify_code(&user, code) {
            warn!("Invalid confirmation code for user {}", user.id);
            self.limiter.record_failure(username).await;
            return Err(AuthError::InvalidCode);
        }

        let token = self.jwt.generate_access_token(&user)?;

        // Moving last_login invalidates the code; losing this race means
        // another request consumed it first
        if !self.users.record_login(user.id, user.last_login).await? {
            warn!("Confirmation code for user {} already consumed", user.id);
            return Err(AuthError::InvalidCode);
        }

        self.limiter.reset(username).await;
        info!("Issued access token for user {}", user.id);
        Ok(token)
    }

    /// Resolve a bearer token to its user
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self
            .jwt
            .validate_token(token)
            .map_err(|_| AuthError::InvalidToken)?;

        self.users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)
    }
}

/// Field error for a unique constraint on the users table
pub fn taken_field_errors(constraint: &str) -> FieldErrors {
    match constraint {
        "users_email_key" => FieldErrors::single("email", EMAIL_TAKEN),
        _ => FieldErrors::single("username", USERNAME_TAKEN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taken_field_errors() {
        let email = taken_field_errors("users_email_key");
        assert_eq!(email.get("email"), Some(&[EMAIL_TAKEN.to_string()][..]));
        assert!(email.get("username").is_none());

        let username = taken_field_errors("users_username_key");
        assert_eq!(username.get("username"), Some(&[USERNAME_TAKEN.to_string()][..]));
    }

    #[test]
    fn test_mail_error_converts() {
        let err = AuthError::from(MailError::Rejected { status: 502 });
        assert!(matches!(err, AuthError::MailDelivery(_)));
        assert_eq!(
            err.to_string(),
            "Failed to deliver confirmation code: Mail relay rejected the message with status 502"
        );
    }
}
