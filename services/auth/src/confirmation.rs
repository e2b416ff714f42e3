//! Confirmation codes for the sign-up flow
//!
//! Codes are never stored. A code is `<timestamp-hex>-<digest-hex>` where the
//! digest is an HMAC-SHA256 over the user's identity and mutable state plus
//! the issue timestamp. Verification recomputes the digest from the user as
//! it is now, so changing the email or role, or logging in (which moves
//! `last_login`), invalidates every outstanding code.

use anyhow::Result;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, warn};

use crate::mailer::{EmailMessage, MailError, Mailer};
use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

/// Namespaces the digest so the secret can be shared with other signers
const KEY_SALT: &str = "critiq.auth.ConfirmationCodeService";

/// Number of digest bytes kept in a code
const DIGEST_BYTES: usize = 16;

/// Separates the hashed fields
const FIELD_SEPARATOR: &[u8] = b"\x1f";

/// Confirmation code configuration
#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    /// Secret used to sign codes
    pub secret: String,
    /// How long a code stays valid, in seconds (default: 3 days)
    pub timeout_seconds: i64,
}

impl ConfirmationConfig {
    /// Create a new ConfirmationConfig from environment variables
    ///
    /// # Environment Variables
    /// - `CONFIRMATION_SECRET`: Secret used to sign codes (falls back to `JWT_SECRET`)
    /// - `CONFIRMATION_CODE_TIMEOUT`: Code lifetime in seconds (default: 259200)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("CONFIRMATION_SECRET")
            .or_else(|_| std::env::var("JWT_SECRET"))
            .map_err(|_| {
                anyhow::anyhow!("CONFIRMATION_SECRET or JWT_SECRET environment variable not set")
            })?;

        let timeout_seconds = std::env::var("CONFIRMATION_CODE_TIMEOUT")
            .unwrap_or_else(|_| "259200".to_string())
            .parse()
            .unwrap_or(259_200);

        Ok(ConfirmationConfig {
            secret,
            timeout_seconds,
        })
    }
}

/// Issues, delivers and verifies confirmation codes
#[derive(Clone)]
pub struct ConfirmationCodeService {
    config: ConfirmationConfig,
    mailer: Arc<dyn Mailer>,
}

impl ConfirmationCodeService {
    pub fn new(config: ConfirmationConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, mailer }
    }

    /// Derive a code for the user's current state
    pub fn issue_code(&self, user: &User) -> String {
        self.make_code(user, Utc::now().timestamp())
    }

    /// Check a code against the user's current state
    ///
    /// Malformed, tampered, future-dated and expired codes all yield `false`.
    pub fn verify_code(&self, user: &User, code: &str) -> bool {
        self.verify_code_at(user, code, Utc::now().timestamp())
    }

    /// Issue a code and email it to the user
    pub async fn generate_and_send(&self, user: &User) -> Result<String, MailError> {
        let code = self.issue_code(user);

        let message = EmailMessage {
            from: self.mailer.sender().to_string(),
            to: user.email.clone(),
            subject: "Your confirmation code".to_string(),
            body: format!(
                "Hello {},\n\nYour confirmation code: {}\n\nExchange it for an access token at /api/v1/auth/token.",
                user.username, code
            ),
        };

        self.mailer.send(&message).await?;
        info!("Confirmation code sent to user {}", user.id);

        Ok(code)
    }

    fn make_code(&self, user: &User, timestamp: i64) -> String {
        let digest = self.mac(user, timestamp).finalize().into_bytes();
        format!("{:x}-{}", timestamp, hex::encode(&digest[..DIGEST_BYTES]))
    }

    fn verify_code_at(&self, user: &User, code: &str, now: i64) -> bool {
        let Some((timestamp, digest)) = code.split_once('-') else {
            return false;
        };

        let Ok(timestamp) = i64::from_str_radix(timestamp, 16) else {
            return false;
        };

        let Ok(digest) = hex::decode(digest) else {
            return false;
        };

        if digest.len() != DIGEST_BYTES || timestamp > now {
            return false;
        }

        if now - timestamp > self.config.timeout_seconds {
            warn!("Expired confirmation code presented for user {}", user.id);
            return false;
        }

        self.mac(user, timestamp)
            .verify_truncated_left(&digest)
            .is_ok()
    }

    fn mac(&self, user: &User, timestamp: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .expect("HMAC can take key of any size");

        let last_login = user
            .last_login
            .map(|t| t.timestamp_micros().to_string())
            .unwrap_or_default();

        let fields = [
            KEY_SALT.to_string(),
            user.id.to_string(),
            user.username.clone(),
            user.email.clone(),
            user.role.as_str().to_string(),
            user.is_superuser.to_string(),
            last_login,
            timestamp.to_string(),
        ];

        for field in &fields {
            mac.update(field.as_bytes());
            mac.update(FIELD_SEPARATOR);
        }

        mac
    }
}
