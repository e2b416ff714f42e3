//! JWT service for access token generation and validation
//!
//! Tokens are signed with HS256 using a process-wide secret. There is no
//! refresh token: a client that lets its access token expire goes through
//! the confirmation code exchange again.

use anyhow::Result;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared secret used to sign and verify tokens
    pub secret: String,
    /// Access token expiration time in seconds (default: 1 day)
    pub access_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Secret used to sign tokens
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 86400)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        Ok(JwtConfig {
            secret,
            access_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    /// Unique token identifier
    pub jti: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token
    Access,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> jsonwebtoken::errors::Result<String> {
        let now = Utc::now().timestamp().max(0) as u64;

        let claims = Claims {
            sub: user.id,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + self.config.access_token_expiry,
            token_type: TokenType::Access,
        };

        self.encode_claims(&claims)
    }

    fn encode_claims(&self, claims: &Claims) -> jsonwebtoken::errors::Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    /// Validate a token and return the claims
    ///
    /// Anything other than an access token fails to deserialize into [`Claims`].
    pub fn validate_token(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_user;
    use jsonwebtoken::errors::ErrorKind;
    use serial_test::serial;

    fn service(secret: &str) -> JwtService {
        JwtService::new(JwtConfig {
            secret: secret.to_string(),
            access_token_expiry: 900,
        })
    }

    #[test]
    fn test_generated_token_validates() {
        let jwt = service("test-secret");
        let user = sample_user(42);

        let token = jwt.generate_access_token(&user).unwrap();
        let claims = jwt.validate_token(&token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_each_token_gets_its_own_id() {
        let jwt = service("test-secret");
        let user = sample_user(1);

        let first = jwt.validate_token(&jwt.generate_access_token(&user).unwrap()).unwrap();
        let second = jwt.validate_token(&jwt.generate_access_token(&user).unwrap()).unwrap();

        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = service("one-secret")
            .generate_access_token(&sample_user(7))
            .unwrap();

        let err = service("another-secret").validate_token(&token).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt = service("test-secret");
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: 3,
            jti: Uuid::new_v4(),
            iat: now - 7200,
            exp: now - 3600,
            token_type: TokenType::Access,
        };

        let token = jwt.encode_claims(&claims).unwrap();
        let err = jwt.validate_token(&token).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ExpiredSignature);
    }

    #[test]
    fn test_refresh_style_token_is_rejected() {
        let jwt = service("test-secret");
        let now = Utc::now().timestamp() as u64;
        let claims = serde_json::json!({
            "sub": 3,
            "jti": Uuid::new_v4(),
            "iat": now,
            "exp": now + 600,
            "token_type": "refresh",
        });

        let token = encode(&Header::new(Algorithm::HS256), &claims, &jwt.encoding_key).unwrap();
        assert!(jwt.validate_token(&token).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(service("test-secret").validate_token("not.a.token").is_err());
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        unsafe {
            std::env::set_var("JWT_SECRET", "from-env");
            std::env::remove_var("JWT_ACCESS_TOKEN_EXPIRY");
        }

        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.secret, "from-env");
        assert_eq!(config.access_token_expiry, 86400);

        unsafe {
            std::env::set_var("JWT_SECRET", "   ");
        }
        assert!(JwtConfig::from_env().is_err());

        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
        assert!(JwtConfig::from_env().is_err());
    }
}
