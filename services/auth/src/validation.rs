//! Input validation utilities shared by the request payloads

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// Maximum username length
pub const USERNAME_MAX_LENGTH: u64 = 150;

/// Maximum email length
pub const EMAIL_MAX_LENGTH: u64 = 254;

/// Reserved for the current-user endpoint
const RESERVED_USERNAME: &str = "me";

/// Build a validation error carrying a human readable message
pub fn validation_error(code: &'static str, message: &str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.to_string().into());
    error
}

/// Validate username characters and reserved names
///
/// Length is checked separately through `#[validate(length)]`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(validation_error(
            "username_invalid_chars",
            "Username may contain only letters, digits and @/./+/-/_ characters",
        ));
    }

    if username.to_lowercase() == RESERVED_USERNAME {
        return Err(validation_error(
            "username_reserved",
            "Username 'me' is not allowed",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        for username in ["alice", "bob.smith", "carol+reviews", "dave@home", "eve-1_2", "Ünïcode"] {
            assert!(validate_username(username).is_ok(), "rejected {:?}", username);
        }
    }

    #[test]
    fn test_invalid_characters() {
        for username in ["", "with space", "semi;colon", "slash/name", "hash#tag"] {
            let err = validate_username(username).unwrap_err();
            assert_eq!(err.code, "username_invalid_chars");
        }
    }

    #[test]
    fn test_reserved_username() {
        for username in ["me", "ME", "Me"] {
            let err = validate_username(username).unwrap_err();
            assert_eq!(err.code, "username_reserved");
        }
        assert!(validate_username("meg").is_ok());
    }

    #[test]
    fn test_validation_error_carries_message() {
        let err = validation_error("code", "Something is wrong");
        assert_eq!(err.code, "code");
        assert_eq!(err.message.as_deref(), Some("Something is wrong"));
    }
}
