//! User and authentication payloads

use auth::models::{Role, UpdateUser, User};
use auth::validation::{EMAIL_MAX_LENGTH, USERNAME_MAX_LENGTH, validate_username};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Public representation of a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
        }
    }
}

/// Request for sign-up
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        required,
        length(min = 1, max = USERNAME_MAX_LENGTH),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(required, email, length(max = EMAIL_MAX_LENGTH))]
    pub email: Option<String>,
}

/// Response for sign-up
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

/// Request for exchanging a confirmation code
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(
        required,
        length(min = 1, max = USERNAME_MAX_LENGTH),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(required, length(min = 1))]
    pub confirmation_code: Option<String>,
}

/// Response for token generation
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Request for creating a user as an admin
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        required,
        length(min = 1, max = USERNAME_MAX_LENGTH),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(required, email, length(max = EMAIL_MAX_LENGTH))]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

/// Partial user update; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 1, max = USERNAME_MAX_LENGTH),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(email, length(max = EMAIL_MAX_LENGTH))]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUserRequest {
    /// Convert into a store update, keeping the role only when `allow_role` is set
    pub fn into_update(self, allow_role: bool) -> UpdateUser {
        UpdateUser {
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            role: self.role.filter(|_| allow_role),
        }
    }
}

/// Query parameters for the user listing
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    /// Username fragment
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_signup_collects_missing_fields() {
        let request: SignupRequest = serde_json::from_value(json!({})).unwrap();
        let errors = request.validate().unwrap_err();

        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_signup_rejects_bad_values() {
        let request: SignupRequest = serde_json::from_value(json!({
            "username": "me",
            "email": "not-an-email",
        }))
        .unwrap();
        let errors = request.validate().unwrap_err();

        let fields = errors.field_errors();
        assert_eq!(fields["username"][0].code, "username_reserved");
        assert_eq!(fields["email"][0].code, "email");
    }

    #[test]
    fn test_signup_enforces_length_limits() {
        let longest = "a".repeat(USERNAME_MAX_LENGTH as usize);
        let request: SignupRequest = serde_json::from_value(json!({
            "username": longest,
            "email": "long@example.com",
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let request: SignupRequest = serde_json::from_value(json!({
            "username": "a".repeat(USERNAME_MAX_LENGTH as usize + 1),
            "email": format!("{}@example.com", "b".repeat(EMAIL_MAX_LENGTH as usize)),
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
    }

    #[test]
    fn test_valid_signup() {
        let request: SignupRequest = serde_json::from_value(json!({
            "username": "reader.one",
            "email": "reader@example.com",
        }))
        .unwrap();

        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_role_is_dropped_unless_allowed() {
        let request = UpdateUserRequest {
            bio: Some("Hi".to_string()),
            role: Some(Role::Admin),
            ..Default::default()
        };
        let update = request.into_update(false);
        assert_eq!(update.role, None);
        assert_eq!(update.bio.as_deref(), Some("Hi"));

        let request = UpdateUserRequest {
            role: Some(Role::Moderator),
            ..Default::default()
        };
        assert_eq!(request.into_update(true).role, Some(Role::Moderator));
    }

    #[test]
    fn test_user_response_hides_internal_fields() {
        let value = serde_json::to_value(UserResponse {
            username: "reader".to_string(),
            email: "reader@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: Role::User,
        })
        .unwrap();

        assert_eq!(value["role"], "user");
        assert!(value.get("id").is_none());
        assert!(value.get("is_superuser").is_none());
    }
}
