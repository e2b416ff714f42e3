//! Request extractors that reject with [`ApiError`]
//!
//! The stock axum extractors answer malformed input with plain-text bodies;
//! these wrappers keep every error response in the JSON format of the API.

use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use common::error::FieldErrors;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;

/// JSON body that has been deserialized and validated
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| ApiError::Validation(field_errors(&errors)))?;

        Ok(Self(value))
    }
}

/// Query string parameters
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        Ok(Self(value))
    }
}

/// Path parameters; a segment that does not parse is treated as an unknown resource
#[derive(Debug)]
pub struct PathParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParams<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;

        Ok(Self(value))
    }
}

/// Take a field the validator already required
pub fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::field(field, "This field is required."))
}

/// Flatten validator errors into messages keyed by field
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();

    for (field, errors) in errors.field_errors() {
        for error in errors {
            fields.add(field.to_string(), message(error));
        }
    }

    fields
}

fn message(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let number = |name: &str| error.params.get(name).and_then(|value| value.as_f64());

    match error.code.as_ref() {
        "required" => "This field is required.".to_string(),
        "email" => "Enter a valid email address.".to_string(),
        "length" => {
            let length = error
                .params
                .get("value")
                .and_then(|value| value.as_str())
                .map(|value| value.chars().count() as f64);

            match (length, number("min"), number("max")) {
                (Some(length), Some(_), _) if length == 0.0 => {
                    "This field may not be blank.".to_string()
                }
                (Some(length), Some(min), _) if length < min => {
                    format!("Ensure this field has at least {} characters.", min)
                }
                (_, _, Some(max)) => {
                    format!("Ensure this field has no more than {} characters.", max)
                }
                _ => "Invalid length.".to_string(),
            }
        }
        "range" => match (number("min"), number("max")) {
            (Some(min), Some(max)) => format!("Ensure this value is between {} and {}.", min, max),
            (Some(min), None) => format!("Ensure this value is greater than or equal to {}.", min),
            (None, Some(max)) => format!("Ensure this value is less than or equal to {}.", max),
            (None, None) => "Value out of range.".to_string(),
        },
        code => format!("Invalid value ({}).", code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    struct Payload {
        #[validate(required, length(min = 1, max = 5))]
        name: Option<String>,
        #[validate(required, range(min = 1, max = 10))]
        score: Option<i16>,
        #[validate(email)]
        email: Option<String>,
    }

    fn errors_for(value: serde_json::Value) -> FieldErrors {
        let payload: Payload = serde_json::from_value(value).unwrap();
        field_errors(&payload.validate().unwrap_err())
    }

    #[test]
    fn test_required_fields() {
        let errors = errors_for(json!({}));
        assert_eq!(errors.get("name"), Some(&["This field is required.".to_string()][..]));
        assert_eq!(errors.get("score"), Some(&["This field is required.".to_string()][..]));
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn test_length_messages() {
        let errors = errors_for(json!({"name": "far too long", "score": 5}));
        assert_eq!(
            errors.get("name"),
            Some(&["Ensure this field has no more than 5 characters.".to_string()][..])
        );
    }

    #[test]
    fn test_range_and_email_messages() {
        let errors = errors_for(json!({"name": "ok", "score": 11, "email": "nope"}));
        assert_eq!(
            errors.get("score"),
            Some(&["Ensure this value is between 1 and 10.".to_string()][..])
        );
        assert_eq!(
            errors.get("email"),
            Some(&["Enter a valid email address.".to_string()][..])
        );
    }

    #[test]
    fn test_custom_message_wins() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "username",
            auth::validation::validation_error("username_reserved", "Username 'me' is not allowed"),
        );

        let fields = field_errors(&errors);
        assert_eq!(
            fields.get("username"),
            Some(&["Username 'me' is not allowed".to_string()][..])
        );
    }
}
