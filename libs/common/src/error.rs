//! Custom error types for the common library
//!
//! This module defines application-specific error types that can be used
//! throughout the application.

use serde::Serialize;
use sqlx::Error as SqlxError;
use std::collections::BTreeMap;
use thiserror::Error;

/// SQLSTATE raised by PostgreSQL when a unique constraint rejects a write
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE raised by PostgreSQL when a foreign key rejects a write or delete
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {}", constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },

    /// A foreign key rejected the write or delete
    #[error("Foreign key constraint violated: {}", constraint.as_deref().unwrap_or("unknown"))]
    ForeignKeyViolation { constraint: Option<String> },

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl DatabaseError {
    /// Whether the error was raised by a unique constraint
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DatabaseError::UniqueViolation { .. })
    }

    /// Name of the constraint that rejected the statement, when known
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DatabaseError::UniqueViolation { constraint }
            | DatabaseError::ForeignKeyViolation { constraint } => constraint.as_deref(),
            _ => None,
        }
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            let constraint = db_err.constraint().map(str::to_string);
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => return DatabaseError::UniqueViolation { constraint },
                Some(FOREIGN_KEY_VIOLATION) => {
                    return DatabaseError::ForeignKeyViolation { constraint };
                }
                _ => {}
            }
        }

        DatabaseError::Query(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::Migration(err.to_string())
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Validation messages collected per input field
///
/// Serializes as `{"field": ["message", ...]}` so every rejected field is
/// reported in a single response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty error set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error set holding a single message
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages recorded for a field
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "This email is already taken.");
        errors.add("username", "This username is already taken.");
        errors.add("email", "Enter a valid email address.");

        assert_eq!(errors.get("email").map(<[String]>::len), Some(2));
        assert_eq!(errors.get("username").map(<[String]>::len), Some(1));
        assert!(errors.get("bio").is_none());

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "email": ["This email is already taken.", "Enter a valid email address."],
                "username": ["This username is already taken."],
            })
        );
    }

    #[test]
    fn test_field_errors_into_result() {
        assert!(FieldErrors::new().into_result().is_ok());

        let mut errors = FieldErrors::single("score", "Must be between 1 and 10.");
        errors.add("score", "Required.");
        let err = errors.into_result().unwrap_err();
        assert_eq!(err.get("score").unwrap().len(), 2);
    }

    #[test]
    fn test_non_database_errors_map_to_query() {
        let err = DatabaseError::from(SqlxError::RowNotFound);
        assert!(matches!(err, DatabaseError::Query(_)));
        assert!(!err.is_unique_violation());
        assert_eq!(err.constraint(), None);
    }

    #[test]
    fn test_constraint_accessor() {
        let err = DatabaseError::UniqueViolation {
            constraint: Some("reviews_title_author_key".to_string()),
        };
        assert!(err.is_unique_violation());
        assert_eq!(err.constraint(), Some("reviews_title_author_key"));
        assert_eq!(
            err.to_string(),
            "Unique constraint violated: reviews_title_author_key"
        );
    }
}
