//! Review and comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Review of a title
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Review {
    pub id: i64,
    #[serde(skip)]
    pub title_id: i64,
    pub text: String,
    /// Author username
    pub author: String,
    #[serde(skip)]
    pub author_id: i64,
    pub score: i16,
    pub pub_date: DateTime<Utc>,
}

/// Request for creating a review
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(required, length(min = 1))]
    pub text: Option<String>,
    #[validate(required, range(min = 1, max = 10))]
    pub score: Option<i16>,
}

/// Partial review update
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 10))]
    pub score: Option<i16>,
}

/// Comment on a review
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Comment {
    pub id: i64,
    #[serde(skip)]
    pub review_id: i64,
    pub text: String,
    /// Author username
    pub author: String,
    #[serde(skip)]
    pub author_id: i64,
    pub pub_date: DateTime<Utc>,
}

/// Request for creating or updating a comment
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(required, length(min = 1))]
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_must_be_in_range() {
        for score in [0, 11, -3] {
            let request: CreateReviewRequest =
                serde_json::from_value(json!({"text": "Fine", "score": score})).unwrap();
            let errors = request.validate().unwrap_err();
            assert!(errors.field_errors().contains_key("score"), "accepted {}", score);
        }

        for score in [1, 10] {
            let request: CreateReviewRequest =
                serde_json::from_value(json!({"text": "Fine", "score": score})).unwrap();
            assert!(request.validate().is_ok());
        }
    }

    #[test]
    fn test_review_requires_text_and_score() {
        let request: CreateReviewRequest = serde_json::from_value(json!({})).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("text"));
        assert!(fields.contains_key("score"));
    }

    #[test]
    fn test_empty_update_is_valid() {
        let request: UpdateReviewRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_review_serializes_author_username() {
        let review = Review {
            id: 1,
            title_id: 2,
            text: "Great".to_string(),
            author: "reader".to_string(),
            author_id: 3,
            score: 9,
            pub_date: Utc::now(),
        };

        let value = serde_json::to_value(&review).unwrap();
        assert_eq!(value["author"], "reader");
        assert_eq!(value["score"], 9);
        assert!(value.get("author_id").is_none());
        assert!(value.get("title_id").is_none());
    }
}
