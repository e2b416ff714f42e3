//! Catalog models: genres, categories and titles

use auth::validation::validation_error;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

/// Genre or category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CatalogEntry {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Request for creating a genre or category
#[derive(Debug, Deserialize, Validate)]
pub struct CatalogEntryRequest {
    #[validate(required, length(min = 1, max = 256))]
    pub name: Option<String>,
    #[validate(required, length(min = 1, max = 50), custom(function = "validate_slug"))]
    pub slug: Option<String>,
}

/// Query parameters for genre and category listings
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    /// Name fragment
    pub search: Option<String>,
}

/// Title as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub id: i64,
    pub name: String,
    pub year: i16,
    /// Rounded mean review score, `None` without reviews
    pub rating: Option<i32>,
    pub description: Option<String>,
    pub genre: Vec<CatalogEntry>,
    pub category: CatalogEntry,
}

/// Request for creating a title
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleRequest {
    #[validate(required, length(min = 1, max = 256))]
    pub name: Option<String>,
    #[validate(required, custom(function = "validate_year"))]
    pub year: Option<i16>,
    pub description: Option<String>,
    /// Genre slugs
    #[validate(required)]
    pub genre: Option<Vec<String>>,
    /// Category slug
    #[validate(required)]
    pub category: Option<String>,
}

/// Partial title update; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_year"))]
    pub year: Option<i16>,
    /// `Some(None)` for an explicit `null`, which clears the description
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub genre: Option<Vec<String>>,
    pub category: Option<String>,
}

/// New title with slugs already resolved to ids
#[derive(Debug, Clone)]
pub struct NewTitle {
    pub name: String,
    pub year: i16,
    pub description: Option<String>,
    pub category_id: i64,
    pub genre_ids: Vec<i64>,
}

/// Title update with slugs already resolved to ids
#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i16>,
    pub description: Option<Option<String>>,
    pub category_id: Option<i64>,
    pub genre_ids: Option<Vec<i64>>,
}

/// Tells an explicit `null` apart from a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Sort keys accepted by the title listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleOrderField {
    Name,
    Year,
    Rating,
}

/// Requested ordering of the title listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleOrdering {
    pub field: TitleOrderField,
    pub descending: bool,
}

impl TitleOrdering {
    /// Parse `name`, `-year`, `rating` and so on; unknown keys yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        let (descending, key) = match value.strip_prefix('-') {
            Some(key) => (true, key),
            None => (false, value),
        };

        let field = match key {
            "name" => TitleOrderField::Name,
            "year" => TitleOrderField::Year,
            "rating" => TitleOrderField::Rating,
            _ => return None,
        };

        Some(Self { field, descending })
    }
}

/// Query parameters for the title listing
#[derive(Debug, Default, Deserialize)]
pub struct TitleQuery {
    /// Genre slug
    pub genre: Option<String>,
    /// Category slug
    pub category: Option<String>,
    /// Name fragment
    pub name: Option<String>,
    pub year: Option<i16>,
    /// `name`, `year` or `rating`, `-` prefixed for descending order
    pub ordering: Option<String>,
}

/// Validated title listing filters
#[derive(Debug, Clone, Default)]
pub struct TitleFilter {
    pub genre: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub year: Option<i16>,
    /// `None` means the default ordering: newest first, then by name
    pub ordering: Option<TitleOrdering>,
}

impl TitleQuery {
    /// Validate the query; an unknown ordering key is a bad request
    pub fn into_filter(self) -> Result<TitleFilter, String> {
        let ordering = match self.ordering.as_deref() {
            None | Some("") => None,
            Some(value) => Some(
                TitleOrdering::parse(value)
                    .ok_or_else(|| format!("Unsupported ordering: {}", value))?,
            ),
        };

        Ok(TitleFilter {
            genre: self.genre,
            category: self.category,
            name: self.name,
            year: self.year,
            ordering,
        })
    }
}

/// Round a mean score half away from zero
pub fn round_rating(average: Option<f64>) -> Option<i32> {
    average.map(|avg| avg.round() as i32)
}

/// Slugs are letters, digits, hyphens and underscores
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(validation_error(
            "slug_invalid_chars",
            "Slug may contain only latin letters, digits, hyphens and underscores",
        ))
    }
}

/// A title cannot be from the future
pub fn validate_year(year: i16) -> Result<(), ValidationError> {
    let current_year = Utc::now().year();
    if i32::from(year) > current_year {
        return Err(validation_error(
            "year_in_future",
            &format!("Year cannot be greater than the current year ({})", current_year),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rating_rounds_mean_score() {
        let mean = |scores: &[i32]| {
            Some(scores.iter().sum::<i32>() as f64 / scores.len() as f64)
        };

        assert_eq!(round_rating(mean(&[8, 9, 10])), Some(9));
        assert_eq!(round_rating(mean(&[7, 8])), Some(8));
        assert_eq!(round_rating(mean(&[1, 1, 2])), Some(1));
        assert_eq!(round_rating(None), None);
    }

    #[test]
    fn test_ordering_parse() {
        assert_eq!(
            TitleOrdering::parse("-rating"),
            Some(TitleOrdering {
                field: TitleOrderField::Rating,
                descending: true,
            })
        );
        assert_eq!(
            TitleOrdering::parse("name"),
            Some(TitleOrdering {
                field: TitleOrderField::Name,
                descending: false,
            })
        );
        assert_eq!(TitleOrdering::parse("description"), None);
        assert_eq!(TitleOrdering::parse("--year"), None);
    }

    #[test]
    fn test_query_rejects_unknown_ordering() {
        let query = TitleQuery {
            ordering: Some("id; DROP TABLE titles".to_string()),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());

        let query = TitleQuery {
            ordering: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(query.into_filter().unwrap().ordering, None);
    }

    #[test]
    fn test_slug_validation() {
        assert!(validate_slug("sci-fi_2").is_ok());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("ünï").is_err());
    }

    #[test]
    fn test_year_validation() {
        let current = Utc::now().year() as i16;
        assert!(validate_year(current).is_ok());
        assert!(validate_year(1895).is_ok());
        assert!(validate_year(current + 1).is_err());
    }

    #[test]
    fn test_create_title_collects_missing_fields() {
        let request: CreateTitleRequest = serde_json::from_value(json!({})).unwrap();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();

        for field in ["name", "year", "genre", "category"] {
            assert!(fields.contains_key(field), "missing {}", field);
        }
        assert!(!fields.contains_key("description"));
    }

    #[test]
    fn test_update_title_distinguishes_null_from_missing() {
        let missing: UpdateTitleRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.description, None);

        let cleared: UpdateTitleRequest =
            serde_json::from_value(json!({"description": null})).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: UpdateTitleRequest =
            serde_json::from_value(json!({"description": "Zone"})).unwrap();
        assert_eq!(set.description, Some(Some("Zone".to_string())));
    }

    #[test]
    fn test_catalog_entry_serializes_without_id() {
        let entry = CatalogEntry {
            id: 4,
            name: "Drama".to_string(),
            slug: "drama".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"name": "Drama", "slug": "drama"})
        );
    }
}
