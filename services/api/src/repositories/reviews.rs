//! Review repository

use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;

use crate::models::reviews::Review;

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.title_id, r.text, u.username AS author, r.author_id, r.score, r.pub_date
    FROM reviews r
    JOIN users u ON u.id = r.author_id
"#;

/// Review repository
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new review repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List the reviews of a title, newest first
    pub async fn list(
        &self,
        title_id: i64,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<(Vec<Review>, i64)> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.pub_date DESC, r.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(title_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((reviews, count))
    }

    /// Find a review of a title
    pub async fn find(&self, title_id: i64, id: i64) -> DatabaseResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 AND r.id = $2"
        ))
        .bind(title_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    /// Whether `author_id` already reviewed the title
    pub async fn exists_for_author(&self, title_id: i64, author_id: i64) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE title_id = $1 AND author_id = $2)",
        )
        .bind(title_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Create a review
    ///
    /// A second review by the same author fails with a unique violation.
    pub async fn create(
        &self,
        title_id: i64,
        author_id: i64,
        text: &str,
        score: i16,
    ) -> DatabaseResult<Review> {
        info!("Creating review of title {} by user {}", title_id, author_id);

        let review = sqlx::query_as::<_, Review>(
            r#"
            WITH inserted AS (
                INSERT INTO reviews (title_id, author_id, text, score)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT i.id, i.title_id, i.text, u.username AS author, i.author_id, i.score, i.pub_date
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(title_id)
        .bind(author_id)
        .bind(text)
        .bind(score)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    /// Apply a partial update; returns `None` when the review does not exist
    pub async fn update(
        &self,
        id: i64,
        text: Option<&str>,
        score: Option<i16>,
    ) -> DatabaseResult<Option<Review>> {
        info!("Updating review: {}", id);

        let review = sqlx::query_as::<_, Review>(
            r#"
            WITH updated AS (
                UPDATE reviews
                SET text = COALESCE($2, text),
                    score = COALESCE($3, score)
                WHERE id = $1
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT up.id, up.title_id, up.text, u.username AS author, up.author_id, up.score,
                   up.pub_date
            FROM updated up
            JOIN users u ON u.id = up.author_id
            "#,
        )
        .bind(id)
        .bind(text)
        .bind(score)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    /// Delete a review together with its comments
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        info!("Deleting review: {}", id);

        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
