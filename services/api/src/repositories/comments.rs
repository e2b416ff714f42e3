//! Comment repository

use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;

use crate::models::reviews::Comment;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.review_id, c.text, u.username AS author, c.author_id, c.pub_date
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// Comment repository
#[derive(Clone)]
pub struct CommentRepository {
    pool: PgPool,
}

impl CommentRepository {
    /// Create a new comment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List the comments of a review, newest first
    pub async fn list(
        &self,
        review_id: i64,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<(Vec<Comment>, i64)> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.pub_date DESC, c.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(review_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
            .bind(review_id)
            .fetch_one(&self.pool)
            .await?;

        Ok((comments, count))
    }

    /// Find a comment on a review
    pub async fn find(&self, review_id: i64, id: i64) -> DatabaseResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 AND c.id = $2"
        ))
        .bind(review_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Create a comment
    pub async fn create(&self, review_id: i64, author_id: i64, text: &str) -> DatabaseResult<Comment> {
        info!("Creating comment on review {} by user {}", review_id, author_id);

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (review_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT i.id, i.review_id, i.text, u.username AS author, i.author_id, i.pub_date
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(review_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Replace the text of a comment; returns `None` when the comment does not exist
    pub async fn update(&self, id: i64, text: &str) -> DatabaseResult<Option<Comment>> {
        info!("Updating comment: {}", id);

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments
                SET text = $2
                WHERE id = $1
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT up.id, up.review_id, up.text, u.username AS author, up.author_id, up.pub_date
            FROM updated up
            JOIN users u ON u.id = up.author_id
            "#,
        )
        .bind(id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Delete a comment
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        info!("Deleting comment: {}", id);

        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
