//! Title repository
//!
//! Titles are read together with their category, their genres and the
//! rounded mean score of their reviews.

use std::collections::HashMap;

use common::{
    database::contains_pattern,
    error::{DatabaseError, DatabaseResult},
};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use tracing::info;

use crate::models::catalog::{
    CatalogEntry, NewTitle, Title, TitleChanges, TitleFilter, TitleOrderField, TitleOrdering,
    round_rating,
};

const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, t.description,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
           (SELECT AVG(r.score)::FLOAT8 FROM reviews r WHERE r.title_id = t.id) AS rating
    FROM titles t
    JOIN categories c ON c.id = t.category_id
"#;

const TITLE_FILTER: &str = r#"
    WHERE ($1::TEXT IS NULL OR EXISTS (
            SELECT 1
            FROM title_genres tg
            JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = t.id AND g.slug = $1
        ))
      AND ($2::TEXT IS NULL OR c.slug = $2)
      AND ($3::TEXT IS NULL OR t.name ILIKE $3 ESCAPE '\')
      AND ($4::SMALLINT IS NULL OR t.year = $4)
"#;

/// ORDER BY clause for a listing; only ever built from the closed set of sort keys
fn order_clause(ordering: Option<TitleOrdering>) -> String {
    let Some(ordering) = ordering else {
        return "t.year DESC, t.name, t.id".to_string();
    };

    let direction = if ordering.descending { "DESC" } else { "ASC" };
    let column = match ordering.field {
        TitleOrderField::Name => "t.name",
        TitleOrderField::Year => "t.year",
        TitleOrderField::Rating => "rating",
    };

    if ordering.field == TitleOrderField::Rating {
        format!("{column} {direction} NULLS LAST, t.id")
    } else {
        format!("{column} {direction}, t.id")
    }
}

fn title_from_row(row: &PgRow) -> Title {
    Title {
        id: row.get("id"),
        name: row.get("name"),
        year: row.get("year"),
        rating: round_rating(row.get("rating")),
        description: row.get("description"),
        genre: Vec::new(),
        category: CatalogEntry {
            id: row.get("category_id"),
            name: row.get("category_name"),
            slug: row.get("category_slug"),
        },
    }
}

/// Title repository
#[derive(Clone)]
pub struct TitleRepository {
    pool: PgPool,
}

impl TitleRepository {
    /// Create a new title repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List titles matching `filter`
    ///
    /// Returns the requested page and the total number of matching titles.
    pub async fn list(
        &self,
        filter: &TitleFilter,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<(Vec<Title>, i64)> {
        let mut conn = self.pool.acquire().await?;
        let name = filter.name.as_deref().map(contains_pattern);

        let rows = sqlx::query(&format!(
            "{TITLE_SELECT} {TITLE_FILTER} ORDER BY {} LIMIT $5 OFFSET $6",
            order_clause(filter.ordering)
        ))
        .bind(filter.genre.as_deref())
        .bind(filter.category.as_deref())
        .bind(name.as_deref())
        .bind(filter.year)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

        let count: i64 = sqlx::query_scalar(&format!(
            r#"
            SELECT COUNT(*)
            FROM titles t
            JOIN categories c ON c.id = t.category_id
            {TITLE_FILTER}
            "#
        ))
        .bind(filter.genre.as_deref())
        .bind(filter.category.as_deref())
        .bind(name.as_deref())
        .bind(filter.year)
        .fetch_one(&mut *conn)
        .await?;

        let mut titles: Vec<Title> = rows.iter().map(title_from_row).collect();
        Self::attach_genres(&mut conn, &mut titles).await?;

        Ok((titles, count))
    }

    /// Find a title by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Title>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_id_in(&mut conn, id).await
    }

    /// Find a title by ID on an existing connection or transaction
    pub async fn find_by_id_in(conn: &mut PgConnection, id: i64) -> DatabaseResult<Option<Title>> {
        let row = sqlx::query(&format!("{TITLE_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut titles = vec![title_from_row(&row)];
        Self::attach_genres(conn, &mut titles).await?;

        Ok(titles.pop())
    }

    /// Whether a title exists
    pub async fn exists(&self, id: i64) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM titles WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Create a title together with its genre links
    pub async fn create(&self, new_title: &NewTitle) -> DatabaseResult<Title> {
        info!("Creating title: {}", new_title.name);

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO titles (name, year, description, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&new_title.name)
        .bind(new_title.year)
        .bind(new_title.description.as_deref())
        .bind(new_title.category_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::link_genres(&mut tx, id, &new_title.genre_ids).await?;

        let title = Self::find_by_id_in(&mut tx, id)
            .await?
            .ok_or(DatabaseError::Query(sqlx::Error::RowNotFound))?;

        tx.commit().await?;

        Ok(title)
    }

    /// Apply a partial update; returns `None` when the title does not exist
    ///
    /// When `genre_ids` is set the genre links are replaced as a whole.
    pub async fn update(&self, id: i64, changes: &TitleChanges) -> DatabaseResult<Option<Title>> {
        info!("Updating title: {}", id);

        let mut tx = self.pool.begin().await?;

        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE titles
            SET name = COALESCE($2, name),
                year = COALESCE($3, year),
                description = CASE WHEN $6 THEN $4 ELSE description END,
                category_id = COALESCE($5, category_id)
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.year)
        .bind(changes.description.clone().flatten())
        .bind(changes.category_id)
        .bind(changes.description.is_some())
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            return Ok(None);
        }

        if let Some(genre_ids) = &changes.genre_ids {
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            Self::link_genres(&mut tx, id, genre_ids).await?;
        }

        let title = Self::find_by_id_in(&mut tx, id).await?;
        tx.commit().await?;

        Ok(title)
    }

    /// Delete a title; its reviews, comments and genre links go with it
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        info!("Deleting title: {}", id);

        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn link_genres(
        conn: &mut PgConnection,
        title_id: i64,
        genre_ids: &[i64],
    ) -> DatabaseResult<()> {
        if genre_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO title_genres (title_id, genre_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(title_id)
        .bind(genre_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Load the genres of every title in one query
    async fn attach_genres(conn: &mut PgConnection, titles: &mut [Title]) -> DatabaseResult<()> {
        if titles.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = titles.iter().map(|t| t.id).collect();

        let rows = sqlx::query(
            r#"
            SELECT tg.title_id, g.id, g.name, g.slug
            FROM title_genres tg
            JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = ANY($1)
            ORDER BY g.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut genres: HashMap<i64, Vec<CatalogEntry>> = HashMap::new();
        for row in rows {
            genres
                .entry(row.get("title_id"))
                .or_default()
                .push(CatalogEntry {
                    id: row.get("id"),
                    name: row.get("name"),
                    slug: row.get("slug"),
                });
        }

        for title in titles.iter_mut() {
            title.genre = genres.remove(&title.id).unwrap_or_default();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        assert_eq!(order_clause(None), "t.year DESC, t.name, t.id");
    }

    #[test]
    fn test_requested_order() {
        let ordering = TitleOrdering::parse("-rating");
        assert_eq!(order_clause(ordering), "rating DESC NULLS LAST, t.id");

        let ordering = TitleOrdering::parse("name");
        assert_eq!(order_clause(ordering), "t.name ASC, t.id");
    }
}
