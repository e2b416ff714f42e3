//! Genre and category repository
//!
//! Genres and categories share a shape (name plus unique slug), so a single
//! repository serves both tables.

use common::{database::contains_pattern, error::DatabaseResult};
use sqlx::PgPool;
use tracing::info;

use crate::models::catalog::CatalogEntry;

/// Table a [`CatalogRepository`] operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Genre,
    Category,
}

impl CatalogKind {
    fn table(self) -> &'static str {
        match self {
            CatalogKind::Genre => "genres",
            CatalogKind::Category => "categories",
        }
    }
}

/// Repository for genres or categories
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
    kind: CatalogKind,
}

impl CatalogRepository {
    /// Create a new repository over the table of `kind`
    pub fn new(pool: PgPool, kind: CatalogKind) -> Self {
        Self { pool, kind }
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    /// List entries ordered by name, optionally filtered by a name fragment
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<(Vec<CatalogEntry>, i64)> {
        let table = self.kind.table();
        let pattern = search.map(contains_pattern);

        let entries = sqlx::query_as::<_, CatalogEntry>(&format!(
            r#"
            SELECT id, name, slug
            FROM {table}
            WHERE ($1::TEXT IS NULL OR name ILIKE $1 ESCAPE '\')
            ORDER BY name, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar(&format!(
            r"SELECT COUNT(*) FROM {table} WHERE ($1::TEXT IS NULL OR name ILIKE $1 ESCAPE '\')"
        ))
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok((entries, count))
    }

    /// Find an entry by slug
    pub async fn find_by_slug(&self, slug: &str) -> DatabaseResult<Option<CatalogEntry>> {
        let table = self.kind.table();

        let entry = sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT id, name, slug FROM {table} WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Find every entry whose slug is in `slugs`
    ///
    /// Unknown slugs are simply absent from the result.
    pub async fn find_by_slugs(&self, slugs: &[String]) -> DatabaseResult<Vec<CatalogEntry>> {
        let table = self.kind.table();

        let entries = sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT id, name, slug FROM {table} WHERE slug = ANY($1) ORDER BY name"
        ))
        .bind(slugs)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Create an entry
    pub async fn create(&self, name: &str, slug: &str) -> DatabaseResult<CatalogEntry> {
        let table = self.kind.table();
        info!("Creating {} entry: {}", table, slug);

        let entry = sqlx::query_as::<_, CatalogEntry>(&format!(
            "INSERT INTO {table} (name, slug) VALUES ($1, $2) RETURNING id, name, slug"
        ))
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Delete an entry by slug; returns `false` when nothing matched
    pub async fn delete_by_slug(&self, slug: &str) -> DatabaseResult<bool> {
        let table = self.kind.table();
        info!("Deleting {} entry: {}", table, slug);

        let result = sqlx::query(&format!("DELETE FROM {table} WHERE slug = $1"))
            .bind(slug)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables() {
        assert_eq!(CatalogKind::Genre.table(), "genres");
        assert_eq!(CatalogKind::Category.table(), "categories");
    }
}
