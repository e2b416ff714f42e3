//! User repository for database operations

use chrono::{DateTime, Utc};
use common::{database::contains_pattern, error::DatabaseResult};
use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::models::{NewUser, UpdateUser, User};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, bio, role, \
     is_superuser, last_login, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool the repository runs its queries on
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a new user
    pub async fn create(&self, new_user: &NewUser) -> DatabaseResult<User> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, new_user).await
    }

    /// Insert a user on an existing connection or transaction
    pub async fn insert(conn: &mut PgConnection, new_user: &NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", new_user.username);

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, first_name, last_name, bio, role, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.bio)
        .bind(new_user.role.as_str())
        .bind(new_user.is_superuser)
        .fetch_one(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_username_in(&mut conn, username).await
    }

    /// Find a user by username on an existing connection or transaction
    pub async fn find_by_username_in(
        conn: &mut PgConnection,
        username: &str,
    ) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Find a user by email on an existing connection or transaction
    pub async fn find_by_email_in(
        conn: &mut PgConnection,
        email: &str,
    ) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(user)
    }

    /// List users ordered by username, optionally filtered by a username fragment
    ///
    /// Returns the requested page and the total number of matching users.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<(Vec<User>, i64)> {
        let pattern = search.map(contains_pattern);

        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::TEXT IS NULL OR username ILIKE $1 ESCAPE '\')
            ORDER BY username
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(pattern.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let count: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR username ILIKE $1 ESCAPE '\')",
        )
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok((users, count))
    }

    /// Apply a partial update; returns `None` when the user does not exist
    pub async fn update(&self, id: i64, changes: &UpdateUser) -> DatabaseResult<Option<User>> {
        info!("Updating user: {}", id);

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                bio = COALESCE($6, bio),
                role = COALESCE($7, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.username.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .bind(changes.bio.as_deref())
        .bind(changes.role.map(|r| r.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Set the superuser flag on an existing user
    pub async fn grant_superuser(&self, username: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_superuser = TRUE, updated_at = NOW()
            WHERE username = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Delete a user by username
    pub async fn delete_by_username(&self, username: &str) -> DatabaseResult<bool> {
        info!("Deleting user: {}", username);

        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a successful login, provided nobody else consumed the same state first
    ///
    /// Compares against the `last_login` value the caller observed; returns
    /// `false` when it moved in the meantime.
    pub async fn record_login(
        &self,
        id: i64,
        observed_last_login: Option<DateTime<Utc>>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login = NOW()
            WHERE id = $1 AND last_login IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(id)
        .bind(observed_last_login)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
