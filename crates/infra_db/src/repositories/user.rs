//! User repository
//!
//! Users are owned by the wider marketplace; this crate only needs enough of
//! them to satisfy foreign keys and to bootstrap well-known actors.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database enum for user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    Member,
    Admin,
    System,
}

/// Database row representation of a user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Data for inserting a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
}

/// Repository for user rows
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Retrieves a user by identifier
    pub async fn get_by_id(&self, user_id: Uuid) -> Result<UserRow, DatabaseError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, email, display_name, role, created_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", user_id))
    }

    /// Inserts a user; returns the stored row
    pub async fn insert(&self, user: &NewUser) -> Result<UserRow, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (user_id, email, display_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, email, display_name, role, created_at
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Inserts a user unless one with the same id exists
    ///
    /// Returns whether a row was created.
    pub async fn insert_if_absent(&self, user: &NewUser) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, email, display_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
