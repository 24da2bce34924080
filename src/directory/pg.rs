use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use uuid::Uuid;

use crate::auth::role::Role;

use super::{Directory, DirectoryError, SubjectProfile};

/// Postgres-backed directory. The pool is created lazily so the binary can
/// start (and the token-only auth path can serve) without a database.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn connect_lazy(database_url: &str) -> Result<Self, DirectoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_profile(row: &sqlx::postgres::PgRow) -> Result<SubjectProfile, DirectoryError> {
    let role_str: String = row.get("role");
    let role = Role::parse(&role_str)
        .ok_or_else(|| DirectoryError::Query(format!("unknown role '{}'", role_str)))?;
    Ok(SubjectProfile {
        id: row.get("id"),
        role,
        school_id: row.get("school_code"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        active: row.get("is_active"),
    })
}

#[async_trait]
impl Directory for PgDirectory {
    async fn school_active(&self, school_id: &str) -> Result<bool, DirectoryError> {
        let query = r#"
            SELECT 1 AS one
            FROM schools
            WHERE code = $1
            AND is_active = true
            AND deleted_at IS NULL
        "#;

        let row = sqlx::query(query)
            .bind(school_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DirectoryError::Query(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn find_subject_by_email(
        &self,
        school_id: &str,
        email: &str,
    ) -> Result<Option<SubjectProfile>, DirectoryError> {
        let query = r#"
            SELECT id, role, school_code, email, name, password_hash, is_active
            FROM users
            WHERE school_code = $1
            AND lower(email) = lower($2)
            AND deleted_at IS NULL
        "#;

        let row = sqlx::query(query)
            .bind(school_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DirectoryError::Query(e.to_string()))?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn find_subject(&self, subject_id: Uuid) -> Result<Option<SubjectProfile>, DirectoryError> {
        let query = r#"
            SELECT id, role, school_code, email, name, password_hash, is_active
            FROM users
            WHERE id = $1
            AND deleted_at IS NULL
        "#;

        let row = sqlx::query(query)
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DirectoryError::Query(e.to_string()))?;

        row.as_ref().map(row_to_profile).transpose()
    }
}
