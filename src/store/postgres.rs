//! PostgreSQL credential store
//!
//! Users live in a single `users` row; the session set is a JSONB
//! column so `save` replaces the record, sessions included, in one
//! UPDATE. Uniqueness of tenant + email is a database constraint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{RefreshSession, Role, User, UserProfile};

use super::{CredentialStore, StoreError};

/// sqlx-backed store over a shared connection pool
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    tenant_id: String,
    email: String,
    password_hash: String,
    roles: Json<Vec<Role>>,
    profile: Json<UserProfile>,
    is_active: bool,
    email_verified: bool,
    refresh_sessions: Json<Vec<RefreshSession>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            tenant_id: row.tenant_id,
            email: row.email,
            password_hash: row.password_hash,
            roles: row.roles.0,
            profile: row.profile.0,
            is_active: row.is_active,
            email_verified: row.email_verified,
            refresh_sessions: row.refresh_sessions.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, email, password_hash, roles, profile, \
     is_active, email_verified, refresh_sessions, created_at, updated_at";

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_tenant_and_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE tenant_id = $1 AND email = $2"
        ))
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {SELECT_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        Ok(row.map(User::from))
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, tenant_id, email, password_hash, roles, profile,
                               is_active, email_verified, refresh_sessions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.tenant_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Json(&user.roles))
        .bind(Json(&user.profile))
        .bind(user.is_active)
        .bind(user.email_verified)
        .bind(Json(&user.refresh_sessions))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Ok(user)
    }

    async fn save(&self, user: User) -> Result<User, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, roles = $4, profile = $5,
                is_active = $6, email_verified = $7, refresh_sessions = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Json(&user.roles))
        .bind(Json(&user.profile))
        .bind(user.is_active)
        .bind(user.email_verified)
        .bind(Json(&user.refresh_sessions))
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::Backend(format!("unknown user {}", user.id)));
        }
        Ok(user)
    }

    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<User>, u64), StoreError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM users WHERE tenant_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        ))
        .bind(tenant_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        Ok((rows.into_iter().map(User::from).collect(), total as u64))
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        // Postgres unique_violation
        if db.code().as_deref() == Some("23505") {
            return StoreError::DuplicateIdentity;
        }
    }
    backend(e)
}
