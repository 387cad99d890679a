//! Credential store contract and implementations
//!
//! The store is the only shared mutable resource in the system. All
//! session-set mutations go through `save` as a read-modify-write of a
//! single user record, so append/revoke/revoke-all are observed
//! together or not at all.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;

mod memory;
mod postgres;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Store-level errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Unique-constraint violation on the tenant + email pair
    #[error("identity already exists for this tenant")]
    DuplicateIdentity,

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence contract for user records
///
/// `create` enforces tenant + email uniqueness; `save` replaces the
/// whole record, session set included, as one atomic update.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_tenant_and_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create(&self, user: User) -> Result<User, StoreError>;

    async fn save(&self, user: User) -> Result<User, StoreError>;

    /// Tenant-scoped listing, newest first; returns the page of users
    /// and the tenant's total count
    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<User>, u64), StoreError>;
}
