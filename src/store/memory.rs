//! In-memory credential store
//!
//! Backs the integration tests and local development without a
//! database. Mirrors the Postgres implementation's semantics: tenant +
//! email uniqueness on create, whole-record replacement on save.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::User;

use super::{CredentialStore, StoreError};

/// HashMap-backed store keyed by user id
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_tenant_and_email(
        &self,
        tenant_id: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.tenant_id == tenant_id && u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let duplicate = users
            .values()
            .any(|u| u.tenant_id == user.tenant_id && u.email == user.email);
        if duplicate {
            return Err(StoreError::DuplicateIdentity);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StoreError::Backend(format!("unknown user {}", user.id)));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_by_tenant(
        &self,
        tenant_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<(Vec<User>, u64), StoreError> {
        let users = self.users.read().await;
        let mut items: Vec<User> = users
            .values()
            .filter(|u| u.tenant_id == tenant_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = items.len() as u64;
        let offset = (page.saturating_sub(1) as usize) * limit as usize;
        let items = items
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();

        Ok((items, total))
    }
}
