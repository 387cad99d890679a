//! Users service

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{ListUsersQuery, ProfilePatch, UserListResponse, UserResponse};
use crate::store::{CredentialStore, StoreError};

const MAX_PAGE_SIZE: u32 = 100;

/// Users service errors
#[derive(Error, Debug)]
pub enum UsersError {
    #[error("user not found")]
    NotFound,

    #[error("credential store error: {0}")]
    Store(String),
}

impl From<StoreError> for UsersError {
    fn from(e: StoreError) -> Self {
        match e {
            // Duplicate cannot happen here; surface it as a backend fault
            StoreError::DuplicateIdentity => UsersError::Store("unexpected duplicate".into()),
            StoreError::Backend(msg) => UsersError::Store(msg),
        }
    }
}

/// Profile and listing operations over the credential store
pub struct UsersService {
    store: Arc<dyn CredentialStore>,
}

impl UsersService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Current user projection, scoped to the caller's tenant
    pub async fn get_me(&self, user_id: Uuid, tenant_id: &str) -> Result<UserResponse, UsersError> {
        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .filter(|u| u.tenant_id == tenant_id)
            .ok_or(UsersError::NotFound)?;

        Ok(user.into())
    }

    /// Merge-patch the caller's profile fields
    pub async fn update_me(
        &self,
        user_id: Uuid,
        tenant_id: &str,
        patch: ProfilePatch,
    ) -> Result<UserResponse, UsersError> {
        let mut user = self
            .store
            .find_by_id(user_id)
            .await?
            .filter(|u| u.tenant_id == tenant_id)
            .ok_or(UsersError::NotFound)?;

        patch.apply_to(&mut user.profile);
        let saved = self.store.save(user).await?;

        Ok(saved.into())
    }

    /// Admin listing of the tenant's users, newest first
    pub async fn list_users(
        &self,
        tenant_id: &str,
        query: ListUsersQuery,
    ) -> Result<UserListResponse, UsersError> {
        let page = query.page.max(1);
        let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

        let (items, total) = self.store.list_by_tenant(tenant_id, page, limit).await?;

        Ok(UserListResponse {
            items: items.into_iter().map(Into::into).collect(),
            total,
            page,
            limit,
        })
    }
}
