//! Legacy user store collaborator.
//!
//! The bridge never talks to the CMS database directly; it goes through the
//! `UserStore` trait. `MemoryUserStore` is the single-node/test
//! implementation; production deployments wrap the CMS user API.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::attrs::RawUserRecord;

/// The legacy system's unique user identifier.
pub type SubjectId = String;

/// Errors from the user store itself (not from bad credentials).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store is unreachable or failed internally. Fatal: authentication
    /// attempts are never retried with stale credentials.
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

/// Read-side contract against the legacy user store.
///
/// `authenticate` returning `Ok(None)` means invalid credentials, without
/// distinguishing which half was wrong. `load` returning `Ok(None)` means
/// the subject no longer exists (e.g. a stale cookie for a deleted account).
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<SubjectId>, StoreError>;

    async fn load(&self, subject_id: &str) -> Result<Option<RawUserRecord>, StoreError>;
}

struct MemoryUser {
    username: String,
    password: String,
    record: RawUserRecord,
}

/// In-memory user store for tests and single-node demos.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<SubjectId, MemoryUser>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with plaintext credentials. Test/demo only; a real
    /// store verifies against the CMS password hash.
    pub async fn add_user(
        &self,
        subject_id: impl Into<SubjectId>,
        username: impl Into<String>,
        password: impl Into<String>,
        record: RawUserRecord,
    ) {
        let mut users = self.users.write().await;
        users.insert(
            subject_id.into(),
            MemoryUser {
                username: username.into(),
                password: password.into(),
                record,
            },
        );
    }

    pub async fn remove_user(&self, subject_id: &str) {
        let mut users = self.users.write().await;
        users.remove(subject_id);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<SubjectId>, StoreError> {
        let users = self.users.read().await;
        let hit = users
            .iter()
            .find(|(_, user)| user.username == username && user.password == password)
            .map(|(id, _)| id.clone());
        Ok(hit)
    }

    async fn load(&self, subject_id: &str) -> Result<Option<RawUserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(subject_id).map(|user| user.record.clone()))
    }
}
