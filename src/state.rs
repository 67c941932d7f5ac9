//! Suspended authentication state.
//!
//! An authentication attempt that needs the legacy login page is split
//! across two requests: `suspend` persists the request context under a
//! fresh opaque token, the user round-trips to the CMS, and `resume`
//! consumes the token in a brand-new request. No task or connection is held
//! open across the round trip.
//!
//! Tokens are single-use: the store's load is a load-and-invalidate that is
//! atomic with respect to racing resume attempts, so two requests with the
//! same token can never both succeed.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Errors from the state store itself.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state store unavailable: {0}")]
    Unavailable(String),
}

/// A persisted authentication request context.
///
/// `payload` is the host runtime's opaque state; `owner_key` and
/// `source_id` record which authentication-source instance suspended the
/// flow, so a token saved by one source cannot resume a different one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspendedContext {
    pub owner_key: String,
    pub source_id: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SuspendedContext {
    pub fn new(
        owner_key: impl Into<String>,
        source_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            owner_key: owner_key.into(),
            source_id: source_id.into(),
            payload,
            created_at: Utc::now(),
        }
    }

    /// Whether the context is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now() - self.created_at;
        age.to_std().map(|age| age > ttl).unwrap_or(false)
    }
}

/// Persistence contract for suspended contexts.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Persist a context under a fresh opaque token.
    async fn save(&self, context: SuspendedContext) -> Result<String, StateError>;

    /// Load and invalidate a context. Atomic: at most one caller ever
    /// receives `Some` for a given token.
    async fn take(&self, token: &str) -> Result<Option<SuspendedContext>, StateError>;

    /// Drop contexts older than the store's TTL.
    async fn cleanup(&self) -> Result<(), StateError>;
}

pub type SharedStateStore = Arc<dyn StateStore>;

/// In-memory state store for tests and single-node deployments.
///
/// Multi-node deployments need a shared backend; an expired or unknown
/// token resumes as "not found" either way.
pub struct MemoryStateStore {
    pending: RwLock<HashMap<String, SuspendedContext>>,
    ttl: Duration,
}

impl MemoryStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            pending: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    #[cfg(test)]
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save(&self, context: SuspendedContext) -> Result<String, StateError> {
        let token = Uuid::new_v4().to_string();
        let mut pending = self.pending.write().await;
        pending.insert(token.clone(), context);
        Ok(token)
    }

    async fn take(&self, token: &str) -> Result<Option<SuspendedContext>, StateError> {
        // Remove under the write lock so racing takes see at most one hit.
        let mut pending = self.pending.write().await;
        let context = pending.remove(token);
        Ok(context.filter(|ctx| !ctx.is_expired(self.ttl)))
    }

    async fn cleanup(&self) -> Result<(), StateError> {
        let mut pending = self.pending.write().await;
        pending.retain(|_, ctx| !ctx.is_expired(self.ttl));
        Ok(())
    }
}

/// Hands a finished attribute set back to the host identity-provider
/// runtime. Returns the URL the user agent should be redirected to; the
/// HTTP boundary turns that into the terminal response.
#[async_trait]
pub trait AuthCompleter: Send + Sync {
    async fn complete(
        &self,
        context: &SuspendedContext,
        attributes: crate::attrs::AttributeSet,
    ) -> Result<String, StateError>;
}

/// Thin orchestration over the state store: suspend with an owner key,
/// resume only when the owner key matches.
#[derive(Clone)]
pub struct SuspendResumeController {
    store: SharedStateStore,
}

impl SuspendResumeController {
    pub fn new(store: SharedStateStore) -> Self {
        Self { store }
    }

    /// Persist `context`, returning the opaque resume token.
    pub async fn suspend(&self, context: SuspendedContext) -> Result<String, StateError> {
        let token = self.store.save(context).await?;
        tracing::debug!(token = %token, "suspended authentication state");
        Ok(token)
    }

    /// Consume a resume token. Returns `None` for unknown, already-used,
    /// or expired tokens, and for tokens saved by a different owner — the
    /// three cases are deliberately indistinguishable to the caller.
    pub async fn resume(
        &self,
        token: &str,
        owner_key: &str,
    ) -> Result<Option<SuspendedContext>, StateError> {
        let Some(context) = self.store.take(token).await? else {
            return Ok(None);
        };
        if context.owner_key != owner_key {
            tracing::warn!(
                expected = owner_key,
                found = %context.owner_key,
                "resume token owner mismatch, treating as not found"
            );
            return Ok(None);
        }
        Ok(Some(context))
    }
}
