//! Username/password authentication source.
//!
//! Verifies credentials directly against the legacy user store and runs the
//! same attribute pipeline as the cookie handshake. Failures never reveal
//! whether the username or the password was the wrong half.

use std::sync::Arc;

use crate::{
    attrs::{AttributeMapper, AttributeSet},
    config::SourceConfig,
    error::BridgeError,
    store::UserStore,
};

pub struct CredentialAuthenticator {
    source_id: String,
    config: SourceConfig,
    mapper: AttributeMapper,
    user_store: Arc<dyn UserStore>,
}

impl CredentialAuthenticator {
    pub fn new(
        source_id: impl Into<String>,
        config: SourceConfig,
        user_store: Arc<dyn UserStore>,
    ) -> Self {
        let mapper = AttributeMapper::new(config.attributes.clone());
        Self {
            source_id: source_id.into(),
            config,
            mapper,
            user_store,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Register a post-mapping attribute alteration hook.
    pub fn register_hook(&mut self, hook: Arc<dyn crate::attrs::AttributeAlterHook>) {
        self.mapper.register_hook(hook);
    }

    /// Verify a username/password pair and return the mapped attributes.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AttributeSet, BridgeError> {
        let Some(subject_id) = self.user_store.authenticate(username, password).await? else {
            tracing::debug!(source = %self.source_id, "login failed");
            return Err(BridgeError::WrongCredentials);
        };

        let Some(record) = self.user_store.load(&subject_id).await? else {
            // The account vanished between verification and load. Surface the
            // same generic failure as bad credentials.
            tracing::warn!(
                source = %self.source_id,
                subject = %subject_id,
                "authenticated subject no longer loadable"
            );
            return Err(BridgeError::WrongCredentials);
        };

        let attributes = self.mapper.map(&record);
        if self.config.debug {
            tracing::debug!(
                source = %self.source_id,
                subject = %subject_id,
                attribute_count = attributes.len(),
                "mapped attributes after password login"
            );
        }
        Ok(attributes)
    }
}
