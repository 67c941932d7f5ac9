//! Cookie-handshake authentication source.
//!
//! Trusts an already-authenticated legacy CMS session: the CMS sets an
//! integrity-protected trust cookie, and this source verifies it, loads the
//! user record, and maps attributes. Without a valid cookie, the flow is
//! suspended and the user is redirected to the CMS login page with a return
//! URL pointing at the bridge's resume endpoint.
//!
//! The inbound cookie is single-use: the HTTP boundary clears it before
//! this source ever sees the value, win or lose.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::{
    attrs::{AttributeMapper, AttributeSet},
    config::{ConfigError, SourceConfig},
    cookie::{self, CookieError},
    error::BridgeError,
    source::AuthOutcome,
    state::{SharedStateStore, SuspendResumeController, SuspendedContext},
    store::UserStore,
};

/// Query parameter carrying the return URL on the legacy login/logout pages.
pub(crate) const RETURN_TO_PARAM: &str = "ReturnTo";

/// Query parameter carrying the resume token on the resume endpoint.
pub(crate) const STATE_PARAM: &str = "State";

pub struct SsoBridgeSource {
    source_id: String,
    config: SourceConfig,
    mapper: AttributeMapper,
    user_store: Arc<dyn UserStore>,
    controller: SuspendResumeController,
}

impl SsoBridgeSource {
    /// Owner key binding suspended states to this source kind. A state
    /// saved here can only resume here; replaying it against another source
    /// kind fails as "not found".
    pub const OWNER_KEY: &'static str = "backdropbridge:external";

    pub fn new(
        source_id: impl Into<String>,
        config: SourceConfig,
        user_store: Arc<dyn UserStore>,
        state_store: SharedStateStore,
    ) -> Self {
        let mapper = AttributeMapper::new(config.attributes.clone());
        Self {
            source_id: source_id.into(),
            config,
            mapper,
            user_store,
            controller: SuspendResumeController::new(state_store),
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

    /// Run one authentication attempt against an already-cleared cookie
    /// value.
    ///
    /// `payload` is the host runtime's opaque request context; it rides
    /// along in the suspended state and comes back on resume.
    pub async fn authenticate(
        &self,
        cookie_value: Option<&str>,
        payload: Value,
    ) -> Result<AuthOutcome, BridgeError> {
        if let Some(attributes) = self.attributes_from_cookie(cookie_value).await? {
            return Ok(AuthOutcome::Authenticated(attributes));
        }

        // Anonymous: suspend and send the user to the legacy login page.
        let context = SuspendedContext::new(Self::OWNER_KEY, &self.source_id, payload);
        let token = self.controller.suspend(context).await?;
        let login_url = self.login_redirect(&token)?;
        tracing::debug!(source = %self.source_id, "redirecting to legacy login page");
        Ok(AuthOutcome::Redirect(login_url))
    }

    /// Re-run cookie verification after the user comes back from the login
    /// page. At this point anonymous is fatal: the user skipped the login.
    pub async fn verify_after_login(
        &self,
        cookie_value: Option<&str>,
    ) -> Result<AttributeSet, BridgeError> {
        self.attributes_from_cookie(cookie_value)
            .await?
            .ok_or_else(|| {
                tracing::error!(
                    source = %self.source_id,
                    "no valid trust cookie after login page"
                );
                BridgeError::NotAuthenticated
            })
    }

    /// Where to send the user agent on logout.
    pub fn logout_redirect(&self, return_to: Option<&str>) -> Result<String, BridgeError> {
        let mut url = self.parse_config_url("legacy_logout_url", &self.config.legacy_logout_url)?;
        if let Some(return_to) = return_to {
            url.query_pairs_mut().append_pair(RETURN_TO_PARAM, return_to);
        }
        Ok(url.into())
    }

    /// Verify the trust cookie and map the user's attributes.
    ///
    /// `Ok(None)` means anonymous: no cookie, a malformed cookie, or a
    /// cookie naming a deleted account. A signature mismatch is never
    /// anonymous — it aborts as `TamperedCredential`.
    async fn attributes_from_cookie(
        &self,
        cookie_value: Option<&str>,
    ) -> Result<Option<AttributeSet>, BridgeError> {
        let Some(token) = cookie_value else {
            return Ok(None);
        };

        let subject_id = match cookie::decode(token, &self.config.secret_salt) {
            Ok(subject_id) => subject_id,
            Err(CookieError::SignatureMismatch) => {
                tracing::warn!(
                    source = %self.source_id,
                    "trust cookie signature mismatch: tampering or out-of-date legacy module"
                );
                return Err(BridgeError::TamperedCredential);
            }
            Err(error) => {
                tracing::debug!(source = %self.source_id, %error, "unusable trust cookie");
                return Ok(None);
            }
        };

        let Some(record) = self.user_store.load(&subject_id).await? else {
            // Stale cookie referencing a deleted account.
            tracing::debug!(
                source = %self.source_id,
                subject = %subject_id,
                "trust cookie names an unknown user, treating as anonymous"
            );
            return Ok(None);
        };

        let attributes = self.mapper.map(&record);
        if self.config.debug {
            tracing::debug!(
                source = %self.source_id,
                subject = %subject_id,
                attribute_count = attributes.len(),
                "mapped attributes from trust cookie"
            );
        }
        Ok(Some(attributes))
    }

    fn login_redirect(&self, token: &str) -> Result<String, BridgeError> {
        let mut return_to = self.parse_config_url("resume_url", &self.config.resume_url)?;
        return_to.query_pairs_mut().append_pair(STATE_PARAM, token);

        let mut login_url =
            self.parse_config_url("legacy_login_url", &self.config.legacy_login_url)?;
        login_url
            .query_pairs_mut()
            .append_pair(RETURN_TO_PARAM, return_to.as_str());
        Ok(login_url.into())
    }

    fn parse_config_url(&self, name: &str, value: &str) -> Result<Url, BridgeError> {
        Url::parse(value).map_err(|e| {
            BridgeError::Config(ConfigError::Validation(format!(
                "{name} is not an absolute URL: {e}"
            )))
        })
    }
}
