//! Authentication sources and their registry.
//!
//! Two sources bridge the legacy CMS to the identity-provider runtime:
//! [`SsoBridgeSource`] trusts an existing CMS session via the trust cookie,
//! and [`CredentialAuthenticator`] verifies a username/password pair
//! directly. The registry resolves the source instance recorded in a
//! suspended state, so a flow can detect configuration edits mid-login.

mod external;
mod userpass;

pub use external::SsoBridgeSource;
pub use userpass::CredentialAuthenticator;

use std::{collections::HashMap, sync::Arc};

use crate::{
    attrs::AttributeSet,
    error::BridgeError,
    state::{SuspendResumeController, SuspendedContext},
};

/// Outcome of an `authenticate` call.
///
/// Redirects are data, not control flow: the HTTP boundary turns a
/// `Redirect` into the actual response and stops processing the request.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// The user is already authenticated; here are their attributes.
    Authenticated(AttributeSet),
    /// The user must visit the legacy login page; send them here.
    Redirect(String),
}

/// A registered authentication-source instance.
#[derive(Clone)]
pub enum AuthSource {
    External(Arc<SsoBridgeSource>),
    UserPass(Arc<CredentialAuthenticator>),
}

/// Registry of authentication sources, built once at startup.
///
/// Resume flows resolve the source id recorded in the suspended state
/// through this registry; a missing id or a kind mismatch means the
/// configuration changed while the user was at the login page.
#[derive(Default)]
pub struct SourceRegistry {
    sources: HashMap<String, AuthSource>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_external(&mut self, source: Arc<SsoBridgeSource>) {
        self.sources
            .insert(source.source_id().to_string(), AuthSource::External(source));
    }

    pub fn register_userpass(&mut self, source: Arc<CredentialAuthenticator>) {
        self.sources
            .insert(source.source_id().to_string(), AuthSource::UserPass(source));
    }

    pub fn get(&self, source_id: &str) -> Option<&AuthSource> {
        self.sources.get(source_id)
    }

    /// Resolve an external (cookie-handshake) source by id. `None` when the
    /// id is unknown or registered as a different kind.
    pub fn external(&self, source_id: &str) -> Option<Arc<SsoBridgeSource>> {
        match self.sources.get(source_id) {
            Some(AuthSource::External(source)) => Some(source.clone()),
            _ => None,
        }
    }

    /// Resolve a username/password source. With `None`, returns the sole
    /// registered userpass source, if there is exactly one.
    pub fn userpass(&self, source_id: Option<&str>) -> Option<Arc<CredentialAuthenticator>> {
        match source_id {
            Some(id) => match self.sources.get(id) {
                Some(AuthSource::UserPass(source)) => Some(source.clone()),
                _ => None,
            },
            None => {
                let mut found = self.sources.values().filter_map(|s| match s {
                    AuthSource::UserPass(source) => Some(source.clone()),
                    _ => None,
                });
                let first = found.next();
                if found.next().is_some() { None } else { first }
            }
        }
    }
}

/// Consume a resume token and resolve the source instance that suspended
/// the flow.
///
/// The token is invalidated before anything else happens, so even a flow
/// that fails afterwards cannot be retried. A source id that no longer
/// resolves to an external source means the configuration was edited while
/// the user was at the login page — fatal, never guess-and-continue.
pub async fn resolve_resume(
    registry: &SourceRegistry,
    controller: &SuspendResumeController,
    token: Option<&str>,
) -> Result<(Arc<SsoBridgeSource>, SuspendedContext), BridgeError> {
    let token = token.ok_or(BridgeError::MissingToken)?;

    let context = controller
        .resume(token, SsoBridgeSource::OWNER_KEY)
        .await?
        .ok_or(BridgeError::StateNotFound)?;

    let Some(source) = registry.external(&context.source_id) else {
        tracing::error!(
            source = %context.source_id,
            "suspended state names a source that no longer exists or changed kind"
        );
        return Err(BridgeError::ConfigurationChanged);
    };

    Ok((source, context))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{
        attrs::{FieldValue, RawUserRecord},
        config::test_config,
        cookie,
        state::{MemoryStateStore, SharedStateStore},
        store::MemoryUserStore,
    };

    struct Fixture {
        registry: SourceRegistry,
        controller: SuspendResumeController,
        source: Arc<SsoBridgeSource>,
    }

    async fn fixture() -> Fixture {
        let user_store = Arc::new(MemoryUserStore::new());
        user_store
            .add_user(
                "42",
                "alice",
                "pw",
                RawUserRecord::new()
                    .with("uid", FieldValue::Int(42))
                    .with("name", FieldValue::text("alice")),
            )
            .await;

        let state_store: SharedStateStore =
            Arc::new(MemoryStateStore::new(Duration::from_secs(900)));
        let source = Arc::new(SsoBridgeSource::new(
            "backdrop-sso",
            test_config(),
            user_store.clone(),
            state_store.clone(),
        ));
        let userpass = Arc::new(CredentialAuthenticator::new(
            "backdrop-userpass",
            test_config(),
            user_store,
        ));

        let mut registry = SourceRegistry::new();
        registry.register_external(source.clone());
        registry.register_userpass(userpass);

        Fixture {
            registry,
            controller: SuspendResumeController::new(state_store),
            source,
        }
    }

    async fn suspended_token(fixture: &Fixture) -> String {
        let outcome = fixture
            .source
            .authenticate(None, json!({"ReturnTo": "/app"}))
            .await
            .unwrap();
        let AuthOutcome::Redirect(login_url) = outcome else {
            panic!("expected redirect");
        };
        let url = url::Url::parse(&login_url).unwrap();
        let (_, return_to) = url.query_pairs().find(|(k, _)| k == "ReturnTo").unwrap();
        let return_to = url::Url::parse(&return_to).unwrap();
        let (_, token) = return_to.query_pairs().find(|(k, _)| k == "State").unwrap();
        token.into_owned()
    }

    #[tokio::test]
    async fn resume_round_trip() {
        let fixture = fixture().await;
        let token = suspended_token(&fixture).await;

        let (source, context) =
            resolve_resume(&fixture.registry, &fixture.controller, Some(&token))
                .await
                .unwrap();
        assert_eq!(source.source_id(), "backdrop-sso");
        assert_eq!(context.payload["ReturnTo"], "/app");

        let cookie = cookie::encode("42", "s3cr3t").unwrap();
        let attrs = source.verify_after_login(Some(&cookie)).await.unwrap();
        assert_eq!(attrs.get("name"), Some(&["alice".to_string()][..]));
    }

    #[tokio::test]
    async fn resume_without_token_is_missing_token() {
        let fixture = fixture().await;
        let result = resolve_resume(&fixture.registry, &fixture.controller, None).await;
        assert!(matches!(result, Err(BridgeError::MissingToken)));
    }

    #[tokio::test]
    async fn resume_with_unknown_token_is_not_found() {
        let fixture = fixture().await;
        let result = resolve_resume(
            &fixture.registry,
            &fixture.controller,
            Some("00000000-0000-0000-0000-000000000000"),
        )
        .await;
        assert!(matches!(result, Err(BridgeError::StateNotFound)));
    }

    #[tokio::test]
    async fn resume_token_is_single_use() {
        let fixture = fixture().await;
        let token = suspended_token(&fixture).await;

        assert!(
            resolve_resume(&fixture.registry, &fixture.controller, Some(&token))
                .await
                .is_ok()
        );
        let second = resolve_resume(&fixture.registry, &fixture.controller, Some(&token)).await;
        assert!(matches!(second, Err(BridgeError::StateNotFound)));
    }

    #[tokio::test]
    async fn resume_after_source_removal_is_configuration_changed() {
        let fixture = fixture().await;
        let token = suspended_token(&fixture).await;

        // Simulate a config edit mid-flow: rebuild the registry without the
        // external source.
        let empty_registry = SourceRegistry::new();
        let result = resolve_resume(&empty_registry, &fixture.controller, Some(&token)).await;
        assert!(matches!(result, Err(BridgeError::ConfigurationChanged)));
    }

    #[tokio::test]
    async fn resume_after_source_kind_change_is_configuration_changed() {
        let fixture = fixture().await;
        let token = suspended_token(&fixture).await;

        // The same id now names a userpass source.
        let user_store = Arc::new(MemoryUserStore::new());
        let mut changed = SourceRegistry::new();
        changed.register_userpass(Arc::new(CredentialAuthenticator::new(
            "backdrop-sso",
            test_config(),
            user_store,
        )));

        let result = resolve_resume(&changed, &fixture.controller, Some(&token)).await;
        assert!(matches!(result, Err(BridgeError::ConfigurationChanged)));
    }

    #[tokio::test]
    async fn userpass_lookup_falls_back_to_sole_source() {
        let fixture = fixture().await;
        let source = fixture.registry.userpass(None).unwrap();
        assert_eq!(source.source_id(), "backdrop-userpass");
        assert!(fixture.registry.userpass(Some("backdrop-sso")).is_none());
        assert!(fixture.registry.userpass(Some("missing")).is_none());
    }
}
