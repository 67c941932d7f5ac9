//! backdropbridge — trust handoff between a legacy Backdrop CMS and a
//! SAML identity-provider runtime.
//!
//! A user who is already logged in to the CMS carries an
//! integrity-protected trust cookie; the bridge verifies it, loads the
//! user record, and translates it into the identity-provider attribute
//! vocabulary. A user without a valid cookie is round-tripped to the CMS
//! login page through a suspend/resume flow backed by externally persisted
//! state. A username/password source shares the same attribute pipeline.
//!
//! The host runtime supplies the collaborators: a [`store::UserStore`]
//! over the CMS user database, a [`state::StateStore`] for suspended
//! flows, and a [`state::AuthCompleter`] that finishes authentication once
//! attributes are available.

pub mod attrs;
pub mod config;
pub mod cookie;
pub mod error;
pub mod routes;
pub mod source;
pub mod state;
pub mod store;

pub use attrs::{
    AttributeMapper, AttributeRule, AttributeSet, AttributeSpec, FieldValue, RawUserRecord,
};
pub use config::SourceConfig;
pub use error::BridgeError;
pub use routes::{BridgeState, router};
pub use source::{
    AuthOutcome, CredentialAuthenticator, SourceRegistry, SsoBridgeSource, resolve_resume,
};
pub use state::{
    AuthCompleter, MemoryStateStore, SharedStateStore, StateStore, SuspendResumeController,
    SuspendedContext,
};
pub use store::{MemoryUserStore, SubjectId, UserStore};
