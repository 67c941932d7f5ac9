//! HTTP boundary for the bridge flows.
//!
//! - `GET /authenticate` — run the cookie handshake for one source;
//!   redirects either onward (already authenticated) or to the legacy
//!   login page (suspended).
//! - `GET /resume` — resume a suspended flow; consumes the `State` token.
//! - `POST /login` — username/password authentication.
//! - `GET /logout` — expire the trust cookie and redirect to the legacy
//!   logout page.
//!
//! Cookie transport lives here, not in the sources: the trust cookie is
//! read and unconditionally expired on every handshake request, so one
//! cookie value can never be presented twice.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_cookies::{Cookie, CookieManagerLayer, Cookies, cookie::time::Duration as CookieDuration};

use crate::{
    config::SourceConfig,
    error::BridgeError,
    source::{AuthOutcome, SourceRegistry, resolve_resume},
    state::{AuthCompleter, SuspendResumeController, SuspendedContext},
};

/// Shared state for the bridge routes.
#[derive(Clone)]
pub struct BridgeState {
    pub registry: Arc<SourceRegistry>,
    pub controller: SuspendResumeController,
    pub completer: Arc<dyn AuthCompleter>,
}

/// Build the bridge router. The cookie layer is included; mount the result
/// wherever the host runtime serves this module.
pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/authenticate", get(authenticate))
        .route("/resume", get(resume))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

/// Query parameters for the authenticate endpoint.
#[derive(Debug, Deserialize)]
pub struct AuthenticateQuery {
    /// Which configured authentication source to run.
    pub source: String,
    /// URL to return the user to once authentication completes.
    #[serde(default, rename = "ReturnTo")]
    pub return_to: Option<String>,
}

/// Query parameters for the resume endpoint.
#[derive(Debug, Deserialize)]
pub struct ResumeQuery {
    /// Opaque token identifying the suspended authentication state.
    #[serde(default, rename = "State")]
    pub state: Option<String>,
}

/// Form body for the login endpoint.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Which userpass source to use; optional when only one is configured.
    #[serde(default)]
    pub source: Option<String>,
}

/// Query parameters for the logout endpoint.
#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    pub source: String,
    /// URL the legacy logout page should send the user back to.
    #[serde(default, rename = "ReturnTo")]
    pub return_to: Option<String>,
}

/// Build a removal cookie matching the trust cookie's name and path.
fn build_removal_cookie(config: &SourceConfig) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone())
        .path(config.cookie_path.clone())
        .http_only(true)
        .max_age(CookieDuration::ZERO)
        .build()
}

/// Read the trust cookie and expire it in the response, whatever happens
/// next. Clear-on-read makes the cookie single-use.
fn take_trust_cookie(cookies: &Cookies, config: &SourceConfig) -> Option<String> {
    let value = cookies
        .get(&config.cookie_name)
        .map(|cookie| cookie.value().to_string());
    cookies.add(build_removal_cookie(config));
    value
}

async fn authenticate(
    State(state): State<BridgeState>,
    Query(query): Query<AuthenticateQuery>,
    cookies: Cookies,
) -> Result<Response, BridgeError> {
    let source = state
        .registry
        .external(&query.source)
        .ok_or(BridgeError::ConfigurationChanged)?;

    let cookie_value = take_trust_cookie(&cookies, source.config());
    let payload = json!({ "ReturnTo": query.return_to });
    let context = SuspendedContext::new(
        crate::source::SsoBridgeSource::OWNER_KEY,
        source.source_id(),
        payload.clone(),
    );

    match source.authenticate(cookie_value.as_deref(), payload).await? {
        AuthOutcome::Authenticated(attributes) => {
            let next = state.completer.complete(&context, attributes).await?;
            Ok(Redirect::to(&next).into_response())
        }
        AuthOutcome::Redirect(login_url) => Ok(Redirect::to(&login_url).into_response()),
    }
}

async fn resume(
    State(state): State<BridgeState>,
    Query(query): Query<ResumeQuery>,
    cookies: Cookies,
) -> Result<Response, BridgeError> {
    let (source, context) = resolve_resume(
        &state.registry,
        &state.controller,
        query.state.as_deref(),
    )
    .await?;

    let cookie_value = take_trust_cookie(&cookies, source.config());
    let attributes = source.verify_after_login(cookie_value.as_deref()).await?;

    let next = state.completer.complete(&context, attributes).await?;
    Ok(Redirect::to(&next).into_response())
}

async fn login(
    State(state): State<BridgeState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, BridgeError> {
    let source = state
        .registry
        .userpass(form.source.as_deref())
        .ok_or(BridgeError::ConfigurationChanged)?;

    let attributes = source.login(&form.username, &form.password).await?;
    Ok(Json(attributes).into_response())
}

async fn logout(
    State(state): State<BridgeState>,
    Query(query): Query<LogoutQuery>,
    cookies: Cookies,
) -> Result<Response, BridgeError> {
    let source = state
        .registry
        .external(&query.source)
        .ok_or(BridgeError::ConfigurationChanged)?;

    // Armor plating: whatever local marker exists, the trust cookie dies here.
    cookies.add(build_removal_cookie(source.config()));

    let logout_url = source.logout_redirect(query.return_to.as_deref())?;
    Ok(Redirect::to(&logout_url).into_response())
}
