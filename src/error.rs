//! Bridge error taxonomy.
//!
//! Security-relevant and flow-integrity failures abort the request with no
//! partial success; data-shape problems inside the mapper never reach this
//! type (they degrade to placeholders there). Response bodies stay generic
//! so no error ever confirms or denies that an account exists.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{config::ConfigError, state::StateError, store::StoreError};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Trust cookie signature mismatch. Indicates tampering or an
    /// out-of-date legacy module; never downgraded to anonymous.
    #[error("trust cookie signature mismatch")]
    TamperedCredential,

    /// Bad username/password. Never says which half was wrong.
    #[error("wrong username or password")]
    WrongCredentials,

    /// Resume called without a state token.
    #[error("missing state token")]
    MissingToken,

    /// Resume token unknown, expired, or already consumed.
    #[error("authentication state not found")]
    StateNotFound,

    /// The authentication source recorded in the suspended state no longer
    /// exists or changed kind while the user was at the login page.
    #[error("authentication source changed during login")]
    ConfigurationChanged,

    /// The user came back from the login page without a valid trust cookie.
    #[error("user not authenticated after login page")]
    NotAuthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            BridgeError::TamperedCredential => (
                StatusCode::FORBIDDEN,
                "tampered_credential",
                "Authentication failed",
            ),
            BridgeError::WrongCredentials => (
                StatusCode::UNAUTHORIZED,
                "wrong_credentials",
                "Incorrect username or password",
            ),
            BridgeError::MissingToken => (
                StatusCode::BAD_REQUEST,
                "missing_state",
                "Missing state parameter",
            ),
            BridgeError::StateNotFound => (
                StatusCode::BAD_REQUEST,
                "state_not_found",
                "Authentication state not found or expired",
            ),
            BridgeError::ConfigurationChanged => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_changed",
                "Authentication source configuration changed",
            ),
            BridgeError::NotAuthenticated => (
                StatusCode::FORBIDDEN,
                "not_authenticated",
                "Not authenticated after login",
            ),
            BridgeError::Store(_) | BridgeError::State(_) | BridgeError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal authentication error",
            ),
        };

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}
