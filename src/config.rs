//! Per-source configuration.
//!
//! One `SourceConfig` per authentication-source instance, deserialized by
//! the host from its config file (TOML/JSON) and validated once at startup.
//! The secret salt is process-wide and shared with the legacy CMS; it is
//! the key for the trust-cookie MAC and must never be logged or emitted.

use serde::{Deserialize, Serialize};

use crate::attrs::AttributeSpec;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Configuration for one authentication-source instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Attributes to emit. `None` means every field of the user record
    /// (minus the forbidden ones).
    #[serde(default)]
    pub attributes: Option<AttributeSpec>,

    /// Name of the trust cookie set by the legacy CMS.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Path the trust cookie is scoped to (and cleared at).
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Shared secret keying the trust-cookie MAC. Process-wide, shared with
    /// the legacy CMS, never transmitted.
    pub secret_salt: String,

    /// Absolute URL of the legacy login page.
    pub legacy_login_url: String,

    /// Absolute URL of the legacy logout page.
    pub legacy_logout_url: String,

    /// Absolute URL of this bridge's resume endpoint.
    pub resume_url: String,

    /// Extra `tracing::debug!` detail in the mapping pipeline.
    #[serde(default)]
    pub debug: bool,

    /// How long a suspended authentication state stays resumable, in
    /// seconds.
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,
}

fn default_cookie_name() -> String {
    "backdropauth4ssp".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_state_ttl_secs() -> u64 {
    900
}

impl SourceConfig {
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.secret_salt.is_empty() {
            return Err(ConfigError::Validation(
                "secret_salt must not be empty".to_string(),
            ));
        }
        if self.cookie_name.is_empty() {
            return Err(ConfigError::Validation(
                "cookie_name must not be empty".to_string(),
            ));
        }
        if !self.cookie_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "cookie_path must start with '/': {:?}",
                self.cookie_path
            )));
        }
        for (name, value) in [
            ("legacy_login_url", &self.legacy_login_url),
            ("legacy_logout_url", &self.legacy_logout_url),
            ("resume_url", &self.resume_url),
        ] {
            url::Url::parse(value).map_err(|e| {
                ConfigError::Validation(format!("{name} is not an absolute URL: {e}"))
            })?;
        }
        Ok(())
    }

    /// State TTL as a `Duration`.
    pub fn state_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.state_ttl_secs)
    }
}

/// A valid config for tests across the crate.
#[cfg(test)]
pub(crate) fn test_config() -> SourceConfig {
    SourceConfig {
        attributes: None,
        cookie_name: default_cookie_name(),
        cookie_path: default_cookie_path(),
        secret_salt: "s3cr3t".to_string(),
        legacy_login_url: "https://cms.example.com/user/login".to_string(),
        legacy_logout_url: "https://cms.example.com/user/logout".to_string(),
        resume_url: "https://idp.example.com/bridge/resume".to_string(),
        debug: false,
        state_ttl_secs: default_state_ttl_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SourceConfig {
        test_config()
    }

    #[test]
    fn valid_config_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn empty_salt_is_rejected() {
        let mut config = sample();
        config.secret_salt.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn relative_login_url_is_rejected() {
        let mut config = sample();
        config.legacy_login_url = "/user/login".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_cookie_path_is_rejected() {
        let mut config = sample();
        config.cookie_path = "bridge".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_match_legacy_module() {
        let config: SourceConfig = serde_json::from_value(serde_json::json!({
            "secret_salt": "s3cr3t",
            "legacy_login_url": "https://cms.example.com/user/login",
            "legacy_logout_url": "https://cms.example.com/user/logout",
            "resume_url": "https://idp.example.com/bridge/resume",
        }))
        .unwrap();
        assert_eq!(config.cookie_name, "backdropauth4ssp");
        assert_eq!(config.cookie_path, "/");
        assert_eq!(config.state_ttl_secs, 900);
        assert!(config.attributes.is_none());
        assert!(!config.debug);
    }
}
