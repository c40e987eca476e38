use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::http::ValidatedUrl;

pub const DEFAULT_ALARM_COLLECTION: &str = "EmergencyCases";
pub const DEFAULT_NOTIFICATION_SOUND: &str = "notification.mp3";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend base URL is not configured")]
    MissingBaseUrl,

    #[error("backend base URL '{url}' is invalid: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Values injected at build time, optionally replaced by the shell at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub base_url: Option<String>,
    pub admin_email: Option<String>,
    pub maps_api_key: Option<String>,
    pub alarm_collection: String,
    pub notification_sound: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            admin_email: None,
            maps_api_key: None,
            alarm_collection: DEFAULT_ALARM_COLLECTION.to_string(),
            notification_sound: DEFAULT_NOTIFICATION_SOUND.to_string(),
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn from_build_env() -> Self {
        Self {
            base_url: non_empty(option_env!("EMERGENCY_BASE_URL")),
            admin_email: non_empty(option_env!("EMERGENCY_ADMIN_EMAIL")),
            maps_api_key: non_empty(option_env!("GOOGLE_MAPS_API_KEY")),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = non_empty(Some(base_url.into().as_str()));
        self
    }

    #[must_use]
    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = non_empty(Some(email.into().as_str()));
        self
    }

    #[must_use]
    pub fn has_base_url(&self) -> bool {
        self.base_url.is_some()
    }

    /// Joins `path` onto the base URL with exactly one separator.
    pub fn endpoint(&self, path: &str) -> Result<ValidatedUrl, ConfigError> {
        let base = self.base_url.as_deref().ok_or(ConfigError::MissingBaseUrl)?;
        let joined = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        ValidatedUrl::new(joined).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
