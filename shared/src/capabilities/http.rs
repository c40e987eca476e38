use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crux_http::Http;

use crate::event::Event;

pub type AppHttp = Http<Event>;

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, HttpError> {
        let url = url.into();

        if url.trim().is_empty() {
            return Err(HttpError::InvalidUrl {
                url: String::new(),
                reason: "URL cannot be empty".to_string(),
            });
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            });
        }

        let parsed = Url::parse(&url).map_err(|e| HttpError::InvalidUrl {
            url: Self::truncate_url(&url),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme().to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            });
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: "URL must have a host".to_string(),
            })?
            .to_lowercase();

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        Ok(Self {
            url: parsed.to_string(),
            host,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn truncate_url(url: &str) -> String {
        if url.len() <= 100 {
            url.to_string()
        } else {
            let cut: String = url.chars().take(100).collect();
            format!("{cut}...")
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request body too large: {size} bytes exceeds maximum of {max} bytes")]
    BodyTooLarge { size: usize, max: usize },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

/// What came back from a one-shot request, reduced to what the core inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpOutcome {
    Response { status: u16, body: Vec<u8> },
    Transport { message: String },
}

/// Where a failed response's explanation came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    Json(String),
    JsonWithoutDetail,
    Text(String),
    Empty,
}

impl HttpOutcome {
    pub fn from_result(result: crux_http::Result<crux_http::Response<Vec<u8>>>) -> Self {
        match result {
            Ok(mut response) => {
                let status: u16 = response.status().into();
                let body = response.take_body().unwrap_or_default();
                Self::Response { status, body }
            }
            Err(e) => Self::Transport {
                message: e.to_string(),
            },
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Response { status, .. } if (200..300).contains(status))
    }

    /// JSON `error`, then JSON `message`, then the raw body text.
    #[must_use]
    pub fn error_detail(&self) -> ErrorDetail {
        let Self::Response { body, .. } = self else {
            return ErrorDetail::Empty;
        };

        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
            if value.is_object() {
                // Each key is read on its own; a non-string `error` does not hide `message`.
                let text = |key: &str| {
                    value
                        .get(key)
                        .and_then(serde_json::Value::as_str)
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                };
                return match text("error").or_else(|| text("message")) {
                    Some(detail) => ErrorDetail::Json(detail),
                    None => ErrorDetail::JsonWithoutDetail,
                };
            }
        }

        let text = String::from_utf8_lossy(body).trim().to_string();
        if text.is_empty() {
            ErrorDetail::Empty
        } else {
            ErrorDetail::Text(text)
        }
    }
}

/// Fires one JSON POST. The outcome always comes back as an event; nothing retries.
pub fn post_json<T, F>(
    http: &AppHttp,
    url: &ValidatedUrl,
    payload: &T,
    make_event: F,
) -> Result<(), HttpError>
where
    T: Serialize,
    F: FnOnce(HttpOutcome) -> Event + Send + 'static,
{
    let body = serde_json::to_vec(payload).map_err(|e| HttpError::Serialization {
        message: e.to_string(),
    })?;

    if body.len() > MAX_REQUEST_BODY_SIZE {
        return Err(HttpError::BodyTooLarge {
            size: body.len(),
            max: MAX_REQUEST_BODY_SIZE,
        });
    }

    tracing::debug!(host = url.host(), bytes = body.len(), "posting json");

    http.post(url.as_str())
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body_bytes(body)
        .send(move |result| make_event(HttpOutcome::from_result(result)));

    Ok(())
}
