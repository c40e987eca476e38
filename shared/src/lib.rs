// lib.rs - shared core for the resident emergency reporting app

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod alarm;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod feeds;
pub mod lenient;
pub mod location;
pub mod login;
pub mod model;
pub mod report;
pub mod session;
pub mod subscriptions;
pub mod timestamp;
pub mod view;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::AppConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

pub const MAX_REPORT_PHOTOS: usize = 3;
pub const DESCRIPTION_PREVIEW_LENGTH: usize = 80;

/// How an error is allowed to reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Caught before any collaborator call; blocks the action.
    Precondition,
    /// A collaborator call failed; the action is aborted.
    Collaborator,
    /// Best-effort work failed; logged, never shown.
    SideChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingSession,
    Configuration,
    Validation,
    Authentication,
    AccessDenied,
    ProfileNotFound,
    Network,
    Server,
    Upload,
    Storage,
    Decode,
    Push,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingSession => "MISSING_SESSION",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Authentication => "AUTH_ERROR",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::ProfileNotFound => "PROFILE_NOT_FOUND",
            Self::Network => "NETWORK_ERROR",
            Self::Server => "SERVER_ERROR",
            Self::Upload => "UPLOAD_ERROR",
            Self::Storage => "STORAGE_ERROR",
            Self::Decode => "DECODE_ERROR",
            Self::Push => "PUSH_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    #[must_use]
    pub const fn class(self) -> ErrorClass {
        match self {
            Self::MissingSession | Self::Configuration | Self::Validation => {
                ErrorClass::Precondition
            }

            Self::Authentication
            | Self::AccessDenied
            | Self::ProfileNotFound
            | Self::Network
            | Self::Server
            | Self::Upload
            | Self::Internal => ErrorClass::Collaborator,

            Self::Storage | Self::Decode | Self::Push => ErrorClass::SideChannel,
        }
    }
}

/// A failure scoped to one user action or background handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub title: String,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// Side-channel failures stay in the logs.
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        !matches!(self.kind.class(), ErrorClass::SideChannel)
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code(), self.title, self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

/// Shortens free text for list cards, on a char boundary.
#[must_use]
pub fn preview(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
