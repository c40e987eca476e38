use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::capabilities::push::{DeviceToken, PermissionState};
use crate::config::AppConfig;
use crate::feeds::Feeds;
use crate::report::{ReportForm, Submission};
use crate::session::Session;
use crate::subscriptions::Subscriptions;
use crate::{AppError, ErrorClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Info,
    Success,
    Error,
}

/// One modal message for the shell to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub kind: AlertKind,
}

impl Alert {
    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: AlertKind::Info,
        }
    }

    #[must_use]
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: AlertKind::Success,
        }
    }
}

impl From<&AppError> for Alert {
    fn from(error: &AppError) -> Self {
        Self {
            title: error.title.clone(),
            message: error.message.clone(),
            kind: AlertKind::Error,
        }
    }
}

#[derive(Debug, Default)]
pub struct LoginState {
    pub in_flight: bool,
    /// The auth listener has reported a signed-in user since it started.
    pub provider_user_seen: bool,
}

#[derive(Debug, Default)]
pub struct PushState {
    pub permission: PermissionState,
    pub token: Option<DeviceToken>,
}

#[derive(Debug, Default)]
pub struct ProfileState {
    pub uploading_photo: bool,
    pub logging_out: bool,
}

#[derive(Debug)]
pub struct Model {
    pub config: AppConfig,
    pub started: bool,
    pub session: Session,
    pub login: LoginState,
    pub push: PushState,
    pub profile: ProfileState,
    pub report: ReportForm,
    pub submission: Option<Submission>,
    pub feeds: Feeds,
    pub subscriptions: Subscriptions,
    pub alerts: VecDeque<Alert>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            config: AppConfig::from_build_env(),
            started: false,
            session: Session::default(),
            login: LoginState::default(),
            push: PushState::default(),
            profile: ProfileState::default(),
            report: ReportForm::default(),
            submission: None,
            feeds: Feeds::default(),
            subscriptions: Subscriptions::default(),
            alerts: VecDeque::new(),
        }
    }
}

impl Model {
    /// Queues user-visible errors; side-channel ones only reach the log.
    pub fn report_error(&mut self, error: &AppError) {
        match error.class() {
            ErrorClass::SideChannel => {
                tracing::warn!(code = error.code(), error = %error, "best-effort step failed");
            }
            ErrorClass::Precondition => {
                tracing::info!(code = error.code(), "action blocked");
                self.alerts.push_back(Alert::from(error));
            }
            ErrorClass::Collaborator => {
                tracing::error!(code = error.code(), error = %error, "action failed");
                self.alerts.push_back(Alert::from(error));
            }
        }
    }

    pub fn push_alert(&mut self, alert: Alert) {
        self.alerts.push_back(alert);
    }
}
