use crux_core::capability::{CapabilityContext, Operation};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subscriptions::SubscriptionId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    NotDetermined,
    Denied,
    Authorized,
    Provisional,
}

impl PermissionState {
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized | Self::Provisional)
    }
}

/// Which delivery service issued a device token. Decides the profile field it is merged into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PushPlatform {
    Native,
    Web,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelImportance {
    Default,
    High,
    Max,
}

/// Android-style notification channel the shell creates before fetching a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub importance: ChannelImportance,
    pub vibration_pattern: Vec<u32>,
    pub light_color: String,
}

impl NotificationChannel {
    #[must_use]
    pub fn default_channel() -> Self {
        Self {
            id: "default".to_string(),
            name: "default".to_string(),
            importance: ChannelImportance::Max,
            vibration_pattern: vec![0, 250, 250, 250],
            light_color: "#FF231F7C".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomingNotification {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum PushOperation {
    GetPermissionStatus,
    RequestPermission,
    RegisterChannel(NotificationChannel),
    GetToken,
    Listen { subscription: SubscriptionId },
    StopListening { subscription: SubscriptionId },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum PushError {
    #[error("push notifications not available on this device")]
    NotAvailable,

    #[error("permission denied by user")]
    PermissionDenied,

    #[error("token request failed: {reason}")]
    TokenFailed { reason: String },

    #[error("unexpected push response")]
    UnexpectedOutput,

    #[error("unknown error: {message}")]
    Unknown { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum PushOutput {
    PermissionStatus(PermissionState),
    ChannelRegistered,
    Token {
        token: Option<String>,
        platform: PushPlatform,
    },
    Notification(IncomingNotification),
    Stopped,
}

impl PushOutput {
    #[must_use]
    pub const fn permission_status(&self) -> Option<PermissionState> {
        match self {
            Self::PermissionStatus(state) => Some(*state),
            _ => None,
        }
    }
}

pub type PushResult = Result<PushOutput, PushError>;

impl Operation for PushOperation {
    type Output = PushResult;
}

/// A device token paired with the service that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceToken {
    pub token: String,
    pub platform: PushPlatform,
}

#[derive(crux_core::macros::Capability)]
pub struct Push<Ev> {
    context: CapabilityContext<PushOperation, Ev>,
}

impl<Ev> Push<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<PushOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn permission_status<F>(&self, make_event: F)
    where
        F: FnOnce(PermissionState) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let status = ctx
                .request_from_shell(PushOperation::GetPermissionStatus)
                .await
                .ok()
                .and_then(|o| o.permission_status())
                .unwrap_or_default();
            ctx.update_app(make_event(status));
        });
    }

    pub fn request_permission<F>(&self, make_event: F)
    where
        F: FnOnce(PermissionState) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let status = ctx
                .request_from_shell(PushOperation::RequestPermission)
                .await
                .ok()
                .and_then(|o| o.permission_status())
                .unwrap_or(PermissionState::Denied);
            ctx.update_app(make_event(status));
        });
    }

    /// Creates the notification channels. Failures are logged per channel.
    pub fn register_channels(&self, channels: Vec<NotificationChannel>) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            for channel in channels {
                let id = channel.id.clone();
                if let Err(e) = ctx
                    .request_from_shell(PushOperation::RegisterChannel(channel))
                    .await
                {
                    tracing::warn!(channel = %id, error = %e, "notification channel registration failed");
                }
            }
        });
    }

    pub fn token<F>(&self, make_event: F)
    where
        F: FnOnce(Result<Option<DeviceToken>, PushError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = match ctx.request_from_shell(PushOperation::GetToken).await {
                Ok(PushOutput::Token { token, platform }) => {
                    Ok(token.map(|token| DeviceToken { token, platform }))
                }
                Ok(_) => Err(PushError::UnexpectedOutput),
                Err(e) => Err(e),
            };
            ctx.update_app(make_event(result));
        });
    }

    /// Delivers every foreground notification until the subscription is stopped.
    pub fn listen<F>(&self, subscription: SubscriptionId, make_event: F)
    where
        F: Fn(SubscriptionId, IncomingNotification) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let mut stream = ctx.stream_from_shell(PushOperation::Listen {
                subscription: subscription.clone(),
            });
            while let Some(output) = stream.next().await {
                match output {
                    Ok(PushOutput::Notification(notification)) => {
                        ctx.update_app(make_event(subscription.clone(), notification));
                    }
                    Ok(PushOutput::Stopped) => break,
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "notification stream error"),
                }
            }
        });
    }

    pub fn stop_listening(&self, subscription: SubscriptionId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(PushOperation::StopListening { subscription })
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_state_checks() {
        assert!(PermissionState::Authorized.is_authorized());
        assert!(PermissionState::Provisional.is_authorized());
        assert!(!PermissionState::Denied.is_authorized());
        assert!(!PermissionState::NotDetermined.is_authorized());
    }

    #[test]
    fn test_default_channel_settings() {
        let channel = NotificationChannel::default_channel();
        assert_eq!(channel.id, "default");
        assert_eq!(channel.importance, ChannelImportance::Max);
        assert_eq!(channel.vibration_pattern, vec![0, 250, 250, 250]);
        assert_eq!(channel.light_color, "#FF231F7C");
    }

    #[test]
    fn test_incoming_notification_tolerates_missing_fields() {
        let parsed: IncomingNotification = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.title, None);
        assert_eq!(parsed.body, None);
        assert!(parsed.data.is_null());
    }

    #[test]
    fn test_permission_output_extraction() {
        assert_eq!(
            PushOutput::PermissionStatus(PermissionState::Denied).permission_status(),
            Some(PermissionState::Denied)
        );
        assert_eq!(PushOutput::Stopped.permission_status(), None);
    }
}
