use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::capabilities::push::{ChannelImportance, IncomingNotification, NotificationChannel};
use crate::{lenient, timestamp};

pub const DEFAULT_NOTIFICATION_TITLE: &str = "Notification";
pub const DEFAULT_ALARM_TYPE: &str = "ALERT";
pub const DEFAULT_SENDER: &str = "Admin";
pub const DEFAULT_STATUS: &str = "Active";
pub const DEFAULT_AUDIENCE: &str = "All Residents";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum AlarmLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl AlarmLevel {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Case-insensitive synonym table; anything unrecognized is `Medium`.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "critical" | "emergency" => Self::Critical,
            "high" | "severe" => Self::High,
            "medium" | "moderate" => Self::Medium,
            "low" | "warning" => Self::Low,
            _ => Self::Medium,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    #[must_use]
    pub const fn is_urgent(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    #[must_use]
    pub const fn channel_id(self) -> &'static str {
        match self {
            Self::Low => "alarm-low",
            Self::Medium => "alarm-medium",
            Self::High => "alarm-high",
            Self::Critical => "alarm-critical",
        }
    }

    #[must_use]
    pub fn channel(self) -> NotificationChannel {
        let importance = match self {
            Self::Low | Self::Medium => ChannelImportance::Default,
            Self::High => ChannelImportance::High,
            Self::Critical => ChannelImportance::Max,
        };
        NotificationChannel {
            id: self.channel_id().to_string(),
            name: format!("{} alarms", self.as_str()),
            importance,
            ..NotificationChannel::default_channel()
        }
    }
}

impl std::fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AlarmLevel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(value
            .as_ref()
            .and_then(Value::as_str)
            .map(Self::from_token)
            .unwrap_or_default())
    }
}

/// Every channel the shell registers at start: `default` plus one per level.
#[must_use]
pub fn all_channels() -> Vec<NotificationChannel> {
    std::iter::once(NotificationChannel::default_channel())
        .chain(AlarmLevel::ALL.into_iter().map(AlarmLevel::channel))
        .collect()
}

/// Free-form `data` of a push, decoded field by field with every field
/// optional. A wrong-typed field is dropped on its own.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AlarmPayload {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub alarm_level: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub priority: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub severity: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub alarm_type: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::opt_string")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub sent_by: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,
    pub sent_at: Option<Value>,
    #[serde(deserialize_with = "lenient::opt_bool")]
    pub is_urgent: Option<bool>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub instructions: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub target_audience: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string_list")]
    pub images: Option<Vec<String>>,
}

impl AlarmPayload {
    /// Data that is not an object is treated as empty.
    #[must_use]
    pub fn decode(data: &Value) -> Self {
        if !data.is_object() {
            if !data.is_null() {
                tracing::warn!("notification data is not an object, using defaults");
            }
            return Self::default();
        }
        serde_json::from_value(data.clone()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "notification data did not decode, using defaults");
            Self::default()
        })
    }

    #[must_use]
    pub fn level(&self) -> AlarmLevel {
        [&self.alarm_level, &self.priority, &self.severity]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(AlarmLevel::from_token)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    pub title: String,
    pub message: String,
    pub alarm_type: String,
    pub alarm_level: AlarmLevel,
    pub sent_by: String,
    pub status: String,
    pub sent_at: String,
    pub is_urgent: bool,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub instructions: Option<String>,
    pub target_audience: String,
    pub images: Vec<String>,
}

fn pick(values: &[Option<&str>], default: &str) -> String {
    values
        .iter()
        .flatten()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

impl AlarmRecord {
    #[must_use]
    pub fn from_notification(notification: &IncomingNotification, now: DateTime<Utc>) -> Self {
        let payload = AlarmPayload::decode(&notification.data);
        let level = payload.level();
        let sent_at = payload
            .sent_at
            .as_ref()
            .and_then(timestamp::from_value)
            .unwrap_or(now);

        Self {
            title: pick(&[notification.title.as_deref()], DEFAULT_NOTIFICATION_TITLE),
            message: pick(
                &[notification.body.as_deref(), payload.message.as_deref()],
                "",
            ),
            alarm_type: pick(
                &[payload.alarm_type.as_deref(), payload.kind.as_deref()],
                DEFAULT_ALARM_TYPE,
            ),
            alarm_level: level,
            sent_by: pick(&[payload.sent_by.as_deref()], DEFAULT_SENDER),
            status: pick(&[payload.status.as_deref()], DEFAULT_STATUS),
            sent_at: timestamp::to_rfc3339(&sent_at),
            is_urgent: payload.is_urgent.unwrap_or_else(|| level.is_urgent()),
            location: pick(&[payload.location.as_deref()], ""),
            instructions: payload
                .instructions
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty()),
            target_audience: pick(&[payload.target_audience.as_deref()], DEFAULT_AUDIENCE),
            images: payload
                .images
                .unwrap_or_default()
                .into_iter()
                .filter(|url| !url.trim().is_empty())
                .collect(),
        }
    }

    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Text the user sees for a push, with the literal fallbacks.
#[must_use]
pub fn alert_text(notification: &IncomingNotification) -> (String, String) {
    (
        pick(&[notification.title.as_deref()], DEFAULT_NOTIFICATION_TITLE),
        notification.body.clone().unwrap_or_default(),
    )
}
