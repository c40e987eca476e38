//! Timestamps arrive in several shapes: document-store objects, RFC 3339
//! strings, epoch milliseconds. They are normalized to `DateTime<Utc>` here.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const DISPLAY_FORMAT: &str = "%b %d, %Y %H:%M";

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Store {
        seconds: i64,
        #[serde(default)]
        nanoseconds: u32,
    },
    ServerSdk {
        #[serde(rename = "_seconds")]
        seconds: i64,
        #[serde(rename = "_nanoseconds", default)]
        nanoseconds: u32,
    },
    Text(String),
    Millis(i64),
    Float(f64),
}

impl RawTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Store {
                seconds,
                nanoseconds,
            }
            | Self::ServerSdk {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(*seconds, *nanoseconds),
            Self::Text(text) => parse_text(text),
            Self::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(ms) if ms.is_finite() => DateTime::from_timestamp_millis(*ms as i64),
            Self::Float(_) => None,
        }
    }
}

/// Parses an RFC 3339 string into UTC.
#[must_use]
pub fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Interprets any supported JSON shape. Unrecognized shapes give `None`.
#[must_use]
pub fn from_value(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    serde_json::from_value::<RawTimestamp>(value.clone())
        .ok()
        .and_then(|raw| raw.to_datetime())
}

#[must_use]
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[must_use]
pub fn format_display(dt: &DateTime<Utc>) -> String {
    dt.format(DISPLAY_FORMAT).to_string()
}

/// `#[serde(with = "timestamp::option")]` for lenient optional timestamps.
pub mod option {
    use super::{from_value, to_rfc3339, DateTime, Deserialize, Deserializer, Serializer, Utc};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => s.serialize_str(&to_rfc3339(dt)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(d)?;
        Ok(value.as_ref().and_then(from_value))
    }
}

/// Wrapper used by list records so a malformed timestamp never fails a whole document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stamp(#[serde(with = "option")] pub Option<DateTime<Utc>>);

impl Stamp {
    #[must_use]
    pub fn display(&self) -> Option<String> {
        self.0.as_ref().map(format_display)
    }
}
