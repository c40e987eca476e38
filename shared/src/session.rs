use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::capabilities::kv::{KvError, StorageKey, TypedSlot, SESSION_KEY};
use crate::{lenient, timestamp};

/// Only profiles with this role may use the resident app.
pub const RESIDENT_ROLE: &str = "user";

pub const PROFILE_COLLECTION: &str = "users";

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "lenient::string")]
    pub uid: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub last_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub contact_number: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub barangay: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub role: String,
    #[serde(
        rename = "photoURL",
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo_url: Option<String>,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
}

// Contact details stay out of logs.
impl fmt::Debug for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserProfile")
            .field("uid", &self.uid)
            .field("role", &self.role)
            .field("email_present", &!self.email.is_empty())
            .field("contact_number_present", &!self.contact_number.is_empty())
            .field("photo_url_present", &self.photo_url.is_some())
            .finish_non_exhaustive()
    }
}

impl UserProfile {
    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.role == RESIDENT_ROLE
    }

    /// "First Last", trimmed; empty when neither name is set.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Name used as the report's `reportedBy`.
    #[must_use]
    pub fn reporter_name(&self) -> String {
        let name = self.full_name();
        if name.is_empty() {
            self.email.clone()
        } else {
            name
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        let name = self.full_name();
        if !name.is_empty() {
            name
        } else if !self.email.trim().is_empty() {
            self.email.trim().to_string()
        } else {
            "User".to_string()
        }
    }

    #[must_use]
    pub fn initials(&self) -> String {
        let initials: String = self
            .full_name()
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect();
        if initials.is_empty() {
            "U".to_string()
        } else {
            initials
        }
    }

    #[must_use]
    pub fn member_since(&self) -> Option<String> {
        self.created_at
            .as_ref()
            .map(|dt| dt.format("%b %d, %Y").to_string())
    }
}

#[must_use]
pub fn display_name(user: Option<&UserProfile>) -> String {
    user.map_or_else(|| "Guest".to_string(), UserProfile::display_name)
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session could not be encoded: {0}")]
    Encode(String),

    #[error("stored session is corrupt: {0}")]
    Corrupt(String),
}

impl From<KvError> for SessionError {
    fn from(e: KvError) -> Self {
        Self::Encode(e.to_string())
    }
}

/// What the app must do to the on-device mirror after a session change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistCommand {
    Write(Vec<u8>),
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrateOutcome {
    Restored,
    Empty,
    /// A user was set before the stored value arrived; memory wins.
    Skipped,
    Corrupt(SessionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    Loading,
    Login,
    Home,
}

/// Single owner of the signed-in user and its persisted mirror.
#[derive(Debug, Default)]
pub struct Session {
    user: Option<UserProfile>,
    hydrated: bool,
    changed_before_hydration: bool,
}

const SLOT: TypedSlot<UserProfile> = TypedSlot::new(StorageKey::fixed(SESSION_KEY));

impl Session {
    #[must_use]
    pub fn storage_key() -> String {
        SLOT.key()
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Memory changes first; the returned command mirrors it to storage.
    pub fn set_user(&mut self, user: Option<UserProfile>) -> Result<PersistCommand, SessionError> {
        if !self.hydrated {
            self.changed_before_hydration = true;
        }
        self.user = user;
        match &self.user {
            Some(profile) => Ok(PersistCommand::Write(SLOT.encode(profile)?)),
            None => Ok(PersistCommand::Remove),
        }
    }

    pub fn hydrate(&mut self, stored: Option<&[u8]>) -> HydrateOutcome {
        if self.hydrated {
            return HydrateOutcome::Skipped;
        }
        self.hydrated = true;

        if self.changed_before_hydration {
            return HydrateOutcome::Skipped;
        }

        match stored {
            None => HydrateOutcome::Empty,
            Some(bytes) => match SLOT.decode(bytes) {
                Ok(profile) => {
                    self.user = Some(profile);
                    HydrateOutcome::Restored
                }
                Err(e) => HydrateOutcome::Corrupt(SessionError::Corrupt(e.to_string())),
            },
        }
    }

    /// Forgets the user once the stored copy is already gone.
    pub fn clear(&mut self) {
        if !self.hydrated {
            self.changed_before_hydration = true;
        }
        self.user = None;
    }

    /// Storage read failed; start empty.
    pub fn mark_hydrated(&mut self) {
        self.hydrated = true;
    }

    #[must_use]
    pub fn route(&self) -> Route {
        if !self.hydrated {
            return Route::Loading;
        }
        match &self.user {
            Some(user) if user.is_resident() => Route::Home,
            _ => Route::Login,
        }
    }
}
