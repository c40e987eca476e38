use secrecy::SecretString;

use crate::capabilities::auth::{AuthError, AuthUser};
use crate::capabilities::files::FileError;
use crate::capabilities::http::HttpOutcome;
use crate::capabilities::kv::StorageResult;
use crate::capabilities::location::{Coordinates, GeocodedPlace, LocationError};
use crate::capabilities::push::{DeviceToken, IncomingNotification, PermissionState, PushError};
use crate::capabilities::store::{Document, StoreError};
use crate::config::AppConfig;
use crate::feeds::FeedKind;
use crate::subscriptions::SubscriptionId;

// Large variants boxed.
#[derive(Debug, Clone)]
pub enum Event {
    // Lifecycle
    AppStarted,
    AppStopping,
    Configure(Box<AppConfig>),

    // Session
    SessionRestored(StorageResult<Option<Vec<u8>>>),
    SessionPersisted(StorageResult<()>),
    AuthStateChanged {
        subscription: SubscriptionId,
        user: Option<AuthUser>,
    },

    // Login
    LoginRequested {
        email: String,
        password: SecretString,
    },
    SignedIn(Result<AuthUser, AuthError>),
    ProfileFetched {
        uid: String,
        result: Result<Option<Document>, StoreError>,
    },
    PushPermissionChecked(PermissionState),
    PushPermissionRequested(PermissionState),
    PushTokenReceived(Result<Option<DeviceToken>, PushError>),
    PushTokenMerged(Result<(), StoreError>),
    PushTokenSaved(Box<HttpOutcome>),

    // Logout
    LogoutRequested,
    SignedOut(Result<(), AuthError>),
    SessionCleared(StorageResult<()>),

    // Profile
    ProfilePhotoPicked {
        local_uri: String,
    },
    ProfilePhotoUploaded(Result<String, FileError>),
    ProfilePhotoLinked {
        photo_url: String,
        result: Result<(), AuthError>,
    },
    ProfileDocumentUpdated(Result<(), StoreError>),

    // Report form
    ReportScreenOpened,
    ReportScreenClosed,
    EmergencyTypeSelected(String),
    DescriptionChanged(String),
    PhotoAttached(String),
    PhotoRemoved(usize),
    ReportSubmitted,
    ReportPhotoUploaded(Result<String, FileError>),
    ReportResponse(Box<HttpOutcome>),

    // Location
    LocationPermission {
        generation: u64,
        result: Result<bool, LocationError>,
    },
    LocationPosition {
        generation: u64,
        result: Result<Option<Coordinates>, LocationError>,
    },
    LocationGeocoded {
        generation: u64,
        result: Result<Vec<GeocodedPlace>, LocationError>,
    },

    // Alarms
    NotificationReceived {
        subscription: SubscriptionId,
        notification: Box<IncomingNotification>,
    },
    AlarmPersisted(Result<String, StoreError>),

    // Feeds
    FeedOpened(FeedKind),
    FeedClosed(FeedKind),
    FeedRefreshed(FeedKind),
    FeedSnapshot {
        kind: FeedKind,
        subscription: SubscriptionId,
        result: Result<Vec<Document>, StoreError>,
    },

    AlertDismissed,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppStarted => "app_started",
            Self::AppStopping => "app_stopping",
            Self::Configure(_) => "configure",
            Self::SessionRestored(_) => "session_restored",
            Self::SessionPersisted(_) => "session_persisted",
            Self::AuthStateChanged { .. } => "auth_state_changed",
            Self::LoginRequested { .. } => "login_requested",
            Self::SignedIn(_) => "signed_in",
            Self::ProfileFetched { .. } => "profile_fetched",
            Self::PushPermissionChecked(_) => "push_permission_checked",
            Self::PushPermissionRequested(_) => "push_permission_requested",
            Self::PushTokenReceived(_) => "push_token_received",
            Self::PushTokenMerged(_) => "push_token_merged",
            Self::PushTokenSaved(_) => "push_token_saved",
            Self::LogoutRequested => "logout_requested",
            Self::SignedOut(_) => "signed_out",
            Self::SessionCleared(_) => "session_cleared",
            Self::ProfilePhotoPicked { .. } => "profile_photo_picked",
            Self::ProfilePhotoUploaded(_) => "profile_photo_uploaded",
            Self::ProfilePhotoLinked { .. } => "profile_photo_linked",
            Self::ProfileDocumentUpdated(_) => "profile_document_updated",
            Self::ReportScreenOpened => "report_screen_opened",
            Self::ReportScreenClosed => "report_screen_closed",
            Self::EmergencyTypeSelected(_) => "emergency_type_selected",
            Self::DescriptionChanged(_) => "description_changed",
            Self::PhotoAttached(_) => "photo_attached",
            Self::PhotoRemoved(_) => "photo_removed",
            Self::ReportSubmitted => "report_submitted",
            Self::ReportPhotoUploaded(_) => "report_photo_uploaded",
            Self::ReportResponse(_) => "report_response",
            Self::LocationPermission { .. } => "location_permission",
            Self::LocationPosition { .. } => "location_position",
            Self::LocationGeocoded { .. } => "location_geocoded",
            Self::NotificationReceived { .. } => "notification_received",
            Self::AlarmPersisted(_) => "alarm_persisted",
            Self::FeedOpened(_) => "feed_opened",
            Self::FeedClosed(_) => "feed_closed",
            Self::FeedRefreshed(_) => "feed_refreshed",
            Self::FeedSnapshot { .. } => "feed_snapshot",
            Self::AlertDismissed => "alert_dismissed",
        }
    }

    /// Events the shell sends on behalf of the user, as opposed to collaborator responses.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::LoginRequested { .. }
                | Self::LogoutRequested
                | Self::ProfilePhotoPicked { .. }
                | Self::ReportScreenOpened
                | Self::ReportScreenClosed
                | Self::EmergencyTypeSelected(_)
                | Self::DescriptionChanged(_)
                | Self::PhotoAttached(_)
                | Self::PhotoRemoved(_)
                | Self::ReportSubmitted
                | Self::FeedOpened(_)
                | Self::FeedClosed(_)
                | Self::FeedRefreshed(_)
                | Self::AlertDismissed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_debug_does_not_leak_password() {
        let event = Event::LoginRequested {
            email: "ana@example.com".into(),
            password: SecretString::new("hunter2".into()),
        };
        assert!(!format!("{event:?}").contains("hunter2"));
        assert!(event.is_user_initiated());
    }

    #[test]
    fn responses_are_not_user_initiated() {
        assert!(!Event::SessionPersisted(Ok(())).is_user_initiated());
        assert_eq!(Event::AlertDismissed.name(), "alert_dismissed");
    }
}
