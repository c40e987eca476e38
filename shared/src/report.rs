use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::alarm::AlarmLevel;
use crate::capabilities::http::{ErrorDetail, HttpOutcome, ValidatedUrl};
use crate::config::AppConfig;
use crate::location::AddressState;
use crate::session::UserProfile;
use crate::timestamp;
use crate::{AppError, ErrorKind, MAX_REPORT_PHOTOS};

pub const SEND_TO_USER_PATH: &str = "send-to-user";
pub const SEND_TO_ADMINS_PATH: &str = "send-to-admins";
pub const REPORT_SOUND: &str = "default";
pub const PHOTO_FOLDER: &str = "emergencyReports";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyType {
    #[default]
    Accident,
    Fire,
    Medical,
    Flood,
    Quake,
    Robbery,
    Assault,
    Other,
}

impl EmergencyType {
    pub const ALL: [Self; 8] = [
        Self::Accident,
        Self::Fire,
        Self::Medical,
        Self::Flood,
        Self::Quake,
        Self::Robbery,
        Self::Assault,
        Self::Other,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Accident => "accident",
            Self::Fire => "fire",
            Self::Medical => "medical",
            Self::Flood => "flood",
            Self::Quake => "quake",
            Self::Robbery => "robbery",
            Self::Assault => "assault",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accident => "Accident",
            Self::Fire => "Fire",
            Self::Medical => "Medical",
            Self::Flood => "Flood",
            Self::Quake => "Quake",
            Self::Robbery => "Robbery",
            Self::Assault => "Assault",
            Self::Other => "Other",
        }
    }

    #[must_use]
    pub const fn priority(self) -> AlarmLevel {
        match self {
            Self::Fire | Self::Medical | Self::Quake => AlarmLevel::Critical,
            Self::Accident | Self::Flood | Self::Robbery | Self::Assault => AlarmLevel::High,
            Self::Other => AlarmLevel::Low,
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(key))
    }

    #[must_use]
    pub fn upper(self) -> String {
        self.key().to_ascii_uppercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    UploadingPhotos {
        done: usize,
        total: usize,
    },
    Sending,
}

impl SubmissionStatus {
    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ReportForm {
    pub selected_type: Option<EmergencyType>,
    pub description: String,
    pub photos: Vec<String>,
    pub address: AddressState,
    pub status: SubmissionStatus,
    pub close_requested: bool,
}

impl Default for ReportForm {
    fn default() -> Self {
        Self {
            selected_type: Some(EmergencyType::default()),
            description: String::new(),
            photos: Vec::new(),
            address: AddressState::default(),
            status: SubmissionStatus::Idle,
            close_requested: false,
        }
    }
}

// The description is free text from the reporter.
impl fmt::Debug for ReportForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportForm")
            .field("selected_type", &self.selected_type)
            .field("description_len", &self.description.chars().count())
            .field("photos", &self.photos.len())
            .field("status", &self.status)
            .field("close_requested", &self.close_requested)
            .finish_non_exhaustive()
    }
}

impl ReportForm {
    #[must_use]
    pub fn can_add_photo(&self) -> bool {
        self.photos.len() < MAX_REPORT_PHOTOS
    }

    /// Returns false when the photo limit is reached or the URI is already attached.
    pub fn attach_photo(&mut self, uri: String) -> bool {
        if !self.can_add_photo() || uri.trim().is_empty() || self.photos.contains(&uri) {
            return false;
        }
        self.photos.push(uri);
        true
    }

    pub fn remove_photo(&mut self, index: usize) -> Option<String> {
        (index < self.photos.len()).then(|| self.photos.remove(index))
    }

    /// Drops the draft. The address tracker keeps its generation so late results stay stale.
    pub fn discard(&mut self) {
        let address = std::mem::take(&mut self.address);
        *self = Self {
            address,
            ..Self::default()
        };
    }

    /// Back to defaults after a successful send; the resolved address survives.
    pub fn reset_after_success(&mut self) {
        self.selected_type = Some(EmergencyType::default());
        self.description.clear();
        self.photos.clear();
        self.status = SubmissionStatus::Idle;
        self.close_requested = true;
    }
}

/// Where the report goes. With an admin address configured it targets that admin only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub url: ValidatedUrl,
    pub email: Option<String>,
}

impl Recipient {
    pub fn resolve(config: &AppConfig) -> Result<Self, AppError> {
        let path = if config.admin_email.is_some() {
            SEND_TO_USER_PATH
        } else {
            SEND_TO_ADMINS_PATH
        };
        let url = config.endpoint(path).map_err(|e| {
            AppError::new(
                ErrorKind::Configuration,
                "Configuration Error",
                "The base URL is not configured. Cannot submit report.",
            )
            .with_internal(e.to_string())
        })?;
        Ok(Self {
            url,
            email: config.admin_email.clone(),
        })
    }
}

/// Everything fixed at the moment the reporter pressed submit.
#[derive(Clone)]
pub struct Submission {
    pub reporter: UserProfile,
    pub recipient: Recipient,
    pub kind: EmergencyType,
    pub description: String,
    pub location: String,
    pub client_date_time: DateTime<Utc>,
    pub pending_photos: VecDeque<String>,
    pub uploaded: Vec<String>,
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submission")
            .field("reporter", &self.reporter.uid)
            .field("kind", &self.kind)
            .field("pending_photos", &self.pending_photos.len())
            .field("uploaded", &self.uploaded.len())
            .finish_non_exhaustive()
    }
}

/// Checks run before any collaborator is called, in this order:
/// session, base URL, type, description.
pub fn prepare(
    user: Option<&UserProfile>,
    config: &AppConfig,
    form: &ReportForm,
    now: DateTime<Utc>,
) -> Result<Submission, AppError> {
    let Some(reporter) = user else {
        return Err(AppError::new(
            ErrorKind::MissingSession,
            "Authentication Error",
            "You must be logged in to submit a report.",
        ));
    };

    let recipient = Recipient::resolve(config)?;

    let description = form.description.trim();
    let (Some(kind), false) = (form.selected_type, description.is_empty()) else {
        return Err(AppError::new(
            ErrorKind::Validation,
            "Missing Information",
            "Please select an emergency type and provide a description.",
        ));
    };

    Ok(Submission {
        reporter: reporter.clone(),
        recipient,
        kind,
        description: description.to_string(),
        location: form.address.for_payload(),
        client_date_time: now,
        pending_photos: form.photos.iter().cloned().collect(),
        uploaded: Vec::new(),
    })
}

impl Submission {
    #[must_use]
    pub fn total_photos(&self) -> usize {
        self.pending_photos.len() + self.uploaded.len()
    }

    /// Storage path for the next upload.
    #[must_use]
    pub fn photo_path(&self) -> String {
        format!(
            "{PHOTO_FOLDER}/{}/{}.jpg",
            self.reporter.uid,
            uuid::Uuid::new_v4()
        )
    }

    #[must_use]
    pub fn payload(&self) -> ReportPayload {
        let upper = self.kind.upper();
        let barangay = self.reporter.barangay.trim();
        let contact = self.reporter.contact_number.trim();
        ReportPayload {
            email: self.recipient.email.clone(),
            title: format!("Alert! {upper} reported"),
            body: format!("Emergency at {}", self.location),
            sound: REPORT_SOUND.to_string(),
            data: ReportData {
                kind: upper,
                description: self.description.clone(),
                location: self.location.clone(),
                barangay: if barangay.is_empty() {
                    "Not set".to_string()
                } else {
                    barangay.to_string()
                },
                reported_by: self.reporter.reporter_name(),
                reporter_contact_number: if contact.is_empty() {
                    "N/A".to_string()
                } else {
                    contact.to_string()
                },
                priority: self.kind.priority(),
                client_date_time: timestamp::to_rfc3339(&self.client_date_time),
                images: self.uploaded.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub title: String,
    pub body: String,
    pub sound: String,
    pub data: ReportData,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub location: String,
    pub barangay: String,
    pub reported_by: String,
    pub reporter_contact_number: String,
    pub priority: AlarmLevel,
    pub client_date_time: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

#[must_use]
pub fn success_alert() -> (&'static str, &'static str) {
    ("Report Submitted", "Your emergency report has been successfully sent.")
}

/// The alert for a send that did not come back 2xx.
#[must_use]
pub fn failure(outcome: &HttpOutcome) -> AppError {
    match outcome {
        HttpOutcome::Transport { message } => AppError::new(
            ErrorKind::Network,
            "Submit Failed",
            format!("An error occurred: {message}"),
        ),
        HttpOutcome::Response { status, .. } => {
            let message = match outcome.error_detail() {
                ErrorDetail::Json(detail) | ErrorDetail::Text(detail) => detail,
                ErrorDetail::JsonWithoutDetail => {
                    "Could not retrieve specific error details from server.".to_string()
                }
                ErrorDetail::Empty => format!("Server returned status {status} with no details."),
            };
            AppError::new(
                ErrorKind::Server,
                format!("Submit Failed (Status: {status})"),
                message,
            )
            .with_internal(format!("status {status}"))
        }
    }
}

#[must_use]
pub fn upload_failure(reason: &str) -> AppError {
    AppError::new(
        ErrorKind::Upload,
        "Upload Failed",
        "A photo could not be uploaded. Your report was not sent.",
    )
    .with_internal(reason.to_string())
}
