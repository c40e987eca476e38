use serde::Serialize;

use crate::capabilities::auth::AuthError;
use crate::capabilities::push::PushPlatform;
use crate::capabilities::store::Document;
use crate::session::UserProfile;
use crate::{AppError, ErrorKind};

pub const LOGIN_FAILED_TITLE: &str = "Login Failed";

/// Provider error codes the login screen explains in plain words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    UserNotFound,
    WrongPassword,
    InvalidCredential,
    InvalidEmail,
    TooManyRequests,
    NetworkRequestFailed,
    Other,
}

impl AuthErrorCode {
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code.trim().trim_start_matches("auth/") {
            "user-not-found" => Self::UserNotFound,
            "wrong-password" => Self::WrongPassword,
            "invalid-credential" => Self::InvalidCredential,
            "invalid-email" => Self::InvalidEmail,
            "too-many-requests" => Self::TooManyRequests,
            "network-request-failed" => Self::NetworkRequestFailed,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn kind(self) -> ErrorKind {
        match self {
            Self::NetworkRequestFailed => ErrorKind::Network,
            _ => ErrorKind::Authentication,
        }
    }
}

#[must_use]
pub fn auth_failure(error: &AuthError) -> AppError {
    let code = AuthErrorCode::parse(&error.code);
    let message = match code {
        AuthErrorCode::UserNotFound => {
            "Account not found. Please check your email or register first.".to_string()
        }
        AuthErrorCode::WrongPassword | AuthErrorCode::InvalidCredential => {
            "Incorrect email or password. Please try again.".to_string()
        }
        AuthErrorCode::InvalidEmail => {
            "Invalid email format. Please enter a valid email.".to_string()
        }
        AuthErrorCode::TooManyRequests => {
            "Too many failed attempts. Please try again later.".to_string()
        }
        AuthErrorCode::NetworkRequestFailed => {
            "Network error. Please check your internet connection.".to_string()
        }
        AuthErrorCode::Other => format!("Login failed: {}", error.message),
    };
    AppError::new(code.kind(), LOGIN_FAILED_TITLE, message).with_internal(error.code.clone())
}

pub fn validate_credentials(email: &str, password_present: bool) -> Result<String, AppError> {
    let email = email.trim();
    if email.is_empty() || !password_present {
        return Err(AppError::new(
            ErrorKind::Validation,
            "Error",
            "Please enter both email and password",
        ));
    }
    Ok(email.to_string())
}

/// Turns the fetched `users/{uid}` document into a session profile, or refuses entry.
pub fn admit(uid: &str, document: Option<&Document>) -> Result<UserProfile, AppError> {
    let Some(document) = document else {
        return Err(AppError::new(
            ErrorKind::ProfileNotFound,
            "Error",
            "User profile not found",
        ));
    };

    let mut profile: UserProfile = document.decode().map_err(|e| {
        AppError::new(ErrorKind::ProfileNotFound, "Error", "User profile not found")
            .with_internal(e.to_string())
    })?;
    profile.uid = uid.to_string();

    if !profile.is_resident() {
        return Err(AppError::new(
            ErrorKind::AccessDenied,
            "Access Denied",
            "You must be user to log in.",
        ));
    }
    Ok(profile)
}

/// Profile field the device token is merged into.
#[must_use]
pub const fn token_field(platform: PushPlatform) -> &'static str {
    match platform {
        PushPlatform::Native => "expoPushToken",
        PushPlatform::Web => "fcmToken",
    }
}

#[must_use]
pub fn token_fields(platform: PushPlatform, token: &str) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    fields.insert(
        token_field(platform).to_string(),
        serde_json::Value::String(token.to_string()),
    );
    serde_json::Value::Object(fields)
}

/// Body of `POST {base}/save-token`.
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct SaveTokenRequest {
    pub email: String,
    pub token: String,
    pub role: String,
}

impl std::fmt::Debug for SaveTokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveTokenRequest")
            .field("token", &"[REDACTED]")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
