use crux_core::capability::{CapabilityContext, Operation};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::subscriptions::SubscriptionId;

/// The identity-provider account, before the profile document is fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum AuthOperation {
    SignIn { email: String, password: String },
    SignOut,
    UpdateProfile { photo_url: String },
    WatchState { subscription: SubscriptionId },
    StopWatching { subscription: SubscriptionId },
}

impl std::fmt::Debug for AuthOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignIn { email, .. } => f
                .debug_struct("SignIn")
                .field("email", email)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::SignOut => f.write_str("SignOut"),
            Self::UpdateProfile { photo_url } => f
                .debug_struct("UpdateProfile")
                .field("photo_url", photo_url)
                .finish(),
            Self::WatchState { subscription } => f
                .debug_struct("WatchState")
                .field("subscription", subscription)
                .finish(),
            Self::StopWatching { subscription } => f
                .debug_struct("StopWatching")
                .field("subscription", subscription)
                .finish(),
        }
    }
}

/// Provider failure, carrying the provider's error code verbatim (e.g. `auth/wrong-password`).
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct AuthError {
    pub code: String,
    pub message: String,
}

impl AuthError {
    #[must_use]
    pub fn unexpected() -> Self {
        Self {
            code: "internal/unexpected-output".to_string(),
            message: "unexpected auth response".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum AuthOutput {
    SignedIn(AuthUser),
    SignedOut,
    ProfileUpdated,
    State(Option<AuthUser>),
    Stopped,
}

pub type AuthResult = Result<AuthOutput, AuthError>;

impl Operation for AuthOperation {
    type Output = AuthResult;
}

#[derive(crux_core::macros::Capability)]
pub struct Auth<Ev> {
    context: CapabilityContext<AuthOperation, Ev>,
}

impl<Ev> Auth<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<AuthOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn sign_in<F>(&self, email: &str, password: &SecretString, make_event: F)
    where
        F: FnOnce(Result<AuthUser, AuthError>) -> Ev + Send + 'static,
    {
        let operation = AuthOperation::SignIn {
            email: email.to_string(),
            password: password.expose_secret().clone(),
        };
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = match ctx.request_from_shell(operation).await {
                Ok(AuthOutput::SignedIn(user)) => Ok(user),
                Ok(_) => Err(AuthError::unexpected()),
                Err(e) => Err(e),
            };
            ctx.update_app(make_event(result));
        });
    }

    pub fn sign_out<F>(&self, make_event: F)
    where
        F: FnOnce(Result<(), AuthError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx
                .request_from_shell(AuthOperation::SignOut)
                .await
                .map(|_| ());
            ctx.update_app(make_event(result));
        });
    }

    pub fn update_profile<F>(&self, photo_url: String, make_event: F)
    where
        F: FnOnce(Result<(), AuthError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx
                .request_from_shell(AuthOperation::UpdateProfile { photo_url })
                .await
                .map(|_| ());
            ctx.update_app(make_event(result));
        });
    }

    /// Streams sign-in state changes until the watch is stopped.
    pub fn watch<F>(&self, subscription: SubscriptionId, make_event: F)
    where
        F: Fn(SubscriptionId, Option<AuthUser>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let mut stream = ctx.stream_from_shell(AuthOperation::WatchState {
                subscription: subscription.clone(),
            });
            while let Some(output) = stream.next().await {
                match output {
                    Ok(AuthOutput::State(user)) => {
                        ctx.update_app(make_event(subscription.clone(), user));
                    }
                    Ok(AuthOutput::Stopped) => break,
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "auth state stream error"),
                }
            }
        });
    }

    pub fn stop_watching(&self, subscription: SubscriptionId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(AuthOperation::StopWatching { subscription })
                .await;
        });
    }
}
