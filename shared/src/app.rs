use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};

use crate::alarm::{self, AlarmRecord};
use crate::capabilities::files::JPEG_CONTENT_TYPE;
use crate::capabilities::http::{post_json, HttpOutcome};
use crate::capabilities::kv::{read_result, write_result};
use crate::capabilities::{
    AuthError, CapabilityError, Capabilities, DeviceToken, Document, FileError,
    IncomingNotification, PermissionState, StoreError,
};
use crate::event::Event;
use crate::feeds::FeedKind;
use crate::location::{self, ResolveStep};
use crate::login::{self, SaveTokenRequest};
use crate::model::{Alert, Model};
use crate::report::{self, EmergencyType, SubmissionStatus};
use crate::session::{HydrateOutcome, PersistCommand, Session, UserProfile, PROFILE_COLLECTION};
use crate::subscriptions::{SubscriptionId, SubscriptionScope};
use crate::view::ViewModel;
use crate::{AppError, ErrorKind, MAX_REPORT_PHOTOS};

pub const SAVE_TOKEN_PATH: &str = "save-token";
pub const PROFILE_PHOTO_FOLDER: &str = "profilePhotos";

#[derive(Default)]
pub struct App;

/// Wraps a collaborator failure from a best-effort step.
fn side_channel(kind: ErrorKind, what: &str, error: impl Into<CapabilityError>) -> AppError {
    AppError::new(kind, what, format!("{what} failed")).with_internal(error.into().to_string())
}

impl App {
    fn stop_listener(caps: &Capabilities, id: SubscriptionId, scope: SubscriptionScope) {
        tracing::debug!(subscription = %id, ?scope, "stopping listener");
        match scope {
            SubscriptionScope::AuthState => caps.auth.stop_watching(id),
            SubscriptionScope::Notifications => caps.push.stop_listening(id),
            SubscriptionScope::Feed(_) => caps.store.unsubscribe(id),
        }
    }

    fn register(model: &mut Model, caps: &Capabilities, scope: SubscriptionScope) -> SubscriptionId {
        let (id, replaced) = model.subscriptions.register(scope);
        for old in replaced {
            Self::stop_listener(caps, old, scope);
        }
        tracing::debug!(?scope, listeners = model.subscriptions.len(), "listener registered");
        id
    }

    fn dispose(model: &mut Model, caps: &Capabilities, scope: SubscriptionScope) {
        for id in model.subscriptions.dispose(scope) {
            Self::stop_listener(caps, id, scope);
        }
    }

    // --- Lifecycle ---

    fn app_started(model: &mut Model, caps: &Capabilities) {
        if model.started {
            tracing::debug!("app already started");
            return;
        }
        model.started = true;
        tracing::info!(
            base_url_configured = model.config.has_base_url(),
            alarm_collection = %model.config.alarm_collection,
            "starting"
        );

        caps.kv.get(Session::storage_key(), |result| {
            Event::SessionRestored(read_result(result))
        });

        let auth = Self::register(model, caps, SubscriptionScope::AuthState);
        model.login.provider_user_seen = false;
        caps.auth.watch(auth, |subscription, user| Event::AuthStateChanged {
            subscription,
            user,
        });

        caps.push.register_channels(alarm::all_channels());
        let notifications = Self::register(model, caps, SubscriptionScope::Notifications);
        caps.push.listen(notifications, |subscription, notification| {
            Event::NotificationReceived {
                subscription,
                notification: Box::new(notification),
            }
        });
    }

    fn app_stopping(model: &mut Model, caps: &Capabilities) {
        if !model.started && model.subscriptions.is_empty() {
            tracing::debug!("app already stopped");
            return;
        }
        let live = model.subscriptions.dispose_all();
        tracing::info!(listeners = live.len(), "stopping");
        for (id, scope) in live {
            Self::stop_listener(caps, id, scope);
        }
        model.report.address.cancel();
        model.started = false;
    }

    // --- Session ---

    fn persist(caps: &Capabilities, command: PersistCommand) {
        let key = Session::storage_key();
        match command {
            PersistCommand::Write(bytes) => caps.kv.set(key, bytes, |result| {
                Event::SessionPersisted(write_result(result))
            }),
            PersistCommand::Remove => caps.kv.delete(key, |result| {
                Event::SessionPersisted(write_result(result))
            }),
        }
    }

    fn set_user(model: &mut Model, caps: &Capabilities, user: Option<UserProfile>) {
        match model.session.set_user(user) {
            Ok(command) => Self::persist(caps, command),
            Err(e) => model.report_error(
                &AppError::new(ErrorKind::Storage, "Session", "session not saved")
                    .with_internal(e.to_string()),
            ),
        }
    }

    fn session_restored(model: &mut Model, caps: &Capabilities, result: Result<Option<Vec<u8>>, String>) {
        match result {
            Ok(stored) => match model.session.hydrate(stored.as_deref()) {
                HydrateOutcome::Restored => tracing::info!("session restored"),
                HydrateOutcome::Empty => tracing::debug!("no stored session"),
                HydrateOutcome::Skipped => tracing::debug!("stored session ignored, user already set"),
                HydrateOutcome::Corrupt(e) => {
                    tracing::warn!(error = %e, "discarding stored session");
                    Self::persist(caps, PersistCommand::Remove);
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "session read failed");
                model.session.mark_hydrated();
            }
        }
    }

    fn auth_state_changed(
        model: &mut Model,
        caps: &Capabilities,
        subscription: &SubscriptionId,
        signed_in: bool,
    ) {
        if !model.subscriptions.is_active(subscription, SubscriptionScope::AuthState) {
            tracing::debug!(%subscription, "auth state for disposed listener");
            return;
        }
        if signed_in {
            model.login.provider_user_seen = true;
            return;
        }
        // The first callback after a cold start is null until the provider
        // restores its own session; only a signed-in to signed-out edge counts.
        if !std::mem::take(&mut model.login.provider_user_seen) {
            tracing::debug!("auth listener reported no user before any sign-in");
            return;
        }
        if !model.session.is_hydrated() || model.login.in_flight {
            return;
        }
        if model.session.is_signed_in() {
            tracing::info!("auth session ended, clearing local session");
            Self::set_user(model, caps, None);
            Self::close_feed(model, caps, FeedKind::MyEmergencies);
        }
    }

    // --- Login ---

    fn login_requested(model: &mut Model, caps: &Capabilities, email: &str, password: &SecretString) {
        if model.login.in_flight {
            tracing::debug!("login already in flight");
            return;
        }
        let email = match login::validate_credentials(email, !password.expose_secret().is_empty()) {
            Ok(email) => email,
            Err(e) => return model.report_error(&e),
        };
        model.login.in_flight = true;
        caps.auth.sign_in(&email, password, Event::SignedIn);
    }

    fn profile_fetched(
        model: &mut Model,
        caps: &Capabilities,
        uid: &str,
        result: Result<Option<Document>, StoreError>,
    ) {
        model.login.in_flight = false;
        let document = match result {
            Ok(document) => document,
            Err(e) => {
                return model.report_error(
                    &AppError::new(
                        ErrorKind::Network,
                        login::LOGIN_FAILED_TITLE,
                        format!("Login failed: {e}"),
                    )
                    .with_internal(e.to_string()),
                );
            }
        };

        match login::admit(uid, document.as_ref()) {
            Ok(profile) => {
                tracing::info!(uid = %profile.uid, "signed in");
                Self::set_user(model, caps, Some(profile));
                caps.push.permission_status(Event::PushPermissionChecked);
            }
            Err(e) => model.report_error(&e),
        }
    }

    fn push_permission(model: &mut Model, caps: &Capabilities, state: PermissionState, asked: bool) {
        model.push.permission = state;
        if state.is_authorized() {
            caps.push.token(Event::PushTokenReceived);
        } else if !asked {
            caps.push.request_permission(Event::PushPermissionRequested);
        } else {
            tracing::info!(?state, "push permission not granted");
        }
    }

    fn push_token_received(model: &mut Model, caps: &Capabilities, token: DeviceToken) {
        model.push.token = Some(token.clone());
        let Some(user) = model.session.user() else {
            tracing::debug!("push token arrived without a session");
            return;
        };

        caps.store.set_merge(
            PROFILE_COLLECTION,
            &user.uid,
            login::token_fields(token.platform, &token.token),
            Event::PushTokenMerged,
        );

        let request = SaveTokenRequest {
            email: user.email.clone(),
            token: token.token,
            role: user.role.clone(),
        };
        let sent = model
            .config
            .endpoint(SAVE_TOKEN_PATH)
            .map_err(|e| e.to_string())
            .and_then(|url| {
                post_json(&caps.http, &url, &request, |outcome| {
                    Event::PushTokenSaved(Box::new(outcome))
                })
                .map_err(|e| e.to_string())
            });
        if let Err(e) = sent {
            model.report_error(
                &AppError::new(ErrorKind::Push, "Push token", "token not sent").with_internal(e),
            );
        }
    }

    // --- Logout ---

    fn logout_requested(model: &mut Model, caps: &Capabilities) {
        if model.profile.logging_out {
            return;
        }
        model.profile.logging_out = true;
        caps.auth.sign_out(Event::SignedOut);
    }

    fn signed_out(model: &mut Model, caps: &Capabilities, result: Result<(), AuthError>) {
        match result {
            Ok(()) => caps.kv.delete(Session::storage_key(), |result| {
                Event::SessionCleared(write_result(result))
            }),
            Err(e) => {
                model.profile.logging_out = false;
                model.report_error(
                    &AppError::new(ErrorKind::Authentication, "Logout Error", e.message.clone())
                        .with_internal(e.code.clone()),
                );
            }
        }
    }

    fn session_cleared(model: &mut Model, caps: &Capabilities, result: Result<(), String>) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "stored session not removed");
        }
        model.session.clear();
        model.profile.logging_out = false;
        model.push.token = None;
        model.report.address.cancel();
        model.report.discard();
        model.submission = None;
        Self::close_feed(model, caps, FeedKind::MyEmergencies);
        tracing::info!("signed out");
    }

    // --- Profile ---

    fn profile_photo_picked(model: &mut Model, caps: &Capabilities, local_uri: String) {
        let Some(user) = model.session.user() else {
            return model.report_error(&AppError::new(
                ErrorKind::MissingSession,
                "Authentication Error",
                "You must be logged in to change your photo.",
            ));
        };
        if model.profile.uploading_photo {
            return;
        }
        let path = format!("{PROFILE_PHOTO_FOLDER}/{}.jpg", user.uid);
        model.profile.uploading_photo = true;
        caps.files
            .upload(path, local_uri, JPEG_CONTENT_TYPE, Event::ProfilePhotoUploaded);
    }

    fn profile_photo_linked(model: &mut Model, caps: &Capabilities, photo_url: String) {
        model.profile.uploading_photo = false;
        let Some(user) = model.session.user() else {
            tracing::debug!("photo linked after logout");
            return;
        };

        let mut updated = user.clone();
        caps.store.set_merge(
            PROFILE_COLLECTION,
            &updated.uid,
            serde_json::json!({ "photoURL": photo_url }),
            Event::ProfileDocumentUpdated,
        );
        updated.photo_url = Some(photo_url);
        Self::set_user(model, caps, Some(updated));
        model.push_alert(Alert::success("Success", "Profile photo updated."));
    }

    // --- Report ---

    fn report_screen_opened(model: &mut Model, caps: &Capabilities) {
        model.report.close_requested = false;
        let generation = model.report.address.begin();
        caps.location
            .request_permission(move |result| Event::LocationPermission { generation, result });
    }

    fn report_screen_closed(model: &mut Model) {
        model.report.address.cancel();
        if model.report.status.is_in_flight() {
            model.report.close_requested = false;
        } else {
            model.report.discard();
        }
    }

    fn continue_resolution(model: &mut Model, caps: &Capabilities, generation: u64, step: ResolveStep) {
        match step {
            ResolveStep::RequestPosition => caps
                .location
                .current_position(move |result| Event::LocationPosition { generation, result }),
            ResolveStep::ReverseGeocode(coordinates) => caps.location.reverse_geocode(
                coordinates,
                model.config.maps_api_key.clone(),
                move |result| Event::LocationGeocoded { generation, result },
            ),
            ResolveStep::Done(address) => {
                if model.report.address.finish(generation, address) {
                    tracing::debug!(generation, "address resolved");
                }
            }
        }
    }

    fn photo_attached(model: &mut Model, uri: String) {
        if !model.report.can_add_photo() {
            return model.report_error(&AppError::new(
                ErrorKind::Validation,
                "Photo Limit",
                format!("You can attach up to {MAX_REPORT_PHOTOS} photos."),
            ));
        }
        if !model.report.attach_photo(uri) {
            tracing::debug!("photo ignored");
        }
    }

    fn report_submitted(model: &mut Model, caps: &Capabilities) {
        if model.report.status.is_in_flight() {
            tracing::debug!("submission already in flight");
            return;
        }
        match report::prepare(model.session.user(), &model.config, &model.report, Utc::now()) {
            Ok(submission) => {
                model.report.close_requested = false;
                Self::advance_submission(model, caps, submission);
            }
            Err(e) => model.report_error(&e),
        }
    }

    /// Uploads the next pending photo, or sends the report once none are left.
    fn advance_submission(model: &mut Model, caps: &Capabilities, submission: report::Submission) {
        if let Some(uri) = submission.pending_photos.front().cloned() {
            model.report.status = SubmissionStatus::UploadingPhotos {
                done: submission.uploaded.len(),
                total: submission.total_photos(),
            };
            caps.files.upload(
                submission.photo_path(),
                uri,
                JPEG_CONTENT_TYPE,
                Event::ReportPhotoUploaded,
            );
            model.submission = Some(submission);
            return;
        }

        let payload = submission.payload();
        let sent = post_json(&caps.http, &submission.recipient.url, &payload, |outcome| {
            Event::ReportResponse(Box::new(outcome))
        });
        match sent {
            Ok(()) => {
                tracing::info!(
                    kind = submission.kind.key(),
                    photos = submission.uploaded.len(),
                    host = submission.recipient.url.host(),
                    "report sent"
                );
                model.report.status = SubmissionStatus::Sending;
                model.submission = Some(submission);
            }
            Err(e) => {
                model.report.status = SubmissionStatus::Idle;
                model.submission = None;
                model.report_error(
                    &AppError::new(
                        ErrorKind::Internal,
                        "Submit Failed",
                        format!("An error occurred: {e}"),
                    )
                    .with_internal(e.to_string()),
                );
            }
        }
    }

    fn report_photo_uploaded(
        model: &mut Model,
        caps: &Capabilities,
        result: Result<String, FileError>,
    ) {
        let Some(mut submission) = model.submission.take() else {
            tracing::debug!("photo upload for a finished submission");
            return;
        };
        match result {
            Ok(url) => {
                submission.pending_photos.pop_front();
                submission.uploaded.push(url);
                Self::advance_submission(model, caps, submission);
            }
            Err(e) => {
                model.report.status = SubmissionStatus::Idle;
                model.report_error(&report::upload_failure(&e.to_string()));
            }
        }
    }

    fn report_response(model: &mut Model, outcome: &HttpOutcome) {
        if model.submission.take().is_none() {
            tracing::debug!("response for a finished submission");
            return;
        }
        model.report.status = SubmissionStatus::Idle;
        if outcome.is_success() {
            tracing::info!(status = ?outcome.status(), "report accepted");
            let (title, message) = report::success_alert();
            model.push_alert(Alert::success(title, message));
            model.report.reset_after_success();
        } else {
            model.report_error(&report::failure(outcome));
        }
    }

    // --- Alarms ---

    fn notification_received(
        model: &mut Model,
        caps: &Capabilities,
        subscription: &SubscriptionId,
        notification: &IncomingNotification,
    ) {
        if !model
            .subscriptions
            .is_active(subscription, SubscriptionScope::Notifications)
        {
            tracing::debug!(%subscription, "notification for disposed listener");
            return;
        }

        let (title, body) = alarm::alert_text(notification);
        model.push_alert(Alert::info(title, body));
        caps.sound.play(&model.config.notification_sound);

        let record = AlarmRecord::from_notification(notification, Utc::now());
        tracing::info!(level = %record.alarm_level, alarm_type = %record.alarm_type, "alarm received");
        match record.to_document() {
            Ok(document) => {
                caps.store
                    .add(&model.config.alarm_collection, document, Event::AlarmPersisted);
            }
            Err(e) => model.report_error(
                &AppError::new(ErrorKind::Decode, "Alarm", "alarm not encoded")
                    .with_internal(e.to_string()),
            ),
        }
    }

    // --- Feeds ---

    fn open_feed(model: &mut Model, caps: &Capabilities, kind: FeedKind, refreshing: bool) {
        let scope = SubscriptionScope::Feed(kind);
        let Some(query) = kind.query(model.session.user()) else {
            tracing::debug!(feed = ?kind, "feed needs a session");
            Self::dispose(model, caps, scope);
            model.feeds.clear(kind);
            return;
        };

        let id = Self::register(model, caps, scope);
        model.feeds.begin(kind, refreshing);
        caps.store.subscribe(id, query, move |subscription, result| {
            Event::FeedSnapshot {
                kind,
                subscription,
                result,
            }
        });
    }

    fn close_feed(model: &mut Model, caps: &Capabilities, kind: FeedKind) {
        Self::dispose(model, caps, SubscriptionScope::Feed(kind));
        model.feeds.clear(kind);
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        if event.is_user_initiated() {
            tracing::info!(event = event_name, "user action");
        } else {
            tracing::debug!(event = event_name, "event");
        }

        match event {
            Event::AppStarted => Self::app_started(model, caps),
            Event::AppStopping => Self::app_stopping(model, caps),
            Event::Configure(config) => {
                model.config = *config;
                tracing::info!(base_url_configured = model.config.has_base_url(), "configured");
            }

            Event::SessionRestored(result) => Self::session_restored(model, caps, result),
            Event::SessionPersisted(result) => {
                if let Err(e) = result {
                    model.report_error(
                        &AppError::new(ErrorKind::Storage, "Session", "session not saved")
                            .with_internal(e),
                    );
                }
            }
            Event::AuthStateChanged { subscription, user } => {
                Self::auth_state_changed(model, caps, &subscription, user.is_some());
            }

            Event::LoginRequested { email, password } => {
                Self::login_requested(model, caps, &email, &password);
            }
            Event::SignedIn(Ok(user)) => {
                let uid = user.uid.clone();
                caps.store.get(PROFILE_COLLECTION, &user.uid, move |result| {
                    Event::ProfileFetched { uid, result }
                });
            }
            Event::SignedIn(Err(e)) => {
                model.login.in_flight = false;
                model.report_error(&login::auth_failure(&e));
            }
            Event::ProfileFetched { uid, result } => {
                Self::profile_fetched(model, caps, &uid, result);
            }
            Event::PushPermissionChecked(state) => Self::push_permission(model, caps, state, false),
            Event::PushPermissionRequested(state) => Self::push_permission(model, caps, state, true),
            Event::PushTokenReceived(Ok(Some(token))) => Self::push_token_received(model, caps, token),
            Event::PushTokenReceived(Ok(None)) => tracing::warn!("no push token issued"),
            Event::PushTokenReceived(Err(e)) => {
                model.report_error(&side_channel(ErrorKind::Push, "Push token", e));
            }
            Event::PushTokenMerged(result) => {
                if let Err(e) = result {
                    model.report_error(&side_channel(ErrorKind::Push, "Push token merge", e));
                }
            }
            Event::PushTokenSaved(outcome) => {
                if !outcome.is_success() {
                    tracing::warn!(status = ?outcome.status(), "push token registration rejected");
                }
            }

            Event::LogoutRequested => Self::logout_requested(model, caps),
            Event::SignedOut(result) => Self::signed_out(model, caps, result),
            Event::SessionCleared(result) => Self::session_cleared(model, caps, result),

            Event::ProfilePhotoPicked { local_uri } => {
                Self::profile_photo_picked(model, caps, local_uri);
            }
            Event::ProfilePhotoUploaded(Ok(url)) => {
                let photo_url = url.clone();
                caps.auth.update_profile(url, move |result| Event::ProfilePhotoLinked {
                    photo_url,
                    result,
                });
            }
            Event::ProfilePhotoUploaded(Err(e)) => {
                model.profile.uploading_photo = false;
                model.report_error(
                    &AppError::new(
                        ErrorKind::Upload,
                        "Upload Failed",
                        "Could not upload your photo. Please try again.",
                    )
                    .with_internal(CapabilityError::from(e).to_string()),
                );
            }
            Event::ProfilePhotoLinked {
                photo_url,
                result: Ok(()),
            } => Self::profile_photo_linked(model, caps, photo_url),
            Event::ProfilePhotoLinked {
                result: Err(e), ..
            } => {
                model.profile.uploading_photo = false;
                model.report_error(
                    &AppError::new(
                        ErrorKind::Authentication,
                        "Upload Failed",
                        "Could not update your profile photo.",
                    )
                    .with_internal(e.to_string()),
                );
            }
            Event::ProfileDocumentUpdated(result) => {
                if let Err(e) = result {
                    model.report_error(&side_channel(ErrorKind::Storage, "Profile photo merge", e));
                }
            }

            Event::ReportScreenOpened => Self::report_screen_opened(model, caps),
            Event::ReportScreenClosed => Self::report_screen_closed(model),
            Event::EmergencyTypeSelected(key) => {
                model.report.selected_type = EmergencyType::from_key(&key);
                if model.report.selected_type.is_none() {
                    tracing::warn!(key = %key, "unknown emergency type");
                }
            }
            Event::DescriptionChanged(text) => model.report.description = text,
            Event::PhotoAttached(uri) => Self::photo_attached(model, uri),
            Event::PhotoRemoved(index) => {
                if model.report.remove_photo(index).is_none() {
                    tracing::debug!(index, "no photo at index");
                }
            }
            Event::ReportSubmitted => Self::report_submitted(model, caps),
            Event::ReportPhotoUploaded(result) => Self::report_photo_uploaded(model, caps, result),
            Event::ReportResponse(outcome) => Self::report_response(model, &outcome),

            Event::LocationPermission { generation, result } => {
                if model.report.address.is_current(generation) {
                    let step = location::on_permission(result);
                    Self::continue_resolution(model, caps, generation, step);
                }
            }
            Event::LocationPosition { generation, result } => {
                if model.report.address.is_current(generation) {
                    let step = location::on_position(result);
                    Self::continue_resolution(model, caps, generation, step);
                }
            }
            Event::LocationGeocoded { generation, result } => {
                if model.report.address.is_current(generation) {
                    let step = location::on_places(result);
                    Self::continue_resolution(model, caps, generation, step);
                }
            }

            Event::NotificationReceived {
                subscription,
                notification,
            } => Self::notification_received(model, caps, &subscription, &notification),
            Event::AlarmPersisted(Ok(id)) => tracing::debug!(%id, "alarm record stored"),
            Event::AlarmPersisted(Err(e)) => {
                model.report_error(&side_channel(ErrorKind::Storage, "Alarm record", e));
            }

            Event::FeedOpened(kind) => Self::open_feed(model, caps, kind, false),
            Event::FeedRefreshed(kind) => Self::open_feed(model, caps, kind, true),
            Event::FeedClosed(kind) => Self::close_feed(model, caps, kind),
            Event::FeedSnapshot {
                kind,
                subscription,
                result,
            } => {
                if model
                    .subscriptions
                    .is_active(&subscription, SubscriptionScope::Feed(kind))
                {
                    model.feeds.apply(kind, result);
                } else {
                    tracing::debug!(feed = ?kind, %subscription, "snapshot for disposed query");
                }
            }

            Event::AlertDismissed => {
                model.alerts.pop_front();
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::build(model)
    }
}
