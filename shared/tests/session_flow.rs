mod common;

use assert_matches::assert_matches;
use secrecy::SecretString;
use shared::capabilities::auth::{AuthError, AuthOperation, AuthUser};
use shared::capabilities::push::{
    DeviceToken, PermissionState, PushOperation, PushPlatform,
};
use shared::capabilities::store::StoreOperation;
use shared::model::AlertKind;
use shared::session::Route;
use shared::subscriptions::SubscriptionId;
use shared::{Effect, Event, Model};

use common::{configured, count, profile_document, resident, signed_in_model, tester};

fn login(email: &str, password: &str) -> Event {
    Event::LoginRequested {
        email: email.to_string(),
        password: SecretString::new(password.to_string()),
    }
}

fn auth_subscription(effects: &[Effect]) -> SubscriptionId {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::Auth(req) => match &req.operation {
                AuthOperation::WatchState { subscription } => Some(subscription.clone()),
                _ => None,
            },
            _ => None,
        })
        .expect("auth watch started")
}

#[test]
fn test_startup_reads_session_and_opens_listeners() {
    let app = tester();
    let mut model = Model::default();

    let update = app.update(Event::AppStarted, &mut model);
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 1);
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Push(req) if matches!(req.operation, PushOperation::Listen { .. })
    )));
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Push(req) if matches!(req.operation, PushOperation::RegisterChannel(_))
    )));
    auth_subscription(&update.effects);
    assert_eq!(model.subscriptions.len(), 2);
    assert_eq!(app.view(&model).route, Route::Loading);

    // A second start is a no-op.
    let update = app.update(Event::AppStarted, &mut model);
    assert_eq!(count(&update.effects, |e| !matches!(e, Effect::Render(_))), 0);

    app.update(Event::SessionRestored(Ok(None)), &mut model);
    assert_eq!(app.view(&model).route, Route::Login);
}

#[test]
fn test_corrupt_session_is_removed_and_routes_to_login() {
    let app = tester();
    let mut model = Model::default();

    let update = app.update(
        Event::SessionRestored(Ok(Some(b"{not json".to_vec()))),
        &mut model,
    );
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 1);
    assert!(model.session.user().is_none());
    assert!(model.alerts.is_empty());
    assert_eq!(app.view(&model).route, Route::Login);
}

#[test]
fn test_storage_failure_still_finishes_hydration() {
    let app = tester();
    let mut model = Model::default();

    app.update(Event::SessionRestored(Err("disk unavailable".into())), &mut model);
    assert!(model.session.is_hydrated());
    assert_eq!(app.view(&model).route, Route::Login);
}

#[test]
fn test_login_requires_both_fields() {
    let app = tester();
    let mut model = Model::default();

    let update = app.update(login("  ", "secret"), &mut model);
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Auth(_))));
    assert_eq!(
        model.alerts.front().map(|a| a.message.as_str()),
        Some("Please enter both email and password")
    );

    let update = app.update(login("ana@example.com", ""), &mut model);
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Auth(_))));
    assert!(!model.login.in_flight);
}

#[test]
fn test_resident_login_persists_session_and_requests_push() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::SessionRestored(Ok(None)), &mut model);

    let update = app.update(login(" ana@example.com ", "secret"), &mut model);
    let sign_in = update
        .effects
        .iter()
        .find_map(|e| match e {
            Effect::Auth(req) => Some(req.operation.clone()),
            _ => None,
        })
        .expect("sign in requested");
    assert_matches!(sign_in, AuthOperation::SignIn { ref email, .. } if email == "ana@example.com");
    assert!(model.login.in_flight);
    assert!(app.view(&model).login_in_progress);

    // Repeated taps while in flight are ignored.
    let update = app.update(login("ana@example.com", "secret"), &mut model);
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Auth(_))));

    let update = app.update(
        Event::SignedIn(Ok(AuthUser {
            uid: "uid-1".into(),
            email: Some("ana@example.com".into()),
        })),
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::DocumentStore(req) if matches!(
            &req.operation,
            StoreOperation::Get { collection, id } if collection == "users" && id == "uid-1"
        )
    )));

    let update = app.update(
        Event::ProfileFetched {
            uid: "uid-1".into(),
            result: Ok(Some(profile_document("user"))),
        },
        &mut model,
    );
    assert!(!model.login.in_flight);
    assert_eq!(model.session.user().map(|u| u.uid.as_str()), Some("uid-1"));
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 1);
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Push(req) if matches!(req.operation, PushOperation::GetPermissionStatus)
    )));

    let view = app.view(&model);
    assert_eq!(view.route, Route::Home);
    assert_eq!(view.user.display_name, "Ana Reyes");
    assert_eq!(view.user.initials, "AR");
}

#[test]
fn test_non_resident_is_refused() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::SessionRestored(Ok(None)), &mut model);
    app.update(login("admin@example.com", "secret"), &mut model);

    let update = app.update(
        Event::ProfileFetched {
            uid: "uid-1".into(),
            result: Ok(Some(profile_document("admin"))),
        },
        &mut model,
    );
    assert!(model.session.user().is_none());
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 0);
    let alert = model.alerts.front().expect("alert shown");
    assert_eq!(alert.title, "Access Denied");
    assert_eq!(alert.message, "You must be user to log in.");
    assert_eq!(app.view(&model).route, Route::Login);
}

#[test]
fn test_missing_profile_is_refused() {
    let app = tester();
    let mut model = Model::default();
    app.update(login("ana@example.com", "secret"), &mut model);

    app.update(
        Event::ProfileFetched {
            uid: "uid-1".into(),
            result: Ok(None),
        },
        &mut model,
    );
    assert_eq!(
        model.alerts.front().map(|a| a.message.as_str()),
        Some("User profile not found")
    );
    assert!(!model.login.in_flight);
}

#[test]
fn test_provider_errors_map_to_friendly_messages() {
    let app = tester();
    let mut model = Model::default();
    app.update(login("ana@example.com", "wrong"), &mut model);

    app.update(
        Event::SignedIn(Err(AuthError {
            code: "auth/wrong-password".into(),
            message: "The password is invalid.".into(),
        })),
        &mut model,
    );
    let alert = model.alerts.pop_front().expect("alert shown");
    assert_eq!(alert.title, "Login Failed");
    assert_eq!(alert.message, "Incorrect email or password. Please try again.");
    assert_eq!(alert.kind, AlertKind::Error);
    assert!(!model.login.in_flight);

    app.update(login("ana@example.com", "x"), &mut model);
    app.update(
        Event::SignedIn(Err(AuthError {
            code: "auth/quota-exceeded".into(),
            message: "quota".into(),
        })),
        &mut model,
    );
    assert_eq!(
        model.alerts.pop_front().map(|a| a.message),
        Some("Login failed: quota".to_string())
    );
}

#[test]
fn test_push_token_is_merged_and_registered() {
    let app = tester();
    let mut model = signed_in_model();

    let update = app.update(
        Event::PushPermissionChecked(PermissionState::NotDetermined),
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Push(req) if matches!(req.operation, PushOperation::RequestPermission)
    )));

    let update = app.update(
        Event::PushPermissionRequested(PermissionState::Authorized),
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Push(req) if matches!(req.operation, PushOperation::GetToken)
    )));

    let update = app.update(
        Event::PushTokenReceived(Ok(Some(DeviceToken {
            token: "ExponentPushToken[abc]".into(),
            platform: PushPlatform::Native,
        }))),
        &mut model,
    );
    let merge = update
        .effects
        .iter()
        .find_map(|e| match e {
            Effect::DocumentStore(req) => Some(req.operation.clone()),
            _ => None,
        })
        .expect("token merged into profile");
    assert_matches!(merge, StoreOperation::SetMerge { ref collection, ref id, ref fields }
        if collection == "users"
            && id == "uid-1"
            && fields["expoPushToken"] == "ExponentPushToken[abc]");

    let request = update
        .effects
        .iter()
        .find_map(|e| match e {
            Effect::Http(req) => Some(req.operation.clone()),
            _ => None,
        })
        .expect("token sent to backend");
    assert_eq!(request.url, "https://api.example.com/save-token");
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(body["role"], "user");
    assert_eq!(body["token"], "ExponentPushToken[abc]");
    assert!(model.push.token.is_some());
}

#[test]
fn test_denied_push_permission_stops_quietly() {
    let app = tester();
    let mut model = signed_in_model();

    let update = app.update(
        Event::PushPermissionRequested(PermissionState::Denied),
        &mut model,
    );
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::Push(_))), 0);
    assert!(model.alerts.is_empty());
}

#[test]
fn test_logout_clears_session_after_storage_removal() {
    let app = tester();
    let mut model = signed_in_model();

    let update = app.update(Event::LogoutRequested, &mut model);
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Auth(req) if matches!(req.operation, AuthOperation::SignOut)
    )));
    assert!(app.view(&model).logging_out);

    let update = app.update(Event::SignedOut(Ok(())), &mut model);
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 1);
    assert!(model.session.is_signed_in());

    let update = app.update(Event::SessionCleared(Ok(())), &mut model);
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 0);
    assert!(!model.session.is_signed_in());
    assert!(!model.profile.logging_out);
    assert_eq!(app.view(&model).route, Route::Login);
    assert_eq!(app.view(&model).user.display_name, "Guest");
}

#[test]
fn test_failed_logout_keeps_the_session() {
    let app = tester();
    let mut model = signed_in_model();

    app.update(Event::LogoutRequested, &mut model);
    app.update(
        Event::SignedOut(Err(AuthError {
            code: "auth/network-request-failed".into(),
            message: "offline".into(),
        })),
        &mut model,
    );
    assert!(model.session.is_signed_in());
    assert!(!model.profile.logging_out);
    let alert = model.alerts.front().expect("alert shown");
    assert_eq!(alert.title, "Logout Error");
    assert_eq!(alert.message, "offline");
}

fn provider_user() -> Option<AuthUser> {
    Some(AuthUser {
        uid: "uid-1".into(),
        email: Some("ana@example.com".into()),
    })
}

#[test]
fn test_provider_sign_out_clears_local_session() {
    let app = tester();
    let mut model = signed_in_model();

    let update = app.update(Event::AppStarted, &mut model);
    let subscription = auth_subscription(&update.effects);

    app.update(
        Event::AuthStateChanged {
            subscription: subscription.clone(),
            user: provider_user(),
        },
        &mut model,
    );
    assert!(model.session.is_signed_in());

    // Stale listeners are ignored.
    app.update(
        Event::AuthStateChanged {
            subscription: SubscriptionId::from("someone-else"),
            user: None,
        },
        &mut model,
    );
    assert!(model.session.is_signed_in());

    let update = app.update(
        Event::AuthStateChanged {
            subscription,
            user: None,
        },
        &mut model,
    );
    assert!(!model.session.is_signed_in());
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 1);
}

#[test]
fn test_initial_null_auth_state_keeps_restored_session() {
    let app = tester();
    let mut model = Model {
        config: configured(),
        ..Model::default()
    };

    let update = app.update(Event::AppStarted, &mut model);
    let subscription = auth_subscription(&update.effects);

    let stored = serde_json::to_vec(&resident()).unwrap();
    app.update(Event::SessionRestored(Ok(Some(stored))), &mut model);
    assert!(model.session.is_signed_in());

    let update = app.update(
        Event::AuthStateChanged {
            subscription: subscription.clone(),
            user: None,
        },
        &mut model,
    );
    assert!(model.session.is_signed_in());
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 0);
    assert_eq!(app.view(&model).route, Route::Home);

    // A later sign-out edge still clears it.
    app.update(
        Event::AuthStateChanged {
            subscription: subscription.clone(),
            user: provider_user(),
        },
        &mut model,
    );
    app.update(
        Event::AuthStateChanged {
            subscription,
            user: None,
        },
        &mut model,
    );
    assert!(!model.session.is_signed_in());
}

#[test]
fn test_profile_photo_upload_updates_profile() {
    let app = tester();
    let mut model = signed_in_model();

    let update = app.update(
        Event::ProfilePhotoPicked {
            local_uri: "file:///photo.jpg".into(),
        },
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(e, Effect::FileStore(_))));
    assert!(app.view(&model).uploading_photo);

    let update = app.update(
        Event::ProfilePhotoUploaded(Ok("https://cdn.example.com/uid-1.jpg".into())),
        &mut model,
    );
    assert_matches!(
        update.effects.iter().find_map(|e| match e {
            Effect::Auth(req) => Some(req.operation.clone()),
            _ => None,
        }),
        Some(AuthOperation::UpdateProfile { .. })
    );

    let update = app.update(
        Event::ProfilePhotoLinked {
            photo_url: "https://cdn.example.com/uid-1.jpg".into(),
            result: Ok(()),
        },
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::DocumentStore(req) if matches!(
            &req.operation,
            StoreOperation::SetMerge { fields, .. }
                if fields["photoURL"] == "https://cdn.example.com/uid-1.jpg"
        )
    )));
    assert_eq!(count(&update.effects, |e| matches!(e, Effect::KeyValue(_))), 1);
    assert_eq!(
        app.view(&model).user.photo_url.as_deref(),
        Some("https://cdn.example.com/uid-1.jpg")
    );
    assert_eq!(model.alerts.front().map(|a| a.title.as_str()), Some("Success"));
    assert!(!model.profile.uploading_photo);
}

#[test]
fn test_profile_photo_needs_a_session() {
    let app = tester();
    let mut model = Model::default();

    let update = app.update(
        Event::ProfilePhotoPicked {
            local_uri: "file:///photo.jpg".into(),
        },
        &mut model,
    );
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::FileStore(_))));
    assert_eq!(
        model.alerts.front().map(|a| a.title.as_str()),
        Some("Authentication Error")
    );
}
