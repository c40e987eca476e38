mod common;

use assert_matches::assert_matches;
use serde_json::json;
use shared::capabilities::auth::AuthOperation;
use shared::capabilities::push::{IncomingNotification, PushOperation};
use shared::capabilities::sound::SoundOperation;
use shared::capabilities::store::{Document, StoreError, StoreOperation};
use shared::feeds::FeedKind;
use shared::model::AlertKind;
use shared::subscriptions::SubscriptionId;
use shared::{Effect, Event, Model};

use common::{signed_in_model, tester};

fn listen_subscription(effects: &[Effect]) -> SubscriptionId {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::Push(req) => match &req.operation {
                PushOperation::Listen { subscription } => Some(subscription.clone()),
                _ => None,
            },
            _ => None,
        })
        .expect("notification listener started")
}

fn feed_subscription(effects: &[Effect]) -> SubscriptionId {
    effects
        .iter()
        .find_map(|e| match e {
            Effect::DocumentStore(req) => match &req.operation {
                StoreOperation::Subscribe { subscription, .. } => Some(subscription.clone()),
                _ => None,
            },
            _ => None,
        })
        .expect("live query started")
}

fn unsubscribed(effects: &[Effect]) -> Vec<SubscriptionId> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::DocumentStore(req) => match &req.operation {
                StoreOperation::Unsubscribe { subscription } => Some(subscription.clone()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn flood_warning() -> IncomingNotification {
    IncomingNotification {
        title: Some("Flood Warning".into()),
        body: Some("River level critical, move to higher ground".into()),
        data: json!({ "severity": "severe", "alarmType": "FLOOD" }),
    }
}

fn emergency(id: &str, seconds: i64, description: &str) -> Document {
    Document {
        id: id.into(),
        data: json!({
            "type": "fire",
            "description": description,
            "priority": "Critical",
            "status": "pending",
            "email": "ana@example.com",
            "dateTime": { "seconds": seconds, "nanoseconds": 0 },
        }),
    }
}

#[test]
fn test_notification_alerts_plays_sound_and_records_the_alarm() {
    let app = tester();
    let mut model = Model::default();
    let update = app.update(Event::AppStarted, &mut model);
    let subscription = listen_subscription(&update.effects);

    let update = app.update(
        Event::NotificationReceived {
            subscription,
            notification: Box::new(flood_warning()),
        },
        &mut model,
    );

    let alert = model.alerts.front().expect("alert shown");
    assert_eq!(alert.kind, AlertKind::Info);
    assert_eq!(alert.title, "Flood Warning");
    assert_eq!(alert.message, "River level critical, move to higher ground");

    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Sound(req) if matches!(
            &req.operation,
            SoundOperation::Play { asset } if asset == "notification.mp3"
        )
    )));

    let added = update
        .effects
        .iter()
        .find_map(|e| match e {
            Effect::DocumentStore(req) => Some(req.operation.clone()),
            _ => None,
        })
        .expect("alarm recorded");
    assert_matches!(added, StoreOperation::Add { ref collection, ref data } => {
        assert_eq!(collection, "EmergencyCases");
        assert_eq!(data["title"], "Flood Warning");
        assert_eq!(data["alarmType"], "FLOOD");
        assert_eq!(data["alarmLevel"], "High");
        assert_eq!(data["isUrgent"], true);
        assert_eq!(data["sentBy"], "Admin");
        assert_eq!(data["status"], "Active");
        assert_eq!(data["targetAudience"], "All Residents");
    });
}

#[test]
fn test_notification_with_empty_content_uses_fallbacks() {
    let app = tester();
    let mut model = Model::default();
    let update = app.update(Event::AppStarted, &mut model);
    let subscription = listen_subscription(&update.effects);

    let update = app.update(
        Event::NotificationReceived {
            subscription,
            notification: Box::new(IncomingNotification {
                title: None,
                body: None,
                data: json!("not an object"),
            }),
        },
        &mut model,
    );
    assert_eq!(
        model.alerts.front().map(|a| a.title.as_str()),
        Some("Notification")
    );
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::DocumentStore(req) if matches!(
            &req.operation,
            StoreOperation::Add { data, .. }
                if data["alarmLevel"] == "Medium" && data["alarmType"] == "ALERT"
        )
    )));
}

#[test]
fn test_notification_for_a_stopped_listener_is_dropped() {
    let app = tester();
    let mut model = Model::default();

    let update = app.update(
        Event::NotificationReceived {
            subscription: SubscriptionId::from("gone"),
            notification: Box::new(flood_warning()),
        },
        &mut model,
    );
    assert!(model.alerts.is_empty());
    assert!(!update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Sound(_) | Effect::DocumentStore(_))));
}

#[test]
fn test_failed_alarm_write_is_not_shown() {
    let app = tester();
    let mut model = Model::default();
    app.update(
        Event::AlarmPersisted(Err(StoreError::PermissionDenied {
            message: "rules".into(),
        })),
        &mut model,
    );
    assert!(model.alerts.is_empty());
}

#[test]
fn test_my_emergencies_feed_lifecycle() {
    let app = tester();
    let mut model = signed_in_model();

    let update = app.update(Event::FeedOpened(FeedKind::MyEmergencies), &mut model);
    let first = feed_subscription(&update.effects);
    assert!(app.view(&model).my_emergencies.loading);

    let update = app.update(Event::FeedRefreshed(FeedKind::MyEmergencies), &mut model);
    let second = feed_subscription(&update.effects);
    assert_ne!(first, second);
    assert_eq!(unsubscribed(&update.effects), vec![first.clone()]);
    assert!(app.view(&model).my_emergencies.refreshing);

    // A late snapshot from the replaced query changes nothing.
    app.update(
        Event::FeedSnapshot {
            kind: FeedKind::MyEmergencies,
            subscription: first,
            result: Ok(vec![emergency("old", 1, "stale")]),
        },
        &mut model,
    );
    assert!(model.feeds.my_emergencies.items.is_empty());

    app.update(
        Event::FeedSnapshot {
            kind: FeedKind::MyEmergencies,
            subscription: second.clone(),
            result: Ok(vec![
                emergency("a", 1_700_000_000, "older"),
                emergency("b", 1_700_000_500, "newer"),
            ]),
        },
        &mut model,
    );
    let view = app.view(&model).my_emergencies;
    assert!(!view.loading && !view.refreshing && !view.empty);
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.items[0].id, "b");
    assert_eq!(view.items[0].title, "FIRE");
    assert_eq!(view.items[0].level, "Critical");

    let update = app.update(Event::FeedClosed(FeedKind::MyEmergencies), &mut model);
    assert_eq!(unsubscribed(&update.effects), vec![second]);
    assert!(model.feeds.my_emergencies.items.is_empty());
}

#[test]
fn test_my_emergencies_needs_a_session() {
    let app = tester();
    let mut model = Model::default();

    let update = app.update(Event::FeedOpened(FeedKind::MyEmergencies), &mut model);
    assert!(!update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::DocumentStore(_))));
    assert!(model.subscriptions.is_empty());
}

#[test]
fn test_feed_errors_are_kept_on_the_feed() {
    let app = tester();
    let mut model = Model::default();
    let update = app.update(Event::FeedOpened(FeedKind::News), &mut model);
    let subscription = feed_subscription(&update.effects);

    app.update(
        Event::FeedSnapshot {
            kind: FeedKind::News,
            subscription,
            result: Err(StoreError::Unavailable {
                message: "offline".into(),
            }),
        },
        &mut model,
    );
    let view = app.view(&model).news;
    assert!(view.error.is_some());
    assert!(!view.loading);
    assert!(model.alerts.is_empty());
}

#[test]
fn test_logout_closes_the_personal_feed() {
    let app = tester();
    let mut model = signed_in_model();
    let update = app.update(Event::FeedOpened(FeedKind::MyEmergencies), &mut model);
    let subscription = feed_subscription(&update.effects);

    app.update(Event::LogoutRequested, &mut model);
    app.update(Event::SignedOut(Ok(())), &mut model);
    let update = app.update(Event::SessionCleared(Ok(())), &mut model);
    assert_eq!(unsubscribed(&update.effects), vec![subscription]);
}

#[test]
fn test_stopping_disposes_every_listener() {
    let app = tester();
    let mut model = signed_in_model();
    app.update(Event::AppStarted, &mut model);
    app.update(Event::FeedOpened(FeedKind::EmergencyCases), &mut model);
    assert_eq!(model.subscriptions.len(), 3);

    let update = app.update(Event::AppStopping, &mut model);
    assert!(model.subscriptions.is_empty());
    assert!(!model.started);
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Auth(req) if matches!(req.operation, AuthOperation::StopWatching { .. })
    )));
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Push(req) if matches!(req.operation, PushOperation::StopListening { .. })
    )));
    assert_eq!(unsubscribed(&update.effects).len(), 1);

    // A second stop has nothing left to dispose.
    let update = app.update(Event::AppStopping, &mut model);
    assert!(update
        .effects
        .iter()
        .all(|e| matches!(e, Effect::Render(_))));

    // Starting again opens fresh listeners.
    app.update(Event::AppStarted, &mut model);
    assert_eq!(model.subscriptions.len(), 2);
}

#[test]
fn test_delivery_under_another_scope_is_ignored() {
    let app = tester();
    let mut model = signed_in_model();
    app.update(Event::AppStarted, &mut model);
    let update = app.update(Event::FeedOpened(FeedKind::EmergencyCases), &mut model);
    let feed = feed_subscription(&update.effects);

    let update = app.update(
        Event::NotificationReceived {
            subscription: feed,
            notification: Box::new(flood_warning()),
        },
        &mut model,
    );
    assert!(model.alerts.is_empty());
    assert!(!update
        .effects
        .iter()
        .any(|e| matches!(e, Effect::DocumentStore(_) | Effect::Sound(_))));
}

#[test]
fn test_alert_queue_is_shown_in_order() {
    let app = tester();
    let mut model = Model::default();
    let update = app.update(Event::AppStarted, &mut model);
    let subscription = listen_subscription(&update.effects);

    for title in ["First", "Second"] {
        app.update(
            Event::NotificationReceived {
                subscription: subscription.clone(),
                notification: Box::new(IncomingNotification {
                    title: Some(title.into()),
                    body: None,
                    data: serde_json::Value::Null,
                }),
            },
            &mut model,
        );
    }

    assert_eq!(app.view(&model).alert.map(|a| a.title), Some("First".into()));
    app.update(Event::AlertDismissed, &mut model);
    assert_eq!(app.view(&model).alert.map(|a| a.title), Some("Second".into()));
    app.update(Event::AlertDismissed, &mut model);
    assert!(app.view(&model).alert.is_none());
}
