#![allow(dead_code)]

use crux_core::testing::AppTester;
use serde_json::json;
use shared::capabilities::store::Document;
use shared::session::{UserProfile, RESIDENT_ROLE};
use shared::{App, AppConfig, Effect, Model};

pub type Tester = AppTester<App, Effect>;

pub fn tester() -> Tester {
    AppTester::<App, Effect>::default()
}

pub fn configured() -> AppConfig {
    AppConfig::default()
        .with_base_url("https://api.example.com")
        .with_admin_email("admin@example.com")
}

pub fn resident() -> UserProfile {
    UserProfile {
        uid: "uid-1".into(),
        email: "ana@example.com".into(),
        first_name: "Ana".into(),
        last_name: "Reyes".into(),
        contact_number: "0917 555 0101".into(),
        barangay: "San Roque".into(),
        role: RESIDENT_ROLE.into(),
        ..UserProfile::default()
    }
}

pub fn profile_document(role: &str) -> Document {
    Document {
        id: "uid-1".into(),
        data: json!({
            "email": "ana@example.com",
            "firstName": "Ana",
            "lastName": "Reyes",
            "barangay": "San Roque",
            "role": role,
        }),
    }
}

/// A started-looking model with a hydrated, signed-in resident and a reachable backend.
pub fn signed_in_model() -> Model {
    let mut model = Model {
        config: configured(),
        ..Model::default()
    };
    model.session.hydrate(None);
    model
        .session
        .set_user(Some(resident()))
        .expect("resident encodes");
    model
}

pub fn count<F: Fn(&Effect) -> bool>(effects: &[Effect], pred: F) -> usize {
    effects.iter().filter(|e| pred(e)).count()
}

pub fn has_http(effects: &[Effect]) -> bool {
    effects.iter().any(|e| matches!(e, Effect::Http(_)))
}
