use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::alarm::{AlarmLevel, DEFAULT_ALARM_TYPE};
use crate::capabilities::store::{Direction, Document, Query, StoreError};
use crate::lenient;
use crate::session::UserProfile;
use crate::timestamp::Stamp;

pub const MY_EMERGENCIES_COLLECTION: &str = "resident_emergency_reports";
pub const NEWS_COLLECTION: &str = "admin_news_report";
pub const EMERGENCY_CASES_COLLECTION: &str = "EmergencyCases";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedKind {
    MyEmergencies,
    News,
    EmergencyCases,
}

impl FeedKind {
    pub const ALL: [Self; 3] = [Self::MyEmergencies, Self::News, Self::EmergencyCases];

    /// `None` when the feed is scoped to a viewer and nobody is signed in.
    #[must_use]
    pub fn query(self, viewer: Option<&UserProfile>) -> Option<Query> {
        match self {
            Self::MyEmergencies => {
                let email = viewer.map(|u| u.email.trim()).filter(|e| !e.is_empty())?;
                Some(Query::collection(MY_EMERGENCIES_COLLECTION).where_eq("email", email))
            }
            Self::News => Some(Query::collection(NEWS_COLLECTION)),
            Self::EmergencyCases => Some(
                Query::collection(EMERGENCY_CASES_COLLECTION)
                    .order_by("createdAt", Direction::Descending),
            ),
        }
    }

    /// Unordered queries are sorted newest first on the client.
    #[must_use]
    pub const fn needs_client_sort(self) -> bool {
        !matches!(self, Self::EmergencyCases)
    }
}

/// A typed projection of one feed document.
pub trait FeedRecord: DeserializeOwned + Clone {
    fn set_id(&mut self, id: String);
    fn sort_key(&self) -> Stamp;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResidentEmergency {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(rename = "type", deserialize_with = "lenient::string")]
    pub kind: String,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(deserialize_with = "lenient::string")]
    pub location: String,
    #[serde(deserialize_with = "lenient::string")]
    pub barangay: String,
    #[serde(deserialize_with = "lenient::string")]
    pub contact_number: String,
    #[serde(deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(deserialize_with = "lenient::string")]
    pub reported_by: String,
    pub priority: AlarmLevel,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    pub date_time: Stamp,
    #[serde(deserialize_with = "lenient::string_list")]
    pub images: Vec<String>,
}

impl FeedRecord for ResidentEmergency {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn sort_key(&self) -> Stamp {
        self.date_time
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsDetails {
    pub alarm_level: AlarmLevel,
    pub client_date_time: Stamp,
    #[serde(deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(deserialize_with = "lenient::string")]
    pub reported_by: String,
    #[serde(rename = "type", deserialize_with = "lenient::string")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AdminNewsReport {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub body: String,
    pub alarm_level: AlarmLevel,
    #[serde(deserialize_with = "lenient::or_default")]
    pub data: NewsDetails,
}

impl FeedRecord for AdminNewsReport {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn sort_key(&self) -> Stamp {
        self.data.client_date_time
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CaseReporter {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(rename = "photoURL", deserialize_with = "lenient::opt_string")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmergencyCase {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub alarm_type: String,
    pub alarm_level: AlarmLevel,
    #[serde(deserialize_with = "lenient::string")]
    pub message: String,
    #[serde(deserialize_with = "lenient::string")]
    pub location: String,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub images: Vec<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub reporter: CaseReporter,
    #[serde(deserialize_with = "lenient::string")]
    pub user_email: String,
    pub received_at: Stamp,
    pub reported_at: Stamp,
    pub created_at: Stamp,
}

impl Default for EmergencyCase {
    fn default() -> Self {
        Self {
            id: String::new(),
            alarm_type: DEFAULT_ALARM_TYPE.to_string(),
            alarm_level: AlarmLevel::Medium,
            message: String::new(),
            location: String::new(),
            status: String::new(),
            images: Vec::new(),
            reporter: CaseReporter::default(),
            user_email: String::new(),
            received_at: Stamp::default(),
            reported_at: Stamp::default(),
            created_at: Stamp::default(),
        }
    }
}

impl EmergencyCase {
    /// When the case happened, by the first timestamp present.
    #[must_use]
    pub fn when(&self) -> Stamp {
        [self.received_at, self.reported_at, self.created_at]
            .into_iter()
            .find(|s| s.0.is_some())
            .unwrap_or_default()
    }
}

impl FeedRecord for EmergencyCase {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn sort_key(&self) -> Stamp {
        self.created_at
    }
}

/// Decodes one snapshot. Wrong-typed fields fall back to their defaults;
/// documents that are not objects are logged and skipped.
#[must_use]
pub fn decode_snapshot<T: FeedRecord>(kind: FeedKind, docs: &[Document]) -> Vec<T> {
    let mut items: Vec<T> = docs
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(mut item) => {
                item.set_id(doc.id.clone());
                Some(item)
            }
            Err(e) => {
                tracing::warn!(feed = ?kind, error = %e, "skipping undecodable document");
                None
            }
        })
        .collect();

    if kind.needs_client_sort() {
        // Newest first; records without a timestamp sink to the end.
        items.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
    }
    items
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<String>,
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            refreshing: false,
            error: None,
        }
    }
}

impl<T: FeedRecord> FeedState<T> {
    pub fn begin(&mut self, refreshing: bool) {
        self.loading = !refreshing;
        self.refreshing = refreshing;
        self.error = None;
    }

    pub fn apply(&mut self, kind: FeedKind, result: Result<Vec<Document>, StoreError>) {
        self.loading = false;
        self.refreshing = false;
        match result {
            Ok(docs) => {
                self.items = decode_snapshot(kind, &docs);
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(feed = ?kind, error = %e, "live query failed");
                self.error = Some(e.to_string());
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feeds {
    pub my_emergencies: FeedState<ResidentEmergency>,
    pub news: FeedState<AdminNewsReport>,
    pub cases: FeedState<EmergencyCase>,
}

impl Feeds {
    pub fn begin(&mut self, kind: FeedKind, refreshing: bool) {
        match kind {
            FeedKind::MyEmergencies => self.my_emergencies.begin(refreshing),
            FeedKind::News => self.news.begin(refreshing),
            FeedKind::EmergencyCases => self.cases.begin(refreshing),
        }
    }

    pub fn apply(&mut self, kind: FeedKind, result: Result<Vec<Document>, StoreError>) {
        match kind {
            FeedKind::MyEmergencies => self.my_emergencies.apply(kind, result),
            FeedKind::News => self.news.apply(kind, result),
            FeedKind::EmergencyCases => self.cases.apply(kind, result),
        }
    }

    pub fn clear(&mut self, kind: FeedKind) {
        match kind {
            FeedKind::MyEmergencies => self.my_emergencies.clear(),
            FeedKind::News => self.news.clear(),
            FeedKind::EmergencyCases => self.cases.clear(),
        }
    }
}
