use serde::{Deserialize, Serialize};

use crate::feeds::{AdminNewsReport, EmergencyCase, FeedState, ResidentEmergency};
use crate::model::{Alert, Model};
use crate::report::{EmergencyType, ReportForm, SubmissionStatus};
use crate::session::{self, Route, UserProfile};
use crate::{preview, DESCRIPTION_PREVIEW_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCard {
    pub display_name: String,
    pub initials: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub member_since: Option<String>,
    pub barangay: Option<String>,
}

impl UserCard {
    fn build(user: Option<&UserProfile>) -> Self {
        Self {
            display_name: session::display_name(user),
            initials: user.map_or_else(|| "U".to_string(), UserProfile::initials),
            email: user.map(|u| u.email.clone()).filter(|e| !e.is_empty()),
            photo_url: user.and_then(|u| u.photo_url.clone()),
            member_since: user.and_then(UserProfile::member_since),
            barangay: user.map(|u| u.barangay.clone()).filter(|b| !b.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOption {
    pub key: String,
    pub label: String,
    pub priority: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportView {
    pub types: Vec<TypeOption>,
    pub description: String,
    pub location_text: String,
    pub photos: Vec<String>,
    pub can_add_photo: bool,
    pub is_submitting: bool,
    pub upload_progress: Option<(usize, usize)>,
    pub should_close: bool,
}

impl ReportView {
    fn build(form: &ReportForm) -> Self {
        let upload_progress = match form.status {
            SubmissionStatus::UploadingPhotos { done, total } => Some((done, total)),
            _ => None,
        };
        Self {
            types: EmergencyType::ALL
                .into_iter()
                .map(|t| TypeOption {
                    key: t.key().to_string(),
                    label: t.label().to_string(),
                    priority: t.priority().to_string(),
                    selected: form.selected_type == Some(t),
                })
                .collect(),
            description: form.description.clone(),
            location_text: form.address.display_text(),
            photos: form.photos.clone(),
            can_add_photo: form.can_add_photo(),
            is_submitting: form.status.is_in_flight(),
            upload_progress,
            should_close: form.close_requested,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub level: String,
    pub status: String,
    pub time: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FeedView {
    pub items: Vec<FeedItem>,
    pub loading: bool,
    pub refreshing: bool,
    pub error: Option<String>,
    pub empty: bool,
}

impl FeedView {
    fn build<T>(state: &FeedState<T>, to_item: impl Fn(&T) -> FeedItem) -> Self {
        let items: Vec<FeedItem> = state.items.iter().map(to_item).collect();
        Self {
            empty: items.is_empty() && !state.loading,
            items,
            loading: state.loading,
            refreshing: state.refreshing,
            error: state.error.clone(),
        }
    }
}

fn my_emergency_item(r: &ResidentEmergency) -> FeedItem {
    FeedItem {
        id: r.id.clone(),
        title: r.kind.to_uppercase(),
        subtitle: preview(&r.description, DESCRIPTION_PREVIEW_LENGTH),
        level: r.priority.to_string(),
        status: r.status.clone(),
        time: r.date_time.display(),
        images: r.images.clone(),
    }
}

fn news_item(n: &AdminNewsReport) -> FeedItem {
    let body = if n.body.trim().is_empty() {
        &n.data.description
    } else {
        &n.body
    };
    FeedItem {
        id: n.id.clone(),
        title: n.title.clone(),
        subtitle: preview(body, DESCRIPTION_PREVIEW_LENGTH),
        level: n.alarm_level.to_string(),
        status: String::new(),
        time: n.data.client_date_time.display(),
        images: Vec::new(),
    }
}

fn case_item(c: &EmergencyCase) -> FeedItem {
    FeedItem {
        id: c.id.clone(),
        title: c.alarm_type.clone(),
        subtitle: preview(&c.message, DESCRIPTION_PREVIEW_LENGTH),
        level: c.alarm_level.to_string(),
        status: c.status.clone(),
        time: c.when().display(),
        images: c.images.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    pub route: Route,
    pub user: UserCard,
    pub login_in_progress: bool,
    pub report: ReportView,
    pub my_emergencies: FeedView,
    pub news: FeedView,
    pub emergency_cases: FeedView,
    pub alert: Option<Alert>,
    pub uploading_photo: bool,
    pub logging_out: bool,
}

impl ViewModel {
    #[must_use]
    pub fn build(model: &Model) -> Self {
        Self {
            route: model.session.route(),
            user: UserCard::build(model.session.user()),
            login_in_progress: model.login.in_flight,
            report: ReportView::build(&model.report),
            my_emergencies: FeedView::build(&model.feeds.my_emergencies, my_emergency_item),
            news: FeedView::build(&model.feeds.news, news_item),
            emergency_cases: FeedView::build(&model.feeds.cases, case_item),
            alert: model.alerts.front().cloned(),
            uploading_photo: model.profile.uploading_photo,
            logging_out: model.profile.logging_out,
        }
    }
}
