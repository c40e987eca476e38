pub mod auth;
pub mod files;
pub mod http;
pub mod kv;
pub mod location;
pub mod push;
pub mod sound;
pub mod store;

pub use self::auth::{Auth, AuthError, AuthOperation, AuthOutput, AuthUser};
pub use self::files::{FileError, FileOperation, FileOutput, FileStore};
pub use self::http::{HttpError, HttpOutcome, ValidatedUrl};
pub use self::kv::{KvError, SESSION_KEY};
pub use self::location::{Coordinates, GeocodedPlace, Location, LocationError, LocationOperation};
pub use self::push::{
    DeviceToken, IncomingNotification, PermissionState, Push, PushError, PushOperation,
    PushPlatform,
};
pub use self::sound::{Sound, SoundOperation};
pub use self::store::{Document, DocumentStore, Query, StoreError, StoreOperation, StoreOutput};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::app::App;
use crate::event::Event;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Storage error: {0}")]
    Kv(#[from] KvError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("File store error: {0}")]
    Files(#[from] FileError),

    #[error("Push error: {0}")]
    Push(#[from] PushError),
}

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub auth: Auth<Event>,
    pub store: DocumentStore<Event>,
    pub files: FileStore<Event>,
    pub push: Push<Event>,
    pub location: Location<Event>,
    pub sound: Sound<Event>,
}
