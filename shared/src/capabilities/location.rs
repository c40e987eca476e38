use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Accuracy {
    Balanced,
    High,
}

/// One reverse-geocoding candidate. Every component may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeocodedPlace {
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub subregion: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "data")]
pub enum LocationOperation {
    RequestPermission,
    CurrentPosition {
        accuracy: Accuracy,
    },
    ReverseGeocode {
        coordinates: Coordinates,
        #[serde(default)]
        api_key: Option<String>,
    },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum LocationError {
    #[error("location services unavailable: {message}")]
    Unavailable { message: String },

    #[error("geocoding failed: {message}")]
    Geocoding { message: String },

    #[error("unexpected location response")]
    UnexpectedOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum LocationOutput {
    Permission { granted: bool },
    Position(Option<Coordinates>),
    Places(Vec<GeocodedPlace>),
}

pub type LocationResult = Result<LocationOutput, LocationError>;

impl Operation for LocationOperation {
    type Output = LocationResult;
}

#[derive(crux_core::macros::Capability)]
pub struct Location<Ev> {
    context: CapabilityContext<LocationOperation, Ev>,
}

impl<Ev> Location<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn request_permission<F>(&self, make_event: F)
    where
        F: FnOnce(Result<bool, LocationError>) -> Ev + Send + 'static,
    {
        self.request(LocationOperation::RequestPermission, move |output| {
            make_event(output.and_then(|o| match o {
                LocationOutput::Permission { granted } => Ok(granted),
                _ => Err(LocationError::UnexpectedOutput),
            }))
        });
    }

    pub fn current_position<F>(&self, make_event: F)
    where
        F: FnOnce(Result<Option<Coordinates>, LocationError>) -> Ev + Send + 'static,
    {
        let operation = LocationOperation::CurrentPosition {
            accuracy: Accuracy::Balanced,
        };
        self.request(operation, move |output| {
            make_event(output.and_then(|o| match o {
                LocationOutput::Position(position) => Ok(position),
                _ => Err(LocationError::UnexpectedOutput),
            }))
        });
    }

    pub fn reverse_geocode<F>(&self, coordinates: Coordinates, api_key: Option<String>, make_event: F)
    where
        F: FnOnce(Result<Vec<GeocodedPlace>, LocationError>) -> Ev + Send + 'static,
    {
        let operation = LocationOperation::ReverseGeocode {
            coordinates,
            api_key,
        };
        self.request(operation, move |output| {
            make_event(output.and_then(|o| match o {
                LocationOutput::Places(places) => Ok(places),
                _ => Err(LocationError::UnexpectedOutput),
            }))
        });
    }

    fn request<F>(&self, operation: LocationOperation, make_event: F)
    where
        F: FnOnce(LocationResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx.request_from_shell(operation).await;
            ctx.update_app(make_event(output));
        });
    }
}
