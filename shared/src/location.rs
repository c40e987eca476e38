//! Address resolution for the report form. Every path ends in an address
//! string; failures collapse to [`ADDRESS_FALLBACK`].

use crate::capabilities::location::{Coordinates, GeocodedPlace, LocationError};

pub const ADDRESS_FALLBACK: &str = "Address not available";
pub const FETCHING_TEXT: &str = "Fetching location…";
pub const UNAVAILABLE_TEXT: &str = "Unable to fetch location";

/// The next thing the resolver needs, or its final answer.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveStep {
    RequestPosition,
    ReverseGeocode(Coordinates),
    Done(String),
}

fn fallback(reason: &str) -> ResolveStep {
    tracing::warn!(reason, "address resolution fell back");
    ResolveStep::Done(ADDRESS_FALLBACK.to_string())
}

#[must_use]
pub fn on_permission(result: Result<bool, LocationError>) -> ResolveStep {
    match result {
        Ok(true) => ResolveStep::RequestPosition,
        Ok(false) => fallback("permission denied"),
        Err(e) => fallback(&e.to_string()),
    }
}

#[must_use]
pub fn on_position(result: Result<Option<Coordinates>, LocationError>) -> ResolveStep {
    match result {
        Ok(Some(c)) if usable(c.latitude) && usable(c.longitude) => ResolveStep::ReverseGeocode(c),
        Ok(_) => fallback("no usable coordinates"),
        Err(e) => fallback(&e.to_string()),
    }
}

#[must_use]
pub fn on_places(result: Result<Vec<GeocodedPlace>, LocationError>) -> ResolveStep {
    match result {
        Ok(places) => match places.first().map(format_address) {
            Some(address) if !address.is_empty() => ResolveStep::Done(address),
            _ => fallback("no geocoded place"),
        },
        Err(e) => fallback(&e.to_string()),
    }
}

// Zero and non-finite coordinates are treated as missing.
fn usable(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// District (or subregion), city, region, country; blanks dropped.
#[must_use]
pub fn format_address(place: &GeocodedPlace) -> String {
    let locality = non_blank(place.district.as_deref()).or(non_blank(place.subregion.as_deref()));
    [
        locality,
        non_blank(place.city.as_deref()),
        non_blank(place.region.as_deref()),
        non_blank(place.country.as_deref()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ")
}

fn non_blank(part: Option<&str>) -> Option<&str> {
    part.map(str::trim).filter(|p| !p.is_empty())
}

/// Tracks the report form's address across overlapping resolutions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressState {
    generation: u64,
    resolving: bool,
    address: Option<String>,
}

impl AddressState {
    /// Starts a new resolution and returns its generation.
    pub fn begin(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.resolving = true;
        self.address = None;
        self.generation
    }

    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.resolving && self.generation == generation
    }

    /// Stores the address if `generation` is still current.
    pub fn finish(&mut self, generation: u64, address: String) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.resolving = false;
        self.address = Some(address);
        true
    }

    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.resolving = false;
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Address for the outgoing payload; the fallback until resolved.
    #[must_use]
    pub fn for_payload(&self) -> String {
        self.address().unwrap_or(ADDRESS_FALLBACK).to_string()
    }

    #[must_use]
    pub fn display_text(&self) -> String {
        match (self.address(), self.resolving) {
            (_, true) | (None, false) => FETCHING_TEXT.to_string(),
            (Some(ADDRESS_FALLBACK), false) => UNAVAILABLE_TEXT.to_string(),
            (Some(a), false) => a.to_string(),
        }
    }
}
