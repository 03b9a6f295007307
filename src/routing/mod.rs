//! Routing and Geocoding
//!
//! Third-party capabilities the journey view needs:
//! - [`RoutingProvider`]: two coordinates → ordered waypoints + distance/duration
//! - [`Geocoder`]: place name → coordinate
//!
//! [`OrsClient`] implements both against OpenRouteService.

mod ors;

pub use ors::{OrsClient, OrsConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::Position;

/// A drivable route between two points
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    /// Ordered polyline from start to end
    pub waypoints: Vec<Position>,
    /// Metres
    pub distance_m: f64,
    /// Seconds
    pub duration_s: f64,
}

impl RoutePlan {
    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    pub fn duration_min(&self) -> f64 {
        self.duration_s / 60.0
    }
}

/// Result of a place-name lookup
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    /// Provider's display label
    pub label: String,
    pub position: Position,
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, from: Position, to: Position) -> Result<RoutePlan, RoutingError>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, place: &str) -> Result<GeocodedPlace, RoutingError>;
}

/// Errors from routing/geocoding providers
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Routing is not configured: missing OpenRouteService key")]
    MissingApiKey,

    #[error("No result for '{0}'")]
    NoResult(String),

    #[error("Routing provider unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}
