//! OpenRouteService client
//!
//! Directions and geocoding over the ORS GeoJSON endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{GeocodedPlace, Geocoder, RoutePlan, RoutingError, RoutingProvider};
use crate::backend::Position;

/// Configuration for the ORS client
#[derive(Debug, Clone)]
pub struct OrsConfig {
    /// Base URL (e.g., "https://api.openrouteservice.org")
    pub base_url: String,
    /// API key; requests fail with `MissingApiKey` while empty
    pub api_key: String,
    /// Directions profile
    pub profile: String,
    /// Restrict geocoding to an ISO country code
    pub country: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for OrsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".to_string(),
            api_key: String::new(),
            profile: "driving-car".to_string(),
            country: Some("IN".to_string()),
            request_timeout_ms: 15_000,
        }
    }
}

impl From<&crate::config::RoutingConfig> for OrsConfig {
    fn from(config: &crate::config::RoutingConfig) -> Self {
        Self {
            base_url: config.ors_url.clone(),
            api_key: config.ors_key.clone(),
            profile: config.profile.clone(),
            country: Some(config.country.clone()).filter(|c| !c.is_empty()),
            request_timeout_ms: config.request_timeout_secs * 1000,
        }
    }
}

pub struct OrsClient {
    client: Client,
    config: OrsConfig,
}

impl OrsClient {
    pub fn new(mut config: OrsConfig) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OrsConfig {
        &self.config
    }

    /// Use a key obtained after construction (e.g. from the backend's `/config`)
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.config.api_key = api_key.into();
    }

    pub fn has_api_key(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    async fn get_geojson<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RoutingError> {
        if !self.has_api_key() {
            return Err(RoutingError::MissingApiKey);
        }

        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    RoutingError::Unavailable
                } else {
                    RoutingError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RoutingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| RoutingError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RoutingProvider for OrsClient {
    async fn route(&self, from: Position, to: Position) -> Result<RoutePlan, RoutingError> {
        let path = format!("/v2/directions/{}", self.config.profile);
        let query = [
            ("start", format!("{},{}", from.lng, from.lat)),
            ("end", format!("{},{}", to.lng, to.lat)),
        ];

        let collection: DirectionsResponse = self.get_geojson(&path, &query).await?;
        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or_else(|| RoutingError::NoResult(format!("{} → {}", from, to)))?;

        let waypoints: Vec<Position> = feature
            .geometry
            .coordinates
            .iter()
            .map(|[lng, lat]| Position::new(*lat, *lng))
            .collect();

        if waypoints.len() < 2 {
            return Err(RoutingError::Malformed(format!(
                "route has {} waypoints",
                waypoints.len()
            )));
        }

        Ok(RoutePlan {
            waypoints,
            distance_m: feature.properties.summary.distance,
            duration_s: feature.properties.summary.duration,
        })
    }
}

#[async_trait]
impl Geocoder for OrsClient {
    async fn geocode(&self, place: &str) -> Result<GeocodedPlace, RoutingError> {
        let mut query = vec![("text", place.to_string()), ("size", "1".to_string())];
        if let Some(country) = &self.config.country {
            query.push(("boundary.country", country.clone()));
        }

        let collection: GeocodeResponse = self.get_geojson("/geocode/search", &query).await?;
        let feature = collection
            .features
            .into_iter()
            .next()
            .ok_or_else(|| RoutingError::NoResult(place.to_string()))?;

        let [lng, lat] = feature.geometry.coordinates;
        Ok(GeocodedPlace {
            label: feature.properties.label.unwrap_or_else(|| place.to_string()),
            position: Position::new(lat, lng),
        })
    }
}

// ============================================
// GeoJSON DTOs
// ============================================

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<DirectionsFeature>,
}

#[derive(Debug, Deserialize)]
struct DirectionsFeature {
    geometry: LineString,
    properties: DirectionsProperties,
}

#[derive(Debug, Deserialize)]
struct LineString {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct DirectionsProperties {
    #[serde(default)]
    summary: Summary,
}

#[derive(Debug, Default, Deserialize)]
struct Summary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<GeocodeFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodeFeature {
    geometry: Point,
    #[serde(default)]
    properties: GeocodeProperties,
}

#[derive(Debug, Deserialize)]
struct Point {
    coordinates: [f64; 2],
}

#[derive(Debug, Default, Deserialize)]
struct GeocodeProperties {
    label: Option<String>,
}
