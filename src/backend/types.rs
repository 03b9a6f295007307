//! Backend wire types
//!
//! Shapes returned by the SmartTransit backend. Field names follow the
//! backend's JSON; the client only ever reads these.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A WGS84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the lat/lng ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lng)
    }
}

/// Crowd classification computed by the backend from the passenger count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OccupancyLevel {
    #[default]
    Low,
    Medium,
    High,
    /// Anything the backend sends that this client does not know
    #[serde(other)]
    Unknown,
}

impl fmt::Display for OccupancyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OccupancyLevel::Low => "Low",
            OccupancyLevel::Medium => "Medium",
            OccupancyLevel::High => "High",
            OccupancyLevel::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Operational status reported by the driver app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationalStatus {
    #[default]
    Running,
    Delayed,
    Breakdown,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationalStatus::Running => "running",
            OperationalStatus::Delayed => "delayed",
            OperationalStatus::Breakdown => "breakdown",
            OperationalStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A bus currently on a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveBus {
    /// Registration number, unique across live buses
    pub bus_reg: String,
    #[serde(default)]
    pub route_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// km/h
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub passenger_count: u32,
    #[serde(default, rename = "crowd_level")]
    pub occupancy: OccupancyLevel,
    #[serde(default)]
    pub status: OperationalStatus,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub delay_reason: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub route_name: Option<String>,
    /// "From → To", only present on the live snapshot
    #[serde(default, deserialize_with = "empty_as_none")]
    pub route_info: Option<String>,
    #[serde(default)]
    pub last_update: Option<NaiveDateTime>,
}

impl LiveBus {
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }

    /// Best label for the route this bus serves
    pub fn route_label(&self) -> &str {
        self.route_name.as_deref().unwrap_or(&self.route_id)
    }
}

/// `GET /bus/live`
#[derive(Debug, Clone, Deserialize)]
pub struct LiveSnapshot {
    #[serde(default)]
    pub buses: Vec<LiveBus>,
}

/// A bus route as listed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub id: String,
    pub name: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub via: String,
    #[serde(default)]
    pub fare_min: Option<f64>,
    #[serde(default)]
    pub fare_max: Option<f64>,
    #[serde(default)]
    pub frequency_min: Option<u32>,
}

impl RouteInfo {
    /// "S12: Howrah Station → New Town"
    pub fn label(&self) -> String {
        format!("{}: {} → {}", self.name, self.from, self.to)
    }
}

/// A bus stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub routes: Vec<String>,
}

/// `GET /routes/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct RouteDetail {
    pub route: RouteInfo,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

/// One row of `GET /crowd-levels`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdEntry {
    pub bus_reg: String,
    #[serde(default)]
    pub route_id: String,
    #[serde(default)]
    pub route_name: String,
    #[serde(default)]
    pub route_info: String,
    #[serde(default)]
    pub passenger_count: u32,
    #[serde(default)]
    pub crowd_level: OccupancyLevel,
    #[serde(default)]
    pub status: OperationalStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrowdLevels {
    #[serde(default)]
    pub crowd_data: Vec<CrowdEntry>,
}

/// A named point on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl NamedPoint {
    pub fn position(&self) -> Position {
        Position::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupStop {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub distance_km: f64,
    pub walk_time_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaRoute {
    pub id: String,
    pub name: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub via: String,
    #[serde(default)]
    pub fare_range: String,
    #[serde(default)]
    pub frequency_min: Option<u32>,
    #[serde(default)]
    pub transfer_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaBreakdown {
    pub walk_time_min: f64,
    pub wait_time_min: f64,
    pub bus_travel_min: f64,
    pub total_min: f64,
    /// "ml_model" or "formula"
    #[serde(default)]
    pub source: String,
}

/// Closest live bus on the suggested route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaLiveBus {
    pub bus_reg: String,
    pub distance_km: f64,
    pub speed: f64,
    #[serde(default)]
    pub crowd_level: OccupancyLevel,
    #[serde(default)]
    pub status: OperationalStatus,
    pub live_eta_min: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRoute {
    pub id: String,
    pub name: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub stop: NamedPoint,
    pub route: TransferRoute,
}

/// `GET /smart-eta`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartEta {
    pub user_location: Position,
    pub pickup_stop: PickupStop,
    pub destination_stop: NamedPoint,
    pub bus_route: EtaRoute,
    pub eta: EtaBreakdown,
    pub distance_km: f64,
    #[serde(default)]
    pub traffic_index: f64,
    #[serde(default)]
    pub traffic_source: String,
    #[serde(default)]
    pub hour_of_day: u32,
    #[serde(default)]
    pub live_bus: Option<EtaLiveBus>,
    #[serde(default)]
    pub transfer: Option<Transfer>,
}

/// `GET /config`: public keys for third-party providers
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicConfig {
    #[serde(default)]
    pub ors_key: String,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
