//! SmartTransit Backend
//!
//! Everything the client consumes from the backend goes through the
//! [`TransitBackend`] trait. [`BackendClient`] is the HTTP implementation.
//!
//! ## Endpoints
//!
//! - `GET /bus/live`: snapshot of all active buses
//! - `GET /bus/{id}`: single bus; non-2xx means the trip ended
//! - `GET /routes/{id}`: route label lookup (best effort)
//! - `GET /crowd-levels`: crowd table
//! - `GET /smart-eta`: pickup stop, route and ETA for a destination
//! - `GET /config`: public third-party keys

mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{BackendClient, BackendError, ClientConfig};
pub use types::{
    CrowdEntry, LiveBus, NamedPoint, OccupancyLevel, OperationalStatus, Position, PublicConfig,
    RouteDetail, RouteInfo, SmartEta, Stop,
};

use async_trait::async_trait;

/// Read-only view of the SmartTransit backend
#[async_trait]
pub trait TransitBackend: Send + Sync {
    /// All buses currently on a trip
    async fn live_buses(&self) -> Result<Vec<LiveBus>, BackendError>;

    /// A single bus; `NotFound` once its trip has ended
    async fn bus(&self, bus_reg: &str) -> Result<LiveBus, BackendError>;

    /// Route details for label lookups
    async fn route(&self, route_id: &str) -> Result<RouteDetail, BackendError>;

    /// Crowd level per live bus
    async fn crowd_levels(&self) -> Result<Vec<CrowdEntry>, BackendError>;

    /// Suggested pickup stop, route and ETA from `origin` to `destination`
    async fn smart_eta(&self, origin: Position, destination: &str)
        -> Result<SmartEta, BackendError>;

    /// Public keys for map/routing providers
    async fn public_config(&self) -> Result<PublicConfig, BackendError>;
}
