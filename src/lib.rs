//! # SmartTransit
//!
//! Client core for the SmartTransit bus network: a live map of every active
//! bus, single-bus tracking, journey routes and smart ETAs, all driven by the
//! SmartTransit backend's JSON API.
//!
//! ## Modules
//!
//! - [`backend`]: HTTP adapter and wire types for the SmartTransit backend
//! - [`map`]: Headless map views with id-keyed marker registries
//! - [`polling`]: Per-view polling scheduler and epoch tokens
//! - [`tracking`]: Single-bus tracking session state machine
//! - [`routing`]: OpenRouteService directions and geocoding
//! - [`views`]: Pages and the page controller
//! - [`presentation`]: Crowd and status badges
//! - [`app`]: Wiring everything together from a [`Config`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smarttransit::{Config, PageArgs, PageId, TransitApp};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = TransitApp::connect(Config::load_default()).await?;
//!
//!     // Follow one bus until its trip ends
//!     app.navigate(PageId::Track, PageArgs::Track { bus_reg: "WB-04-1234".into() })
//!         .await?;
//!
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     for marker in app.maps().tracking.read().await.markers() {
//!         println!("{} at {}", marker.id, marker.position);
//!     }
//!
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod map;
pub mod notice;
pub mod polling;
pub mod presentation;
pub mod routing;
pub mod tracking;
pub mod views;

// Re-export top-level types for convenience
pub use app::{AppError, AppMaps, TransitApp};

pub use backend::{
    BackendClient, BackendError, ClientConfig, LiveBus, OccupancyLevel, OperationalStatus,
    Position, TransitBackend,
};

pub use config::{Config, ConfigError, LoggingConfig};

pub use error::TrackingError;

pub use map::{MapView, Marker, MarkerKind, SharedMap};

pub use notice::{Notice, NoticeLevel, Notifier};

pub use polling::{Epoch, EpochToken, PollCycle, PollingScheduler};

pub use tracking::{SessionConfig, SessionState, TrackingSession};

pub use routing::{Geocoder, OrsClient, OrsConfig, RoutingError, RoutingProvider};

pub use views::{Page, PageArgs, PageController, PageId, ViewError};
