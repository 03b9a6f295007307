//! Views and page navigation
//!
//! Every screen of the client is a [`Page`] registered with the
//! [`PageController`]. Exactly one page is active at a time; leaving a page
//! runs its `deactivate`, which releases any timers, polls and map markers
//! it owns.

mod controller;
mod crowd;
mod eta;
mod home;
mod journey;
mod live;
mod track;

pub use controller::PageController;
pub use crowd::{CrowdBoard, CrowdPage, CrowdRow};
pub use eta::{EtaBoard, EtaPage};
pub use home::HomePage;
pub use journey::{JourneyPage, JourneyProviders};
pub use live::{LiveMapCycle, LiveMapPage, LIVE_MAP_VIEW};
pub use track::TrackPage;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::backend::Position;
use crate::error::TrackingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageId {
    Home,
    LiveMap,
    Track,
    Journey,
    Eta,
    Crowd,
}

impl PageId {
    pub const ALL: [PageId; 6] = [
        PageId::Home,
        PageId::LiveMap,
        PageId::Track,
        PageId::Journey,
        PageId::Eta,
        PageId::Crowd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageId::Home => "home",
            PageId::LiveMap => "live-map",
            PageId::Track => "track",
            PageId::Journey => "journey",
            PageId::Eta => "eta",
            PageId::Crowd => "crowd",
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments passed to a page's initializer
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PageArgs {
    #[default]
    None,
    Track {
        bus_reg: String,
    },
    Journey {
        from: String,
        to: String,
    },
    Eta {
        origin: Position,
        destination: String,
    },
}

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("No page registered for '{0}'")]
    UnknownPage(PageId),

    #[error(transparent)]
    Page(#[from] TrackingError),
}

/// A screen with an activate/deactivate pair
#[async_trait]
pub trait Page: Send + Sync {
    fn id(&self) -> PageId;

    /// Initialize for display. Input problems are returned before any
    /// request is made; the page stays active either way.
    async fn activate(&mut self, args: PageArgs) -> Result<(), TrackingError>;

    /// Release everything acquired by `activate`
    async fn deactivate(&mut self);
}
