//! Live bus map: every active bus, refreshed on a fixed cadence.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{Page, PageArgs, PageId};
use crate::backend::{LiveBus, TransitBackend};
use crate::error::TrackingError;
use crate::map::SharedMap;
use crate::polling::{PollCycle, PollingScheduler};

/// Scheduler key for the live map poll
pub const LIVE_MAP_VIEW: &str = "live-map";

/// `GET /bus/live` → full re-render of the live map
pub struct LiveMapCycle {
    backend: Arc<dyn TransitBackend>,
    map: SharedMap,
}

impl LiveMapCycle {
    pub fn new(backend: Arc<dyn TransitBackend>, map: SharedMap) -> Self {
        Self { backend, map }
    }
}

#[async_trait]
impl PollCycle for LiveMapCycle {
    type Snapshot = Vec<LiveBus>;

    async fn fetch(&self) -> Result<Vec<LiveBus>, TrackingError> {
        Ok(self.backend.live_buses().await?)
    }

    async fn render(&self, buses: Vec<LiveBus>) {
        let summary = self.map.write().await.render_snapshot(&buses);
        tracing::debug!(
            view = LIVE_MAP_VIEW,
            created = summary.created,
            updated = summary.updated,
            removed = summary.removed,
            total = summary.total,
            "Rendered live snapshot"
        );
    }
}

pub struct LiveMapPage {
    backend: Arc<dyn TransitBackend>,
    scheduler: Arc<PollingScheduler>,
    map: SharedMap,
    interval: Duration,
}

impl LiveMapPage {
    pub fn new(
        backend: Arc<dyn TransitBackend>,
        scheduler: Arc<PollingScheduler>,
        map: SharedMap,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            scheduler,
            map,
            interval,
        }
    }

    pub fn map(&self) -> &SharedMap {
        &self.map
    }
}

#[async_trait]
impl Page for LiveMapPage {
    fn id(&self) -> PageId {
        PageId::LiveMap
    }

    async fn activate(&mut self, _args: PageArgs) -> Result<(), TrackingError> {
        let cycle = LiveMapCycle::new(Arc::clone(&self.backend), Arc::clone(&self.map));
        self.scheduler
            .start_polling(LIVE_MAP_VIEW, self.interval, cycle)
            .await;
        Ok(())
    }

    async fn deactivate(&mut self) {
        self.scheduler.stop_polling(LIVE_MAP_VIEW).await;
        self.map.write().await.clear();
    }
}
