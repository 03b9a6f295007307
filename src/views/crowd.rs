//! Crowd table: passenger load of every live bus.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Page, PageArgs, PageId};
use crate::backend::{CrowdEntry, TransitBackend};
use crate::error::TrackingError;
use crate::notice::Notifier;
use crate::presentation::{occupancy_badge, status_badge, Badge, StatusBadge};

#[derive(Debug, Clone, PartialEq)]
pub struct CrowdRow {
    pub bus_reg: String,
    pub route: String,
    pub passenger_count: u32,
    pub crowd: Badge,
    pub status: StatusBadge,
}

impl From<&CrowdEntry> for CrowdRow {
    fn from(entry: &CrowdEntry) -> Self {
        let route = [&entry.route_info, &entry.route_name, &entry.route_id]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_default();
        Self {
            bus_reg: entry.bus_reg.clone(),
            route,
            passenger_count: entry.passenger_count,
            crowd: occupancy_badge(entry.crowd_level),
            status: status_badge(entry.status),
        }
    }
}

pub type CrowdBoard = Arc<RwLock<Vec<CrowdRow>>>;

pub struct CrowdPage {
    backend: Arc<dyn TransitBackend>,
    notifier: Notifier,
    rows: CrowdBoard,
}

impl CrowdPage {
    pub fn new(backend: Arc<dyn TransitBackend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn board(&self) -> CrowdBoard {
        Arc::clone(&self.rows)
    }
}

#[async_trait]
impl Page for CrowdPage {
    fn id(&self) -> PageId {
        PageId::Crowd
    }

    async fn activate(&mut self, _args: PageArgs) -> Result<(), TrackingError> {
        match self.backend.crowd_levels().await {
            Ok(entries) => {
                let rows: Vec<CrowdRow> = entries.iter().map(CrowdRow::from).collect();
                tracing::debug!(rows = rows.len(), "Crowd levels loaded");
                *self.rows.write().await = rows;
                Ok(())
            }
            Err(e) => {
                let err = TrackingError::from(e);
                self.notifier.error(format!("Could not load crowd levels: {}", err));
                Err(err)
            }
        }
    }

    async fn deactivate(&mut self) {
        self.rows.write().await.clear();
    }
}
