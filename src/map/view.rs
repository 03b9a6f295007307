//! Map View
//!
//! One map instance per view. Owns its markers, viewport and route overlay.
//! Created once, torn down with [`MapView::clear`].

use std::sync::Arc;
use tokio::sync::RwLock;

use super::marker::{Marker, MarkerChange, MarkerContent, MarkerRegistry};
use crate::backend::{LiveBus, Position};
use crate::presentation;

pub const MIN_ZOOM: u8 = 1;
pub const MAX_ZOOM: u8 = 19;

/// Map view shared between a page and its async tasks
pub type SharedMap = Arc<RwLock<MapView>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Position,
    pub zoom: u8,
}

/// Polyline drawn for a journey
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOverlay {
    pub waypoints: Vec<Position>,
    pub distance_m: f64,
    pub duration_s: f64,
}

/// Marker churn since the view was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapStats {
    pub created: u64,
    pub updated: u64,
    pub removed: u64,
}

/// Result of rendering one snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub total: usize,
}

#[derive(Debug)]
pub struct MapView {
    name: String,
    markers: MarkerRegistry,
    viewport: Viewport,
    home: Viewport,
    route: Option<RouteOverlay>,
    stats: MapStats,
}

impl MapView {
    pub fn new(name: impl Into<String>, center: Position, zoom: u8) -> Self {
        let home = Viewport {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        };
        Self {
            name: name.into(),
            markers: MarkerRegistry::new(),
            viewport: home,
            home,
            route: None,
            stats: MapStats::default(),
        }
    }

    pub fn shared(self) -> SharedMap {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn upsert_marker(
        &mut self,
        id: &str,
        position: Position,
        content: MarkerContent,
    ) -> MarkerChange {
        let change = self.markers.upsert(id, position, content);
        match change {
            MarkerChange::Created => self.stats.created += 1,
            MarkerChange::Updated => self.stats.updated += 1,
            MarkerChange::Unchanged => {}
        }
        change
    }

    pub fn remove_marker(&mut self, id: &str) -> bool {
        let removed = self.markers.remove(id).is_some();
        if removed {
            self.stats.removed += 1;
        }
        removed
    }

    /// Delete every marker not in `current_ids`
    pub fn remove_stale_markers<'a, I>(&mut self, current_ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let removed = self.markers.remove_stale(current_ids);
        if !removed.is_empty() {
            tracing::debug!(map = %self.name, removed = ?removed, "Removed stale markers");
        }
        self.stats.removed += removed.len() as u64;
        removed.len()
    }

    /// Recenter; zoom is clamped to the supported range
    pub fn focus(&mut self, center: Position, zoom: u8) {
        self.viewport = Viewport {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        };
    }

    /// Center on the centroid of `points`; no-op when empty
    pub fn fit_bounds(&mut self, points: &[Position], zoom: u8) {
        if points.is_empty() {
            return;
        }
        let n = points.len() as f64;
        let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
        let lng = points.iter().map(|p| p.lng).sum::<f64>() / n;
        self.focus(Position::new(lat, lng), zoom);
    }

    pub fn set_route(&mut self, route: RouteOverlay) {
        self.route = Some(route);
    }

    pub fn clear_route(&mut self) {
        self.route = None;
    }

    /// Full teardown: markers, route, viewport back home
    pub fn clear(&mut self) {
        let removed = self.markers.clear();
        self.stats.removed += removed as u64;
        self.route = None;
        self.viewport = self.home;
    }

    /// Render a live snapshot. The result depends only on `buses`: every bus
    /// is upserted, everything else is removed.
    pub fn render_snapshot(&mut self, buses: &[LiveBus]) -> RenderSummary {
        let mut summary = RenderSummary::default();

        for bus in buses {
            let content = presentation::bus_marker_content(bus, bus.route_info.as_deref());
            match self.upsert_marker(&bus.bus_reg, bus.position(), content) {
                MarkerChange::Created => summary.created += 1,
                MarkerChange::Updated => summary.updated += 1,
                MarkerChange::Unchanged => {}
            }
        }

        summary.removed = self.remove_stale_markers(buses.iter().map(|b| b.bus_reg.as_str()));
        summary.total = self.markers.len();
        summary
    }

    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn has_marker(&self, id: &str) -> bool {
        self.markers.contains(id)
    }

    pub fn marker_ids(&self) -> Vec<String> {
        self.markers.ids()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn markers(&self) -> Vec<&Marker> {
        self.markers.sorted()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn route(&self) -> Option<&RouteOverlay> {
        self.route.as_ref()
    }

    pub fn stats(&self) -> MapStats {
        self.stats
    }
}
