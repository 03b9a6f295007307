//! Map Rendering Surface
//!
//! Headless map model: one [`MapView`] per view (live map, tracking map,
//! journey map, ETA map), each owning a [`MarkerRegistry`].

mod marker;
mod view;

pub use marker::{Marker, MarkerChange, MarkerContent, MarkerKind, MarkerRegistry};
pub use view::{
    MapStats, MapView, RenderSummary, RouteOverlay, SharedMap, Viewport, MAX_ZOOM, MIN_ZOOM,
};
