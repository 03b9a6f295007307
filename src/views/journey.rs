//! Journey planner: geocode two place names and draw the driving route
//! between them.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Page, PageArgs, PageId};
use crate::error::TrackingError;
use crate::map::{MarkerContent, MarkerKind, RouteOverlay, SharedMap};
use crate::notice::Notifier;
use crate::polling::{Epoch, EpochToken};
use crate::presentation::{format_distance_km, format_eta_minutes};
use crate::routing::{Geocoder, RoutingProvider};

pub const ORIGIN_MARKER: &str = "journey-origin";
pub const DESTINATION_MARKER: &str = "journey-destination";

#[derive(Clone)]
pub struct JourneyProviders {
    pub geocoder: Arc<dyn Geocoder>,
    pub router: Arc<dyn RoutingProvider>,
}

impl JourneyProviders {
    /// One client serving as both geocoder and router
    pub fn from_client<P>(client: Arc<P>) -> Self
    where
        P: Geocoder + RoutingProvider + 'static,
    {
        Self {
            geocoder: client.clone(),
            router: client,
        }
    }
}

#[derive(Clone)]
struct JourneyContext {
    providers: JourneyProviders,
    map: SharedMap,
    notifier: Notifier,
    zoom: u8,
}

pub struct JourneyPage {
    ctx: JourneyContext,
    epoch: Epoch,
}

impl JourneyPage {
    pub fn new(providers: JourneyProviders, map: SharedMap, notifier: Notifier, zoom: u8) -> Self {
        Self {
            ctx: JourneyContext {
                providers,
                map,
                notifier,
                zoom,
            },
            epoch: Epoch::new(),
        }
    }

    pub fn map(&self) -> &SharedMap {
        &self.ctx.map
    }
}

#[async_trait]
impl Page for JourneyPage {
    fn id(&self) -> PageId {
        PageId::Journey
    }

    async fn activate(&mut self, args: PageArgs) -> Result<(), TrackingError> {
        let (from, to) = match args {
            PageArgs::Journey { from, to } => (from.trim().to_string(), to.trim().to_string()),
            _ => return Ok(()),
        };
        if from.is_empty() || to.is_empty() {
            return Err(TrackingError::UserInputError(
                "Please enter both a start and a destination".to_string(),
            ));
        }

        let token = self.epoch.advance();
        self.ctx.notifier.info(format!("Finding route from {} to {}...", from, to));
        tokio::spawn(load_journey(self.ctx.clone(), token, from, to));
        Ok(())
    }

    async fn deactivate(&mut self) {
        // Orphan any pending load before touching the map
        self.epoch.advance();
        self.ctx.map.write().await.clear();
    }
}

async fn load_journey(ctx: JourneyContext, token: EpochToken, from: String, to: String) {
    if let Err(e) = plan_and_draw(&ctx, &token, &from, &to).await {
        if token.is_current() {
            tracing::warn!(from = %from, to = %to, error = %e, "Journey lookup failed");
            ctx.notifier.error(e.to_string());
        }
    }
}

async fn plan_and_draw(
    ctx: &JourneyContext,
    token: &EpochToken,
    from: &str,
    to: &str,
) -> Result<(), TrackingError> {
    let geocoder = &ctx.providers.geocoder;
    let (origin, destination) = tokio::try_join!(geocoder.geocode(from), geocoder.geocode(to))?;
    let plan = ctx
        .providers
        .router
        .route(origin.position, destination.position)
        .await?;

    let mut map = ctx.map.write().await;
    if !token.is_current() {
        tracing::debug!(generation = token.value(), "Discarding stale journey result");
        return Ok(());
    }

    map.clear();
    map.upsert_marker(
        ORIGIN_MARKER,
        origin.position,
        MarkerContent::new(MarkerKind::Origin, from, format!("Start: {}", origin.label)),
    );
    map.upsert_marker(
        DESTINATION_MARKER,
        destination.position,
        MarkerContent::new(
            MarkerKind::Destination,
            to,
            format!("Destination: {}", destination.label),
        ),
    );

    let bounds = if plan.waypoints.is_empty() {
        vec![origin.position, destination.position]
    } else {
        plan.waypoints.clone()
    };
    map.fit_bounds(&bounds, ctx.zoom);
    map.set_route(RouteOverlay {
        waypoints: plan.waypoints.clone(),
        distance_m: plan.distance_m,
        duration_s: plan.duration_s,
    });
    drop(map);

    tracing::info!(
        from = %from,
        to = %to,
        waypoints = plan.waypoints.len(),
        distance_m = plan.distance_m,
        "Journey drawn"
    );
    ctx.notifier.success(format!(
        "Route found: {} · about {}",
        format_distance_km(plan.distance_km()),
        format_eta_minutes(plan.duration_min())
    ));
    Ok(())
}
