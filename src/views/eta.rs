//! Smart ETA: nearest pickup stop, the route to take and when to expect it.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Page, PageArgs, PageId};
use crate::backend::{Position, SmartEta, TransitBackend};
use crate::error::TrackingError;
use crate::map::{MarkerContent, MarkerKind, SharedMap};
use crate::notice::Notifier;
use crate::polling::{Epoch, EpochToken};
use crate::presentation::{format_distance_km, format_eta_minutes, occupancy_badge};

/// Last ETA shown on the page
pub type EtaBoard = Arc<RwLock<Option<SmartEta>>>;

pub const USER_MARKER: &str = "eta-user";
pub const PICKUP_MARKER: &str = "eta-pickup";
pub const DESTINATION_MARKER: &str = "eta-destination";
pub const TRANSFER_MARKER: &str = "eta-transfer";

#[derive(Clone)]
struct EtaContext {
    backend: Arc<dyn TransitBackend>,
    map: SharedMap,
    board: EtaBoard,
    notifier: Notifier,
    zoom: u8,
}

pub struct EtaPage {
    ctx: EtaContext,
    epoch: Epoch,
}

impl EtaPage {
    pub fn new(
        backend: Arc<dyn TransitBackend>,
        map: SharedMap,
        notifier: Notifier,
        zoom: u8,
    ) -> Self {
        Self {
            ctx: EtaContext {
                backend,
                map,
                board: Arc::new(RwLock::new(None)),
                notifier,
                zoom,
            },
            epoch: Epoch::new(),
        }
    }

    pub fn map(&self) -> &SharedMap {
        &self.ctx.map
    }

    pub fn board(&self) -> EtaBoard {
        Arc::clone(&self.ctx.board)
    }
}

#[async_trait]
impl Page for EtaPage {
    fn id(&self) -> PageId {
        PageId::Eta
    }

    async fn activate(&mut self, args: PageArgs) -> Result<(), TrackingError> {
        let (origin, destination) = match args {
            PageArgs::Eta {
                origin,
                destination,
            } => (origin, destination.trim().to_string()),
            _ => return Ok(()),
        };
        if destination.is_empty() {
            return Err(TrackingError::UserInputError(
                "Please enter a destination".to_string(),
            ));
        }
        if !origin.is_valid() {
            return Err(TrackingError::UserInputError(format!(
                "Invalid location: {}",
                origin
            )));
        }

        let token = self.epoch.advance();
        tokio::spawn(load_eta(self.ctx.clone(), token, origin, destination));
        Ok(())
    }

    async fn deactivate(&mut self) {
        self.epoch.advance();
        self.ctx.map.write().await.clear();
        *self.ctx.board.write().await = None;
    }
}

async fn load_eta(ctx: EtaContext, token: EpochToken, origin: Position, destination: String) {
    let result = ctx.backend.smart_eta(origin, &destination).await;

    let mut map = ctx.map.write().await;
    if !token.is_current() {
        tracing::debug!(generation = token.value(), "Discarding stale ETA result");
        return;
    }

    let eta = match result {
        Ok(eta) => eta,
        Err(e) => {
            drop(map);
            let err = TrackingError::from(e);
            tracing::warn!(destination = %destination, error = %err, "ETA lookup failed");
            ctx.notifier
                .error(format!("Could not estimate arrival for {}: {}", destination, err));
            return;
        }
    };

    map.clear();
    map.upsert_marker(
        USER_MARKER,
        eta.user_location,
        MarkerContent::new(MarkerKind::User, "You", "Your location"),
    );

    let pickup = &eta.pickup_stop;
    let pickup_position = Position::new(pickup.lat, pickup.lng);
    map.upsert_marker(
        PICKUP_MARKER,
        pickup_position,
        MarkerContent::new(
            MarkerKind::Stop,
            pickup.name.clone(),
            format!(
                "Board here: {}\nWalk {} ({})",
                pickup.name,
                format_distance_km(pickup.distance_km),
                format_eta_minutes(pickup.walk_time_min)
            ),
        ),
    );

    let dest = &eta.destination_stop;
    map.upsert_marker(
        DESTINATION_MARKER,
        dest.position(),
        MarkerContent::new(MarkerKind::Destination, dest.name.clone(), dest.name.clone()),
    );

    let mut bounds = vec![eta.user_location, pickup_position, dest.position()];
    if let Some(transfer) = &eta.transfer {
        let stop = transfer.stop.position();
        map.upsert_marker(
            TRANSFER_MARKER,
            stop,
            MarkerContent::new(
                MarkerKind::Stop,
                transfer.stop.name.clone(),
                format!(
                    "Change at {} to {} ({} → {})",
                    transfer.stop.name, transfer.route.name, transfer.route.from, transfer.route.to
                ),
            ),
        );
        bounds.push(stop);
    }
    map.fit_bounds(&bounds, ctx.zoom);
    drop(map);

    let mut summary = format!(
        "Take {} from {}: about {} to {}",
        eta.bus_route.name,
        pickup.name,
        format_eta_minutes(eta.eta.total_min),
        dest.name
    );
    if let Some(bus) = &eta.live_bus {
        summary.push_str(&format!(
            " (bus {} is {} away, {} crowd)",
            bus.bus_reg,
            format_eta_minutes(bus.live_eta_min),
            occupancy_badge(bus.crowd_level).label
        ));
    }

    tracing::info!(
        destination = %destination,
        route = %eta.bus_route.id,
        total_min = eta.eta.total_min,
        "ETA ready"
    );
    *ctx.board.write().await = Some(eta);
    ctx.notifier.success(summary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{FakeBackend, Reply};
    use crate::backend::types::{
        EtaBreakdown, EtaLiveBus, EtaRoute, NamedPoint, PickupStop, Transfer, TransferRoute,
    };
    use crate::backend::{OccupancyLevel, OperationalStatus};
    use crate::map::MapView;
    use crate::notice::NoticeLevel;
    use std::time::Duration;

    fn sample_eta() -> SmartEta {
        SmartEta {
            user_location: Position::new(22.5726, 88.3639),
            pickup_stop: PickupStop {
                name: "Esplanade".into(),
                lat: 22.5641,
                lng: 88.3516,
                distance_km: 0.8,
                walk_time_min: 10.0,
            },
            destination_stop: NamedPoint {
                name: "New Town".into(),
                lat: 22.5920,
                lng: 88.4846,
            },
            bus_route: EtaRoute {
                id: "S12".into(),
                name: "S12".into(),
                from: "Howrah Station".into(),
                to: "New Town".into(),
                via: "Salt Lake".into(),
                fare_range: "₹10 - ₹35".into(),
                frequency_min: Some(10),
                transfer_note: None,
            },
            eta: EtaBreakdown {
                walk_time_min: 10.0,
                wait_time_min: 5.0,
                bus_travel_min: 32.0,
                total_min: 47.0,
                source: "formula".into(),
            },
            distance_km: 14.2,
            traffic_index: 1.2,
            traffic_source: "time_based".into(),
            hour_of_day: 9,
            live_bus: Some(EtaLiveBus {
                bus_reg: "WB1".into(),
                distance_km: 1.5,
                speed: 18.0,
                crowd_level: OccupancyLevel::Medium,
                status: OperationalStatus::Running,
                live_eta_min: 5.0,
            }),
            transfer: None,
        }
    }

    fn page(backend: &Arc<FakeBackend>) -> (EtaPage, tokio::sync::mpsc::UnboundedReceiver<crate::notice::Notice>) {
        let map = MapView::new("eta", Position::new(22.5726, 88.3639), 12).shared();
        let (notifier, rx) = Notifier::channel();
        let dyn_backend: Arc<dyn TransitBackend> = backend.clone();
        (EtaPage::new(dyn_backend, map, notifier, 13), rx)
    }

    fn eta_args(destination: &str) -> PageArgs {
        PageArgs::Eta {
            origin: Position::new(22.5726, 88.3639),
            destination: destination.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_eta_markers_and_summary() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_eta(Reply::Ok(sample_eta()));
        let (mut page, mut rx) = page(&backend);

        page.activate(eta_args("New Town")).await.unwrap();
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(
            notice.message,
            "Take S12 from Esplanade: about 47 min to New Town (bus WB1 is 5 min away, Medium crowd)"
        );

        let map = page.map().read().await;
        assert_eq!(
            map.marker_ids(),
            vec![DESTINATION_MARKER, PICKUP_MARKER, USER_MARKER]
        );
        assert!(page.board().read().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_stop_marked() {
        let backend = Arc::new(FakeBackend::new());
        let mut eta = sample_eta();
        eta.transfer = Some(Transfer {
            stop: NamedPoint {
                name: "Sealdah".into(),
                lat: 22.5675,
                lng: 88.3700,
            },
            route: TransferRoute {
                id: "AC20".into(),
                name: "AC20".into(),
                from: "Sealdah".into(),
                to: "Kolkata Airport".into(),
            },
        });
        backend.set_eta(Reply::Ok(eta));
        let (mut page, mut rx) = page(&backend);

        page.activate(eta_args("Airport")).await.unwrap();
        rx.recv().await.unwrap();
        let map = page.map().read().await;
        let transfer = map.marker(TRANSFER_MARKER).unwrap();
        assert!(transfer.content.popup.contains("Change at Sealdah to AC20"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_eta_after_leaving_is_discarded() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_eta(Reply::Ok(sample_eta()));
        backend.set_delay("eta", Duration::from_secs(3));
        let (mut page, _rx) = page(&backend);

        page.activate(eta_args("New Town")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        page.deactivate().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(page.map().read().await.marker_count(), 0);
        assert!(page.board().read().await.is_none());
    }

    #[tokio::test]
    async fn test_input_validation() {
        let backend = Arc::new(FakeBackend::new());
        let (mut page, _rx) = page(&backend);

        let err = page.activate(eta_args(" ")).await.unwrap_err();
        assert!(matches!(err, TrackingError::UserInputError(_)));

        let err = page
            .activate(PageArgs::Eta {
                origin: Position::new(123.0, 88.0),
                destination: "New Town".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::UserInputError(_)));
    }

    #[tokio::test]
    async fn test_backend_failure_notifies() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_eta(Reply::Down);
        let (mut page, mut rx) = page(&backend);

        page.activate(eta_args("New Town")).await.unwrap();
        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.starts_with("Could not estimate arrival for New Town"));
    }
}
