//! Application assembly
//!
//! Wires the backend client, routing provider, scheduler, map views and
//! pages together from a [`Config`].

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::backend::{BackendClient, BackendError, ClientConfig, TransitBackend};
use crate::config::Config;
use crate::map::{MapView, SharedMap};
use crate::notice::{Notice, Notifier};
use crate::polling::PollingScheduler;
use crate::routing::{OrsClient, OrsConfig, RoutingError};
use crate::tracking::{SessionConfig, TrackingSession};
use crate::views::{
    CrowdBoard, CrowdPage, EtaBoard, EtaPage, HomePage, JourneyPage, JourneyProviders,
    LiveMapPage, PageArgs, PageController, PageId, TrackPage, ViewError,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Backend client: {0}")]
    Backend(#[from] BackendError),

    #[error("Routing client: {0}")]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    View(#[from] ViewError),
}

/// One map per view
#[derive(Clone)]
pub struct AppMaps {
    pub live: SharedMap,
    pub tracking: SharedMap,
    pub journey: SharedMap,
    pub eta: SharedMap,
}

impl AppMaps {
    fn new(config: &Config) -> Self {
        let center = config.map.center();
        let zoom = config.map.default_zoom;
        Self {
            live: MapView::new("live", center, zoom).shared(),
            tracking: MapView::new("tracking", center, zoom).shared(),
            journey: MapView::new("journey", center, zoom).shared(),
            eta: MapView::new("eta", center, zoom).shared(),
        }
    }
}

pub struct TransitApp {
    config: Config,
    scheduler: Arc<PollingScheduler>,
    maps: AppMaps,
    eta_board: EtaBoard,
    crowd_board: CrowdBoard,
    controller: PageController,
    notices: Option<UnboundedReceiver<Notice>>,
}

impl TransitApp {
    /// Build HTTP clients from `config`. An empty ORS key is fetched from the
    /// backend; journeys stay unavailable if that fails.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let backend = BackendClient::new(ClientConfig::from(&config.backend))?;

        let mut ors = OrsClient::new(OrsConfig::from(&config.routing))?;
        if !ors.has_api_key() {
            match backend.public_config().await {
                Ok(public) if !public.ors_key.is_empty() => {
                    tracing::info!("Using routing key from backend config");
                    ors.set_api_key(public.ors_key);
                }
                Ok(_) => tracing::warn!("Backend has no routing key; journeys unavailable"),
                Err(e) => {
                    tracing::warn!(error = %e, "Could not fetch backend config; journeys unavailable")
                }
            }
        }

        let backend: Arc<dyn TransitBackend> = Arc::new(backend);
        let providers = JourneyProviders::from_client(Arc::new(ors));
        Ok(Self::with_providers(config, backend, providers))
    }

    /// Assemble around existing providers
    pub fn with_providers(
        config: Config,
        backend: Arc<dyn TransitBackend>,
        providers: JourneyProviders,
    ) -> Self {
        let (notifier, notices) = Notifier::channel();
        let scheduler = Arc::new(PollingScheduler::new());
        let maps = AppMaps::new(&config);

        let session = TrackingSession::new(
            Arc::clone(&backend),
            Arc::clone(&maps.tracking),
            notifier.clone(),
            SessionConfig {
                interval: config.polling.tracking_interval(),
                zoom: config.map.tracking_zoom,
            },
        );
        let eta = EtaPage::new(
            Arc::clone(&backend),
            Arc::clone(&maps.eta),
            notifier.clone(),
            config.map.journey_zoom,
        );
        let crowd = CrowdPage::new(Arc::clone(&backend), notifier.clone());
        let eta_board = eta.board();
        let crowd_board = crowd.board();

        let controller = PageController::new()
            .with_page(Box::new(HomePage))
            .with_page(Box::new(LiveMapPage::new(
                Arc::clone(&backend),
                Arc::clone(&scheduler),
                Arc::clone(&maps.live),
                config.polling.live_interval(),
            )))
            .with_page(Box::new(TrackPage::new(session)))
            .with_page(Box::new(JourneyPage::new(
                providers,
                Arc::clone(&maps.journey),
                notifier.clone(),
                config.map.journey_zoom,
            )))
            .with_page(Box::new(eta))
            .with_page(Box::new(crowd));

        Self {
            config,
            scheduler,
            maps,
            eta_board,
            crowd_board,
            controller,
            notices: Some(notices),
        }
    }

    pub async fn navigate(&mut self, page: PageId, args: PageArgs) -> Result<(), AppError> {
        Ok(self.controller.navigate(page, args).await?)
    }

    pub fn active_page(&self) -> Option<PageId> {
        self.controller.active()
    }

    /// Receiver for user-visible notices; can be taken once
    pub fn take_notices(&mut self) -> Option<UnboundedReceiver<Notice>> {
        self.notices.take()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn maps(&self) -> &AppMaps {
        &self.maps
    }

    pub fn eta_board(&self) -> EtaBoard {
        Arc::clone(&self.eta_board)
    }

    pub fn crowd_board(&self) -> CrowdBoard {
        Arc::clone(&self.crowd_board)
    }

    pub fn scheduler(&self) -> &Arc<PollingScheduler> {
        &self.scheduler
    }

    /// Leave the current page and stop every poll
    pub async fn shutdown(&mut self) {
        self.controller.shutdown().await;
        self.scheduler.stop_all().await;
    }
}
