//! Tracking Session
//!
//! Follows a single bus on the tracking map until the user stops, picks
//! another bus, or the backend reports the trip has ended.
//!
//! ```text
//! Idle ──start──▶ Tracking ──stop──▶ Idle
//!                    │
//!                    └──404──▶ Terminated ──start/stop──▶ ...
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::backend::TransitBackend;
use crate::error::TrackingError;
use crate::map::SharedMap;
use crate::polling::clamp_interval;
use crate::notice::Notifier;
use crate::presentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Tracking { target: String },
    /// The trip ended; the last known marker stays on the map
    Terminated { target: String, message: String },
}

impl SessionState {
    pub fn target(&self) -> Option<&str> {
        match self {
            SessionState::Idle => None,
            SessionState::Tracking { target } | SessionState::Terminated { target, .. } => {
                Some(target)
            }
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self, SessionState::Tracking { .. })
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time between fetches
    pub interval: Duration,
    /// Zoom used when following the bus
    pub zoom: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(crate::config::DEFAULT_TRACKING_INTERVAL_MS),
            zoom: 15,
        }
    }
}

struct SessionTimer {
    stop_tx: watch::Sender<bool>,
    _handle: JoinHandle<()>,
}

impl SessionTimer {
    fn cancel(self) {
        let _ = self.stop_tx.send(true);
    }
}

struct SessionInner {
    state: SessionState,
    generation: u64,
    timer: Option<SessionTimer>,
}

#[derive(Clone)]
struct SessionContext {
    backend: Arc<dyn TransitBackend>,
    map: SharedMap,
    notifier: Notifier,
    config: SessionConfig,
    inner: Arc<Mutex<SessionInner>>,
}

/// Single-bus tracker bound to one map view
pub struct TrackingSession {
    ctx: SessionContext,
}

impl TrackingSession {
    pub fn new(
        backend: Arc<dyn TransitBackend>,
        map: SharedMap,
        notifier: Notifier,
        mut config: SessionConfig,
    ) -> Self {
        config.interval = clamp_interval(config.interval);
        Self {
            ctx: SessionContext {
                backend,
                map,
                notifier,
                config,
                inner: Arc::new(Mutex::new(SessionInner {
                    state: SessionState::Idle,
                    generation: 0,
                    timer: None,
                })),
            },
        }
    }

    /// Start following `bus_reg`, replacing whatever was tracked before.
    ///
    /// Blank input is rejected before any request is made.
    pub async fn start(&self, bus_reg: &str) -> Result<(), TrackingError> {
        let target = normalize_bus_reg(bus_reg)?;

        let mut inner = self.ctx.inner.lock().await;
        teardown(&self.ctx, &mut inner).await;

        inner.generation += 1;
        let generation = inner.generation;
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_tracking(
            self.ctx.clone(),
            target.clone(),
            generation,
            stop_rx,
        ));

        tracing::info!(bus = %target, generation, "Tracking started");
        inner.timer = Some(SessionTimer {
            stop_tx,
            _handle: handle,
        });
        inner.state = SessionState::Tracking { target };
        Ok(())
    }

    /// Stop tracking and remove the marker
    pub async fn stop(&self) {
        let mut inner = self.ctx.inner.lock().await;
        if inner.state != SessionState::Idle {
            tracing::info!(bus = ?inner.state.target(), "Tracking stopped");
        }
        teardown(&self.ctx, &mut inner).await;
    }

    pub async fn state(&self) -> SessionState {
        self.ctx.inner.lock().await.state.clone()
    }

    pub async fn target(&self) -> Option<String> {
        self.ctx.inner.lock().await.state.target().map(str::to_string)
    }

    pub async fn has_timer(&self) -> bool {
        self.ctx.inner.lock().await.timer.is_some()
    }

    pub fn map(&self) -> &SharedMap {
        &self.ctx.map
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.ctx.inner.try_lock() {
            inner.generation += 1;
            if let Some(timer) = inner.timer.take() {
                timer.cancel();
            }
        }
    }
}

fn normalize_bus_reg(input: &str) -> Result<String, TrackingError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TrackingError::UserInputError(
            "Please enter a bus number".to_string(),
        ));
    }
    Ok(trimmed.to_uppercase())
}

/// Back to `Idle`: stop the timer, orphan in-flight fetches, drop the marker
async fn teardown(ctx: &SessionContext, inner: &mut SessionInner) {
    inner.generation += 1;
    if let Some(timer) = inner.timer.take() {
        timer.cancel();
    }
    if let Some(target) = inner.state.target() {
        ctx.map.write().await.remove_marker(target);
    }
    inner.state = SessionState::Idle;
}

async fn run_tracking(
    ctx: SessionContext,
    target: String,
    generation: u64,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(ctx.config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut route_label: Option<Option<String>> = None;

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        let outcome = ctx.backend.bus(&target).await.map_err(TrackingError::from);

        if let (Ok(bus), None) = (&outcome, &route_label) {
            let label = match ctx.backend.route(&bus.route_id).await {
                Ok(detail) => Some(detail.route.label()),
                Err(e) => {
                    tracing::debug!(bus = %target, route = %bus.route_id, error = %e, "Route label unavailable");
                    None
                }
            };
            route_label = Some(label);
        }

        let mut inner = ctx.inner.lock().await;
        if inner.generation != generation {
            tracing::debug!(bus = %target, generation, "Discarding stale tracking result");
            break;
        }

        match outcome {
            Ok(bus) => {
                let position = bus.position();
                let label = route_label.as_ref().and_then(|l| l.as_deref());
                let content = presentation::bus_marker_content(&bus, label);
                let mut map = ctx.map.write().await;
                map.upsert_marker(&target, position, content);
                map.focus(position, ctx.config.zoom);
                tracing::trace!(bus = %target, position = %position, "Tracking update");
            }
            Err(TrackingError::EntityGone(detail)) => {
                let message = format!("Bus {} is no longer active", target);
                tracing::info!(bus = %target, detail = %detail, "Trip ended");
                inner.timer = None;
                inner.state = SessionState::Terminated {
                    target: target.clone(),
                    message: message.clone(),
                };
                ctx.notifier.error(message);
                break;
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(bus = %target, error = %e, "Tracking fetch failed, retrying next tick");
            }
            Err(e) => {
                tracing::error!(bus = %target, error = %e, "Tracking fetch failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{bus, s12, FakeBackend, Reply};
    use crate::backend::Position;
    use crate::map::MapView;
    use crate::notice::NoticeLevel;

    const TICK: Duration = Duration::from_secs(5);

    fn session(backend: &Arc<FakeBackend>) -> (TrackingSession, tokio::sync::mpsc::UnboundedReceiver<crate::notice::Notice>) {
        let map = MapView::new("tracking", Position::new(22.5726, 88.3639), 12).shared();
        let (notifier, rx) = Notifier::channel();
        let backend: Arc<dyn TransitBackend> = backend.clone();
        let session = TrackingSession::new(
            backend,
            map,
            notifier,
            SessionConfig {
                interval: TICK,
                zoom: 15,
            },
        );
        (session, rx)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_trip_end_terminates_and_keeps_marker() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.57, 88.36)));
        backend.push_bus("WB1", Reply::Gone);
        let (session, mut notices) = session(&backend);

        session.start("WB1").await.unwrap();
        settle().await;
        assert!(session.state().await.is_tracking());
        {
            let map = session.map().read().await;
            assert!(map.has_marker("WB1"));
            assert_eq!(map.viewport().zoom, 15);
            assert_eq!(map.viewport().center, Position::new(22.57, 88.36));
        }

        tokio::time::sleep(TICK).await;
        assert_eq!(
            session.state().await,
            SessionState::Terminated {
                target: "WB1".into(),
                message: "Bus WB1 is no longer active".into(),
            }
        );
        assert!(!session.has_timer().await);
        assert!(session.map().read().await.has_marker("WB1"));

        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Bus WB1 is no longer active");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.bus_calls("WB1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_rejected_without_request() {
        let backend = Arc::new(FakeBackend::new());
        let (session, _rx) = session(&backend);

        let err = session.start("   ").await.unwrap_err();
        assert!(matches!(err, TrackingError::UserInputError(_)));
        assert_eq!(session.state().await, SessionState::Idle);
        assert!(!session.has_timer().await);
        settle().await;
        assert_eq!(backend.bus_calls(""), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_is_normalized() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.57, 88.36)));
        let (session, _rx) = session(&backend);

        session.start("  wb1 ").await.unwrap();
        settle().await;
        assert_eq!(session.target().await.as_deref(), Some("WB1"));
        assert_eq!(backend.bus_calls("WB1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_leaves_one_timer_and_one_marker() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.57, 88.36)));
        backend.push_bus("WB2", Reply::Ok(bus("WB2", 22.60, 88.40)));
        let (session, _rx) = session(&backend);

        session.start("WB1").await.unwrap();
        settle().await;
        session.start("WB2").await.unwrap();
        tokio::time::sleep(Duration::from_secs(12)).await;

        assert!(session.has_timer().await);
        assert_eq!(session.map().read().await.marker_ids(), vec!["WB2".to_string()]);
        assert_eq!(backend.bus_calls("WB1"), 1);
        assert_eq!(backend.bus_calls("WB2"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_ignored() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.57, 88.36)));
        backend.set_delay("WB1", Duration::from_secs(3));
        backend.push_bus("WB2", Reply::Ok(bus("WB2", 22.60, 88.40)));
        let (session, _rx) = session(&backend);

        session.start("WB1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.start("WB2").await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;

        let map = session.map().read().await;
        assert!(!map.has_marker("WB1"));
        assert!(map.has_marker("WB2"));
        assert_eq!(map.viewport().center, Position::new(22.60, 88.40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_keeps_tracking() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_bus("WB1", Reply::Down);
        backend.push_bus("WB1", Reply::Garbled);
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.57, 88.36)));
        let (session, _rx) = session(&backend);

        session.start("WB1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(session.state().await.is_tracking());
        assert!(!session.map().read().await.has_marker("WB1"));

        tokio::time::sleep(TICK).await;
        assert!(session.state().await.is_tracking());
        assert!(session.map().read().await.has_marker("WB1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_removes_marker() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.57, 88.36)));
        let (session, _rx) = session(&backend);

        session.start("WB1").await.unwrap();
        settle().await;
        session.stop().await;

        assert_eq!(session.state().await, SessionState::Idle);
        assert!(!session.has_timer().await);
        assert_eq!(session.map().read().await.marker_count(), 0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(backend.bus_calls("WB1"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_label_in_popup() {
        let backend = Arc::new(FakeBackend::new());
        backend.add_route(s12());
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.57, 88.36)));
        let (session, _rx) = session(&backend);

        session.start("WB1").await.unwrap();
        settle().await;
        let map = session.map().read().await;
        let marker = map.marker("WB1").unwrap();
        assert!(marker.content.popup.contains("S12: Howrah Station → New Town"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_status_keeps_tracking() {
        let backend = Arc::new(FakeBackend::new());
        let mut odd = bus("WB1", 22.57, 88.36);
        odd.status = crate::backend::OperationalStatus::Unknown;
        backend.push_bus("WB1", Reply::Ok(odd));
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.58, 88.37)));
        let (session, _rx) = session(&backend);

        session.start("WB1").await.unwrap();
        settle().await;
        assert!(session.map().read().await.has_marker("WB1"));

        tokio::time::sleep(TICK).await;
        assert_eq!(backend.bus_calls("WB1"), 2);
        assert!(session.state().await.is_tracking());
        assert!(session.has_timer().await);
        let map = session.map().read().await;
        assert_eq!(map.marker("WB1").unwrap().position, Position::new(22.58, 88.37));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_floor() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.57, 88.36)));
        backend.push_bus("WB1", Reply::Ok(bus("WB1", 22.58, 88.37)));
        let map = MapView::new("tracking", Position::new(22.5726, 88.3639), 12).shared();
        let (notifier, _rx) = Notifier::channel();
        let session = TrackingSession::new(
            backend.clone(),
            map,
            notifier,
            SessionConfig {
                interval: Duration::ZERO,
                zoom: 15,
            },
        );

        session.start("WB1").await.unwrap();
        settle().await;
        assert_eq!(backend.bus_calls("WB1"), 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(backend.bus_calls("WB1"), 2);
        assert!(session.state().await.is_tracking());
        assert!(session.has_timer().await);
    }
}
