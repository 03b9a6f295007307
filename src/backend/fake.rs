//! Scripted in-memory backend for tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::types::*;
use super::{BackendError, TransitBackend};

/// Scripted outcome of one backend call
#[derive(Debug, Clone)]
pub(crate) enum Reply<T> {
    Ok(T),
    /// 404 / trip ended
    Gone,
    /// Connection refused
    Down,
    /// Body did not decode
    Garbled,
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T, BackendError> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Gone => Err(BackendError::NotFound("Bus not found or trip ended".into())),
            Reply::Down => Err(BackendError::Unavailable),
            Reply::Garbled => Err(BackendError::Malformed("unexpected shape".into())),
        }
    }
}

/// Pop the next scripted reply; the last one repeats forever
fn next_reply<T: Clone>(queue: &mut VecDeque<Reply<T>>) -> Option<Reply<T>> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    live: Mutex<VecDeque<Reply<Vec<LiveBus>>>>,
    buses: Mutex<HashMap<String, VecDeque<Reply<LiveBus>>>>,
    /// Artificial latency keyed by bus reg, or "live" for the snapshot
    delays: Mutex<HashMap<String, Duration>>,
    routes: Mutex<HashMap<String, RouteInfo>>,
    crowd: Mutex<Vec<CrowdEntry>>,
    eta: Mutex<Option<Reply<SmartEta>>>,
    live_calls: AtomicUsize,
    bus_calls: Mutex<HashMap<String, usize>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_live(&self, reply: Reply<Vec<LiveBus>>) {
        self.live.lock().unwrap().push_back(reply);
    }

    pub fn push_bus(&self, bus_reg: &str, reply: Reply<LiveBus>) {
        self.buses
            .lock()
            .unwrap()
            .entry(bus_reg.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn set_delay(&self, key: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(key.to_string(), delay);
    }

    pub fn add_route(&self, route: RouteInfo) {
        self.routes.lock().unwrap().insert(route.id.clone(), route);
    }

    pub fn set_crowd(&self, rows: Vec<CrowdEntry>) {
        *self.crowd.lock().unwrap() = rows;
    }

    pub fn set_eta(&self, reply: Reply<SmartEta>) {
        *self.eta.lock().unwrap() = Some(reply);
    }

    pub fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    pub fn bus_calls(&self, bus_reg: &str) -> usize {
        self.bus_calls
            .lock()
            .unwrap()
            .get(bus_reg)
            .copied()
            .unwrap_or(0)
    }

    async fn latency(&self, key: &str) {
        let delay = self.delays.lock().unwrap().get(key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl TransitBackend for FakeBackend {
    async fn live_buses(&self) -> Result<Vec<LiveBus>, BackendError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        let reply = next_reply(&mut self.live.lock().unwrap());
        self.latency("live").await;
        reply.unwrap_or(Reply::Ok(Vec::new())).into_result()
    }

    async fn bus(&self, bus_reg: &str) -> Result<LiveBus, BackendError> {
        *self
            .bus_calls
            .lock()
            .unwrap()
            .entry(bus_reg.to_string())
            .or_default() += 1;
        let reply = self
            .buses
            .lock()
            .unwrap()
            .get_mut(bus_reg)
            .and_then(next_reply);
        self.latency(bus_reg).await;
        reply.unwrap_or(Reply::Gone).into_result()
    }

    async fn route(&self, route_id: &str) -> Result<RouteDetail, BackendError> {
        let route = self.routes.lock().unwrap().get(route_id).cloned();
        route
            .map(|route| RouteDetail {
                route,
                stops: Vec::new(),
            })
            .ok_or_else(|| BackendError::NotFound("Route not found".into()))
    }

    async fn crowd_levels(&self) -> Result<Vec<CrowdEntry>, BackendError> {
        Ok(self.crowd.lock().unwrap().clone())
    }

    async fn smart_eta(
        &self,
        _origin: Position,
        _destination: &str,
    ) -> Result<SmartEta, BackendError> {
        let reply = self.eta.lock().unwrap().clone();
        self.latency("eta").await;
        reply.unwrap_or(Reply::Gone).into_result()
    }

    async fn public_config(&self) -> Result<PublicConfig, BackendError> {
        Ok(PublicConfig::default())
    }
}

/// A running bus at the given position
pub(crate) fn bus(bus_reg: &str, lat: f64, lng: f64) -> LiveBus {
    LiveBus {
        bus_reg: bus_reg.to_string(),
        route_id: "S12".to_string(),
        latitude: lat,
        longitude: lng,
        speed: 18.0,
        passenger_count: 10,
        occupancy: OccupancyLevel::Low,
        status: OperationalStatus::Running,
        delay_reason: None,
        route_name: None,
        route_info: None,
        last_update: None,
    }
}

pub(crate) fn s12() -> RouteInfo {
    RouteInfo {
        id: "S12".into(),
        name: "S12".into(),
        from: "Howrah Station".into(),
        to: "New Town".into(),
        via: "Salt Lake".into(),
        fare_min: Some(10.0),
        fare_max: Some(35.0),
        frequency_min: Some(10),
    }
}
