//! Polling Scheduler
//!
//! Runs recurring fetch-and-render cycles for live views. At most one poll is
//! active per view key; starting a poll for a key that already has one
//! cancels the old one first.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::TrackingError;

/// One fetch → render cycle of a live view
#[async_trait]
pub trait PollCycle: Send + Sync + 'static {
    type Snapshot: Send + 'static;

    /// Fetch the latest snapshot
    async fn fetch(&self) -> Result<Self::Snapshot, TrackingError>;

    /// Re-render the view from `snapshot` alone
    async fn render(&self, snapshot: Self::Snapshot);
}

struct ActivePoll {
    generation: u64,
    interval: Duration,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ActivePoll {
    /// Stop future ticks. An in-flight fetch is not aborted; its result is
    /// dropped by the generation check.
    fn cancel(self) {
        let _ = self.stop_tx.send(true);
        drop(self.handle);
    }
}

type PollTable = Arc<Mutex<HashMap<String, ActivePoll>>>;

/// Status of one active poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollStatus {
    pub view_key: String,
    pub generation: u64,
    pub interval: Duration,
}

pub struct PollingScheduler {
    polls: PollTable,
    next_generation: AtomicU64,
    running: Arc<AtomicUsize>,
}

impl PollingScheduler {
    pub fn new() -> Self {
        Self {
            polls: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            running: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Begin polling `view_key` every `interval`, first fetch immediately.
    /// Returns the generation of the new poll.
    pub async fn start_polling<C: PollCycle>(
        &self,
        view_key: impl Into<String>,
        interval: Duration,
        cycle: C,
    ) -> u64 {
        let view_key = view_key.into();
        let interval = super::clamp_interval(interval);
        let mut polls = self.polls.lock().await;

        if let Some(previous) = polls.remove(&view_key) {
            tracing::info!(
                view = %view_key,
                generation = previous.generation,
                "Replacing existing poll"
            );
            previous.cancel();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(run_poll(
            view_key.clone(),
            generation,
            interval,
            Arc::new(cycle),
            stop_rx,
            Registration {
                polls: Arc::clone(&self.polls),
                view_key: view_key.clone(),
                generation,
                _running: RunningGuard::new(Arc::clone(&self.running)),
            },
        ));

        tracing::info!(
            view = %view_key,
            generation,
            interval_ms = interval.as_millis() as u64,
            "Started polling"
        );

        polls.insert(
            view_key,
            ActivePoll {
                generation,
                interval,
                stop_tx,
                handle,
            },
        );

        generation
    }

    /// Cancel the poll for `view_key`. Once this returns, no result of the
    /// cancelled poll will be rendered.
    pub async fn stop_polling(&self, view_key: &str) -> bool {
        let removed = self.polls.lock().await.remove(view_key);
        match removed {
            Some(poll) => {
                tracing::info!(view = %view_key, generation = poll.generation, "Stopped polling");
                poll.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) {
        let drained: Vec<(String, ActivePoll)> = self.polls.lock().await.drain().collect();
        for (view_key, poll) in drained {
            tracing::debug!(view = %view_key, "Stopping poll");
            poll.cancel();
        }
    }

    pub async fn is_polling(&self, view_key: &str) -> bool {
        self.polls.lock().await.contains_key(view_key)
    }

    /// Number of registered polls
    pub async fn active_polls(&self) -> usize {
        self.polls.lock().await.len()
    }

    pub async fn status(&self) -> Vec<PollStatus> {
        let polls = self.polls.lock().await;
        let mut status: Vec<PollStatus> = polls
            .iter()
            .map(|(view_key, poll)| PollStatus {
                view_key: view_key.clone(),
                generation: poll.generation,
                interval: poll.interval,
            })
            .collect();
        status.sort_by(|a, b| a.view_key.cmp(&b.view_key));
        status
    }

    /// Poll tasks still alive, including cancelled ones finishing a fetch
    pub fn running_tasks(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for PollingScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        // Tasks hold the table, so their stop senders would outlive us
        if let Ok(mut polls) = self.polls.try_lock() {
            for (_, poll) in polls.drain() {
                poll.cancel();
            }
        }
    }
}

/// Counts live poll tasks
struct RunningGuard(Arc<AtomicUsize>);

impl RunningGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A poll task's claim on its table entry. Dropped when the task ends, even
/// by panic, and unregisters the entry if it still belongs to this task.
struct Registration {
    polls: PollTable,
    view_key: String,
    generation: u64,
    _running: RunningGuard,
}

fn remove_if_current(polls: &mut HashMap<String, ActivePoll>, view_key: &str, generation: u64) {
    if polls.get(view_key).map(|p| p.generation) == Some(generation) {
        tracing::warn!(view = %view_key, generation, "Poll task ended unexpectedly, unregistering");
        polls.remove(view_key);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Ok(mut polls) = self.polls.try_lock() {
            remove_if_current(&mut polls, &self.view_key, self.generation);
            return;
        }
        // Table busy: finish on the runtime
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let polls = Arc::clone(&self.polls);
            let view_key = std::mem::take(&mut self.view_key);
            let generation = self.generation;
            runtime.spawn(async move {
                remove_if_current(&mut *polls.lock().await, &view_key, generation);
            });
        }
    }
}

async fn run_poll<C: PollCycle>(
    view_key: String,
    generation: u64,
    interval: Duration,
    cycle: Arc<C>,
    mut stop_rx: watch::Receiver<bool>,
    registration: Registration,
) {
    let polls = &registration.polls;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        let outcome = cycle.fetch().await;

        // Held through render so stop_polling cannot interleave
        let table = polls.lock().await;
        let current = table.get(&view_key).map(|p| p.generation) == Some(generation);
        if !current {
            tracing::debug!(view = %view_key, generation, "Discarding stale poll result");
            break;
        }

        match outcome {
            Ok(snapshot) => cycle.render(snapshot).await,
            Err(e) if e.is_recoverable() => {
                tracing::warn!(view = %view_key, error = %e, "Poll failed, retrying next tick");
            }
            Err(e) => {
                tracing::error!(view = %view_key, error = %e, "Poll failed");
            }
        }
        drop(table);
    }

    tracing::trace!(view = %view_key, generation, "Poll task exited");
}
