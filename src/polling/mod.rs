//! Polling primitives: the per-view scheduler and epoch tokens for one-shot loads.

mod epoch;
mod scheduler;

pub use epoch::{Epoch, EpochToken};
pub use scheduler::{PollCycle, PollStatus, PollingScheduler};

use std::time::Duration;

use crate::config::MIN_POLL_INTERVAL_MS;

/// Raise `interval` to the poll floor; `tokio::time::interval` rejects zero
pub fn clamp_interval(interval: Duration) -> Duration {
    interval.max(Duration::from_millis(MIN_POLL_INTERVAL_MS))
}
