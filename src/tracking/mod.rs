//! Entity tracking: follow one bus on a dedicated map until its trip ends.

mod session;

pub use session::{SessionConfig, SessionState, TrackingSession};
