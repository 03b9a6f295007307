//! Tracking error taxonomy
//!
//! The polling loop, tracking sessions and pages all speak [`TrackingError`].
//! Lower layers ([`BackendError`], [`RoutingError`]) are folded into it.

use thiserror::Error;

use crate::backend::BackendError;
use crate::routing::RoutingError;

/// Errors seen by live views
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    /// Network hiccup; retried on the next natural tick
    #[error("Network failure: {0}")]
    TransientNetworkFailure(String),

    /// The tracked entity no longer exists
    #[error("No longer active: {0}")]
    EntityGone(String),

    /// Response did not have the expected shape; treated as transient
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Rejected before any request was made
    #[error("{0}")]
    UserInputError(String),
}

impl TrackingError {
    /// Whether the next poll tick may succeed where this one failed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TrackingError::TransientNetworkFailure(_) | TrackingError::MalformedResponse(_)
        )
    }

    /// Whether the user should be told about it
    pub fn is_user_visible(&self) -> bool {
        !self.is_recoverable()
    }
}

impl From<BackendError> for TrackingError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(message) => TrackingError::EntityGone(message),
            BackendError::Malformed(message) => TrackingError::MalformedResponse(message),
            other => TrackingError::TransientNetworkFailure(other.to_string()),
        }
    }
}

impl From<RoutingError> for TrackingError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::NoResult(_) | RoutingError::MissingApiKey => {
                TrackingError::UserInputError(err.to_string())
            }
            RoutingError::Malformed(message) => TrackingError::MalformedResponse(message),
            other => TrackingError::TransientNetworkFailure(other.to_string()),
        }
    }
}
