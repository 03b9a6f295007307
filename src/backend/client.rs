//! SmartTransit REST API Client
//!
//! HTTP client for the SmartTransit backend. Returns parsed JSON or a typed
//! [`BackendError`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::types::{
    CrowdEntry, CrowdLevels, LiveBus, LiveSnapshot, Position, PublicConfig, RouteDetail, SmartEta,
};
use super::TransitBackend;

/// SmartTransit backend client
pub struct BackendClient {
    client: Client,
    config: ClientConfig,
}

/// Configuration for the backend client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend (e.g., "http://127.0.0.1:8000")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl From<&crate::config::BackendConfig> for ClientConfig {
    fn from(config: &crate::config::BackendConfig) -> Self {
        Self {
            base_url: config.url.clone(),
            request_timeout_ms: config.request_timeout_secs * 1000,
        }
    }
}

impl BackendClient {
    /// Create a new backend client with the given configuration
    pub fn new(mut config: ClientConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;

        config.base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Check if the backend answers at all
    pub async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url("/"))
            .send()
            .await
            .map_err(classify)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::Unavailable)
        }
    }

    /// GET a path and decode the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let url = self.url(path);
        tracing::trace!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(classify)?;
            return serde_json::from_slice(&body)
                .map_err(|e| BackendError::Malformed(format!("{}: {}", path, e)));
        }

        let text = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(detail(&text, path))),
            StatusCode::TOO_MANY_REQUESTS => Err(BackendError::RateLimited),
            _ => Err(BackendError::Api {
                status: status.as_u16(),
                message: text,
            }),
        }
    }
}

#[async_trait]
impl TransitBackend for BackendClient {
    async fn live_buses(&self) -> Result<Vec<LiveBus>, BackendError> {
        let snapshot: LiveSnapshot = self.get_json("/bus/live", &[]).await?;
        Ok(snapshot.buses)
    }

    async fn bus(&self, bus_reg: &str) -> Result<LiveBus, BackendError> {
        let path = format!("/bus/{}", urlencoding::encode(bus_reg));
        match self.get_json(&path, &[]).await {
            // Any client-side rejection of a single-bus lookup means the trip is over
            Err(BackendError::Api { status, message }) if (400..500).contains(&status) => {
                Err(BackendError::NotFound(detail(&message, &path)))
            }
            other => other,
        }
    }

    async fn route(&self, route_id: &str) -> Result<RouteDetail, BackendError> {
        let path = format!("/routes/{}", urlencoding::encode(route_id));
        self.get_json(&path, &[]).await
    }

    async fn crowd_levels(&self) -> Result<Vec<CrowdEntry>, BackendError> {
        let levels: CrowdLevels = self.get_json("/crowd-levels", &[]).await?;
        Ok(levels.crowd_data)
    }

    async fn smart_eta(
        &self,
        origin: Position,
        destination: &str,
    ) -> Result<SmartEta, BackendError> {
        let query = [
            ("user_lat", origin.lat.to_string()),
            ("user_lng", origin.lng.to_string()),
            ("destination", destination.to_string()),
        ];
        self.get_json("/smart-eta", &query).await
    }

    async fn public_config(&self) -> Result<PublicConfig, BackendError> {
        self.get_json("/config", &[]).await
    }
}

/// Map a transport error onto the backend error kinds
fn classify(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::Unavailable
    } else {
        BackendError::Request(e)
    }
}

/// Pull FastAPI's `{"detail": "..."}` out of an error body
fn detail(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| fallback.to_string())
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when talking to the SmartTransit backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Rate limited")]
    RateLimited,
}
