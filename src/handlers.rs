use axum::{http::StatusCode, Json};
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::dispatcher::Dispatcher;

/// How long a transport message id is remembered for redelivery detection.
pub const SEEN_MESSAGE_TTL: Duration = Duration::from_secs(600);
pub const SEEN_MESSAGE_CAPACITY: u64 = 10_000;

/// Shared application state.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Command engine shared by every request.
    pub dispatcher: Arc<Dispatcher>,
    /// Fingerprints of recently handled transport messages.
    pub seen_messages: Cache<String, i64>,
}

impl AppState {
    pub fn new(config: Config, dispatcher: Arc<Dispatcher>) -> Self {
        let seen_messages = Cache::builder()
            .time_to_live(SEEN_MESSAGE_TTL)
            .max_capacity(SEEN_MESSAGE_CAPACITY)
            .build();

        Self {
            config,
            dispatcher,
            seen_messages,
        }
    }
}

/// GET /health
///
/// Liveness only; the registry is not contacted.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "isp-chat-intake",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
