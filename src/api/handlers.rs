//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    Json,
};

use crate::cache::CacheKey;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::gateway::{Gateway, GatewayStats};
use crate::models::{ChatPayload, GenerateRequest, GenerateResponse, HealthResponse};

/// Client identifier used when neither the body nor the connection names one
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Gateway::from_config(config)?))
    }
}

/// Explicit `client_id` from the body, else the peer IP, else [`ANONYMOUS_CLIENT`].
fn client_id(requested: Option<&str>, peer: Option<SocketAddr>) -> String {
    requested
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

/// Key over everything that changes the generated text.
fn cache_key(payload: &ChatPayload) -> Result<CacheKey> {
    let messages = serde_json::to_string(&payload.messages)
        .map_err(|e| Error::InvalidRequest(e.to_string()))?;
    Ok(CacheKey::builder()
        .field("messages", messages)
        .field("model", payload.model.as_str())
        .field("temperature", payload.temperature.to_string())
        .field("max_tokens", payload.max_tokens.to_string())
        .build())
}

/// Handler for POST /generate
pub async fn generate_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(Error::InvalidRequest(error_msg));
    }

    let mut payload = state.gateway.payload(req.messages);
    if let Some(model) = req.model {
        payload.model = model;
    }
    if let Some(temperature) = req.temperature {
        payload.temperature = temperature;
    }
    if let Some(max_tokens) = req.max_tokens {
        payload.max_tokens = max_tokens;
    }

    let client = client_id(req.client_id.as_deref(), peer.map(|ConnectInfo(addr)| addr));
    let key = cache_key(&payload)?;
    let generated = state.gateway.generate(&client, &key, &payload).await?;

    Ok(Json(generated.into()))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<GatewayStats> {
    Json(state.gateway.stats().await)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_breaker(state.gateway.breaker().state()))
}
