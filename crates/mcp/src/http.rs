//! HTTP binding for the MCP server.
//!
//! One POST endpoint carries envelopes. The HTTP status mirrors the error
//! class of the envelope; the body is always the envelope itself.

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use toolwire_core::config::ServerConfig;

use crate::error::McpError;
use crate::legacy::{self, LEGACY_CALL_PATH};
use crate::server::McpServer;
use crate::types::{error_codes, JsonRpcResponse};

/// Build the application router: envelope endpoint at `path`, the legacy
/// single-call endpoint, and `/health`.
pub fn router(server: Arc<McpServer>, path: &str, cors_origin: &str) -> Router {
    let mut app = Router::new()
        .route(path, post(handle_rpc))
        .route("/health", get(health));
    if path != LEGACY_CALL_PATH {
        app = app.route(LEGACY_CALL_PATH, post(legacy::handle_call));
    }
    app.layer(cors_layer(cors_origin)).with_state(server)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE]),
        Err(_) => {
            warn!(origin, "Invalid CORS origin, cross-origin requests disabled");
            CorsLayer::new()
        }
    }
}

/// HTTP status for an envelope.
pub fn status_for(response: &JsonRpcResponse) -> StatusCode {
    match response.error.as_ref().map(|e| e.code) {
        None => StatusCode::OK,
        Some(error_codes::INVALID_REQUEST | error_codes::INVALID_PARAMS) => StatusCode::BAD_REQUEST,
        Some(error_codes::METHOD_NOT_FOUND) => StatusCode::NOT_FOUND,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn handle_rpc(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    let response = match serde_json::from_slice::<Value>(&body) {
        Ok(raw) => server.handle_request(raw).await,
        Err(e) => {
            let err = McpError::Protocol(format!("body is not valid JSON: {}", e));
            JsonRpcResponse::failure(None, err.to_rpc_error())
        }
    };
    (status_for(&response), Json(response)).into_response()
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: String,
    pub tools: usize,
    pub version: String,
}

async fn health(State(server): State<Arc<McpServer>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: server.name().to_string(),
        tools: server.registry().len(),
        version: server.version().to_string(),
    })
}

/// Bind `config.bind_addr()` and serve until Ctrl-C.
pub async fn serve(server: Arc<McpServer>, config: &ServerConfig) -> anyhow::Result<()> {
    let app = router(server, &config.path, &config.cors_origin);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(addr = %addr, path = %config.path, "MCP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("MCP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
