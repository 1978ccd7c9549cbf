//! REST API Server for the comparison agent
//!
//! Thin HTTP plumbing: JSON-RPC endpoint, legacy plain endpoint, health.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::a2a::{A2aHandler, JsonRpcResponse, INTERNAL_ERROR};
use crate::models::ConversationHistory;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentRequest {
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentResponse {
    Answer { response: String },
    Failure { error: String },
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub handler: Arc<A2aHandler>,
}

/// =============================
/// Health Endpoints
/// =============================

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "msg": "server running. use /agent or /a2a/agent to call agent"
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// JSON-RPC Endpoint
/// =============================

async fn rpc_handler(
    State(state): State<ApiState>,
    body: Bytes,
) -> (StatusCode, Json<JsonRpcResponse>) {
    let response = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(value) => state.handler.handle(value).await,
        Err(e) => JsonRpcResponse::invalid_request(
            serde_json::Value::Null,
            format!("Invalid Request: body is not valid JSON: {}", e),
        ),
    };

    let status = match response.error_code() {
        Some(INTERNAL_ERROR) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };

    (status, Json(response))
}

/// =============================
/// Legacy Plain Endpoint
/// =============================

async fn agent_handler(
    State(state): State<ApiState>,
    Json(req): Json<AgentRequest>,
) -> Json<AgentResponse> {
    info!("Received agent request");

    let agent = state.handler.agent().clone();
    let input = req.input;
    let joined =
        tokio::spawn(async move { agent.run(ConversationHistory::new(), &input).await }).await;

    match joined {
        Ok((response, _)) => Json(AgentResponse::Answer { response }),
        Err(e) => Json(AgentResponse::Failure {
            error: e.to_string(),
        }),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(handler: Arc<A2aHandler>) -> Router {
    let state = ApiState { handler };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/agent", post(agent_handler))
        .route("/a2a/agent", post(rpc_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    handler: Arc<A2aHandler>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(handler);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
