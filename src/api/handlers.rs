//! HTTP request handlers

use super::types::{AckResponse, ErrorResponse, HealthResponse, WebhookEvent, WebhookPayload};
use super::AppState;
use crate::runtime::Inbound;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat platform callback
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

/// Handle every event in the batch, then acknowledge
async fn webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> Result<Json<AckResponse>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let received = payload.events.len();
    let events: Vec<Inbound> = payload
        .events
        .into_iter()
        .filter_map(WebhookEvent::into_inbound)
        .collect();
    tracing::debug!(received, messages = events.len(), "Webhook batch");

    state.dispatcher.handle_batch(events).await;
    Ok(Json(AckResponse::ok()))
}

// ============================================================
// Health & Version
// ============================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        active_sessions: state.dispatcher.active_sessions().await,
        authorized_senders: state.dispatcher.authorized_senders(),
    })
}

async fn get_version() -> &'static str {
    concat!("ledger-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        tracing::warn!(status = status.as_u16(), error = %message, "Rejected request");
        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
