pub mod drivers;
pub mod orders;
pub mod ws;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router, extract::State};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::models::UserId;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(orders::router())
        .merge(drivers::router())
        .route("/profiles", post(upsert_profile))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct UpsertProfileRequest {
    user_id: i64,
    name: String,
    phone: Option<String>,
}

async fn upsert_profile(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpsertProfileRequest>,
) -> StatusCode {
    state
        .profiles
        .upsert(UserId(payload.user_id), payload.name, payload.phone);
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    orders: usize,
    subscriptions: usize,
    profiles: usize,
    pending_invites: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        orders: state.registry.len(),
        subscriptions: state.subscriptions.len(),
        profiles: state.profiles.len(),
        pending_invites: state.pending_invites.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
