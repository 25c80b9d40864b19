use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::coordinator::dispatch;
use crate::error::AppError;
use crate::models::UserId;
use crate::models::order::{DeliveryScope, Order};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:customer_id", get(get_order))
        .route("/orders/:customer_id/accept", post(accept_order))
        .route("/orders/:customer_id/complete", post(complete_order))
        .route("/orders/:customer_id/cancel", post(cancel_order))
        .route("/orders/:customer_id/rate", post(rate_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: i64,
    pub scope: DeliveryScope,
    pub vehicle: String,
    pub pickup: String,
    pub dropoff: String,
    pub when: String,
}

#[derive(Deserialize)]
pub struct ActorRequest {
    pub actor_id: i64,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub actor_id: i64,
    pub score: u8,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.vehicle.trim().is_empty() {
        return Err(AppError::BadRequest("vehicle cannot be empty".to_string()));
    }
    if payload.pickup.trim().is_empty() || payload.dropoff.trim().is_empty() {
        return Err(AppError::BadRequest(
            "pickup and dropoff cannot be empty".to_string(),
        ));
    }

    let order = dispatch::submit_order(
        &state,
        UserId(payload.customer_id),
        payload.scope,
        payload.vehicle,
        payload.pickup,
        payload.dropoff,
        payload.when,
    )
    .await?;
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .registry
        .get(UserId(customer_id))
        .ok_or_else(|| AppError::NotFound(format!("order {customer_id} not found")))?;
    Ok(Json(order))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i64>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<Order>, AppError> {
    let order = dispatch::accept(&state, UserId(customer_id), UserId(payload.actor_id)).await?;
    Ok(Json(order))
}

async fn complete_order(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i64>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<Order>, AppError> {
    let order = dispatch::complete(&state, UserId(customer_id), UserId(payload.actor_id)).await?;
    Ok(Json(order))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i64>,
    Json(payload): Json<ActorRequest>,
) -> Result<Json<Value>, AppError> {
    dispatch::cancel(&state, UserId(customer_id), UserId(payload.actor_id)).await?;
    Ok(Json(json!({ "status": "cancelled" })))
}

async fn rate_order(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<i64>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<Order>, AppError> {
    let order = dispatch::rate(
        &state,
        UserId(customer_id),
        UserId(payload.actor_id),
        payload.score,
    )
    .await?;
    Ok(Json(order))
}
