use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::coordinator::subscription::{self, MemberStatus};
use crate::error::AppError;
use crate::models::subscription::{DriverDetails, Subscription};
use crate::models::{ChatId, UserId};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers/:driver_id/onboarding", post(complete_onboarding))
        .route("/drivers/:driver_id/receipt", post(submit_receipt))
        .route("/drivers/:driver_id/approve", post(approve_payment))
        .route("/drivers/:driver_id/reject", post(reject_payment))
        .route("/subscriptions/:driver_id", get(get_subscription))
        .route("/membership", post(membership_changed))
}

#[derive(Deserialize)]
pub struct OnboardingRequest {
    pub name: String,
    pub vehicle_make: String,
    pub plate: String,
    pub phone: String,
}

#[derive(Deserialize)]
pub struct ReceiptRequest {
    pub attachment_id: Uuid,
}

#[derive(Deserialize)]
pub struct AdminRequest {
    pub admin_id: i64,
}

#[derive(Deserialize)]
pub struct MembershipRequest {
    pub group_id: i64,
    pub user_id: i64,
    pub old_status: MemberStatus,
    pub new_status: MemberStatus,
}

async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<i64>,
    Json(payload): Json<OnboardingRequest>,
) -> Result<Json<Subscription>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if payload.phone.trim().is_empty() {
        return Err(AppError::BadRequest("phone cannot be empty".to_string()));
    }

    let subscription = subscription::complete_onboarding(
        &state,
        UserId(driver_id),
        DriverDetails {
            name: payload.name,
            vehicle_make: payload.vehicle_make,
            plate: payload.plate,
            phone: payload.phone,
        },
    )
    .await?;
    Ok(Json(subscription))
}

async fn submit_receipt(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<i64>,
    Json(payload): Json<ReceiptRequest>,
) -> Result<Json<Value>, AppError> {
    subscription::submit_receipt(&state, UserId(driver_id), payload.attachment_id).await?;
    Ok(Json(json!({ "status": "forwarded" })))
}

async fn approve_payment(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<i64>,
    Json(payload): Json<AdminRequest>,
) -> Result<Json<Value>, AppError> {
    subscription::approve(&state, UserId(driver_id), UserId(payload.admin_id)).await?;
    Ok(Json(json!({ "status": "approved" })))
}

async fn reject_payment(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<i64>,
    Json(payload): Json<AdminRequest>,
) -> Result<Json<Value>, AppError> {
    subscription::reject(&state, UserId(driver_id), UserId(payload.admin_id)).await?;
    Ok(Json(json!({ "status": "rejected" })))
}

async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<i64>,
) -> Result<Json<Subscription>, AppError> {
    let record = state
        .subscriptions
        .get(UserId(driver_id))
        .ok_or_else(|| AppError::NotFound(format!("no subscription for driver {driver_id}")))?;
    Ok(Json(record))
}

async fn membership_changed(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MembershipRequest>,
) -> Json<Value> {
    subscription::membership_changed(
        &state,
        ChatId(payload.group_id),
        UserId(payload.user_id),
        payload.old_status,
        payload.new_status,
    )
    .await;
    Json(json!({ "status": "ok" }))
}
