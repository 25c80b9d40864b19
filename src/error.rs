use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("order already claimed")]
    AlreadyClaimed,

    #[error("operation not valid in the current state")]
    WrongState,

    #[error("only the assigned driver may do this")]
    NotAssignedDriver,

    #[error("not authorized")]
    Unauthorized,

    #[error("order already rated")]
    AlreadyRated,

    #[error("completed orders cannot be cancelled")]
    AlreadyFinalized,

    #[error("driver has no phone on file")]
    DriverNotOnboarded,

    #[error("delivery failed: {0}")]
    Delivery(#[from] GatewayError),

    #[error("could not mint invite link: {0}")]
    LinkMinting(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyClaimed
            | AppError::WrongState
            | AppError::AlreadyRated
            | AppError::AlreadyFinalized => StatusCode::CONFLICT,
            AppError::NotAssignedDriver | AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::DriverNotOnboarded => StatusCode::PRECONDITION_FAILED,
            AppError::Delivery(_) | AppError::LinkMinting(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
