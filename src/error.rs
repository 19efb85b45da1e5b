use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::stop::StopStatus;
use crate::models::{BuggyId, PoiId, StopId};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("no active buggies available")]
    NoActiveBuggies,

    #[error("no route from poi {from} to poi {to}")]
    UnreachablePoi { from: PoiId, to: PoiId },

    #[error("stop {stop_id} cannot {action} while {from:?}")]
    InvalidTransition {
        stop_id: StopId,
        from: StopStatus,
        action: &'static str,
    },

    #[error("stop {stop_id} is not next in sequence (next is {next:?})")]
    OutOfOrderStop {
        stop_id: StopId,
        next: Option<StopId>,
    },

    #[error("buggy {buggy_id} cannot carry {requested} more guests ({projected} of {capacity} seats taken)")]
    CapacityExceeded {
        buggy_id: BuggyId,
        requested: u32,
        projected: u32,
        capacity: u32,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NoActiveBuggies => "NO_ACTIVE_BUGGIES",
            AppError::UnreachablePoi { .. } => "UNREACHABLE_POI",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::OutOfOrderStop { .. } => "OUT_OF_ORDER_STOP",
            AppError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            AppError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::NoActiveBuggies => StatusCode::BAD_REQUEST,
            AppError::UnreachablePoi { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_)
            | AppError::InvalidTransition { .. }
            | AppError::OutOfOrderStop { .. }
            | AppError::CapacityExceeded { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
