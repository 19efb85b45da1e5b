use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;

use crate::engine::lifecycle::{self, StopTransition};
use crate::error::AppError;
use crate::models::stop::Stop;
use crate::models::StopId;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stops/:id", get(get_stop))
        .route("/stops/:id/start", post(start_stop))
        .route("/stops/:id/complete", post(complete_stop))
}

async fn get_stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StopId>,
) -> Result<Json<Stop>, AppError> {
    state
        .fleet
        .read()
        .await
        .stop(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("stop {id} not found")))
}

async fn start_stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StopId>,
) -> Result<Json<StopTransition>, AppError> {
    Ok(Json(lifecycle::start_stop(&state, id).await?))
}

async fn complete_stop(
    State(state): State<Arc<AppState>>,
    Path(id): Path<StopId>,
) -> Result<Json<StopTransition>, AppError> {
    Ok(Json(lifecycle::complete_stop(&state, id).await?))
}
