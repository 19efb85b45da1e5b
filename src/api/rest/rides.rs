use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;

use crate::engine::assignment::{create_ride as assign_new_ride, NewRide, RideAssignment};
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::models::ride::RideRequest;
use crate::models::RideId;
use crate::state::AppState;

const RECENT_RIDES_LIMIT: usize = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rides", post(create_ride).get(list_rides))
        .route("/rides/:id", get(get_ride))
        .route("/assignments", get(list_assignments))
}

async fn create_ride(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewRide>,
) -> Result<(StatusCode, Json<RideAssignment>), AppError> {
    let created = assign_new_ride(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_rides(State(state): State<Arc<AppState>>) -> Json<Vec<RideRequest>> {
    Json(state.fleet.read().await.recent_rides(RECENT_RIDES_LIMIT))
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<RideId>,
) -> Result<Json<RideRequest>, AppError> {
    state
        .fleet
        .read()
        .await
        .ride(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("ride {id} not found")))
}

async fn list_assignments(State(state): State<Arc<AppState>>) -> Json<Vec<Assignment>> {
    Json(state.fleet.read().await.assignments().to_vec())
}
