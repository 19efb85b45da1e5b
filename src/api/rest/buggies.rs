use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::error::AppError;
use crate::models::buggy::{Buggy, BuggyStatus};
use crate::models::stop::Stop;
use crate::models::{BuggyId, DriverId, PoiId};
use crate::state::AppState;
use crate::store::NewBuggy;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/buggies", post(create_buggy).get(list_buggies))
        .route("/buggies/:id", get(get_buggy).delete(delete_buggy))
        .route("/buggies/:id/status", patch(update_buggy_status))
        .route("/buggies/:id/location", patch(update_buggy_location))
        .route("/buggies/:id/driver", patch(update_buggy_driver))
        .route("/buggies/:id/route", get(buggy_route))
}

#[derive(Deserialize)]
pub struct CreateBuggyRequest {
    pub code: String,
    pub display_name: String,
    pub capacity: u32,
    #[serde(default = "default_status")]
    pub status: BuggyStatus,
    #[serde(default)]
    pub current_poi: Option<PoiId>,
    #[serde(default)]
    pub driver: Option<DriverId>,
}

fn default_status() -> BuggyStatus {
    BuggyStatus::Inactive
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BuggyStatus,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub poi: Option<PoiId>,
}

#[derive(Deserialize)]
pub struct UpdateDriverRequest {
    pub driver: Option<DriverId>,
}

async fn create_buggy(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBuggyRequest>,
) -> Result<(StatusCode, Json<Buggy>), AppError> {
    if payload.display_name.trim().is_empty() {
        return Err(AppError::BadRequest("display_name cannot be empty".to_string()));
    }

    let buggy = state.fleet.write().await.create_buggy(NewBuggy {
        code: payload.code,
        display_name: payload.display_name,
        capacity: payload.capacity,
        status: payload.status,
        current_poi: payload.current_poi,
        driver: payload.driver,
    })?;

    info!(buggy_id = buggy.id, code = %buggy.code, "buggy created");
    Ok((StatusCode::CREATED, Json(buggy)))
}

async fn list_buggies(State(state): State<Arc<AppState>>) -> Json<Vec<Buggy>> {
    Json(state.fleet.read().await.buggies())
}

async fn get_buggy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BuggyId>,
) -> Result<Json<Buggy>, AppError> {
    state
        .fleet
        .read()
        .await
        .buggy(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("buggy {id} not found")))
}

async fn delete_buggy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BuggyId>,
) -> Result<StatusCode, AppError> {
    state.fleet.write().await.delete_buggy(id)?;
    info!(buggy_id = id, "buggy deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn update_buggy_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BuggyId>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Buggy>, AppError> {
    let buggy = state.fleet.write().await.set_buggy_status(id, payload.status)?;
    info!(buggy_id = id, status = ?buggy.status, "buggy status changed");
    Ok(Json(buggy))
}

async fn update_buggy_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BuggyId>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Buggy>, AppError> {
    let buggy = state.fleet.write().await.set_buggy_location(id, payload.poi)?;
    Ok(Json(buggy))
}

async fn update_buggy_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BuggyId>,
    Json(payload): Json<UpdateDriverRequest>,
) -> Result<Json<Buggy>, AppError> {
    let buggy = state.fleet.write().await.set_buggy_driver(id, payload.driver)?;
    Ok(Json(buggy))
}

async fn buggy_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<BuggyId>,
) -> Result<Json<Vec<Stop>>, AppError> {
    Ok(Json(state.fleet.read().await.pending_route(id)?))
}
