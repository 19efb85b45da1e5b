use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::driver::Driver;
use crate::models::stop::Stop;
use crate::models::DriverId;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id/route", get(driver_route))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub username: String,
    #[serde(default)]
    pub display_name: String,
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<(StatusCode, Json<Driver>), AppError> {
    let driver = state
        .fleet
        .write()
        .await
        .create_driver(&payload.username, &payload.display_name)?;
    Ok((StatusCode::CREATED, Json(driver)))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<Driver>> {
    Json(state.fleet.read().await.drivers())
}

async fn driver_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DriverId>,
) -> Result<Json<Vec<Stop>>, AppError> {
    Ok(Json(state.fleet.read().await.driver_route(id)?))
}
