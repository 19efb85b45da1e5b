use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::models::poi::{Poi, PoiEdge};
use crate::models::PoiId;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pois", post(create_poi).get(list_pois))
        .route("/pois/travel-time", get(travel_time))
        .route("/pois/:id", delete(delete_poi))
        .route("/poi-edges", post(upsert_edge).get(list_edges))
        .route("/poi-edges/:from/:to", delete(delete_edge))
}

#[derive(Deserialize)]
pub struct CreatePoiRequest {
    pub code: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpsertEdgeRequest {
    pub from_poi_id: PoiId,
    pub to_poi_id: PoiId,
    pub travel_time_s: u32,
    #[serde(default = "default_bidirectional")]
    pub bidirectional: bool,
}

fn default_bidirectional() -> bool {
    true
}

#[derive(Deserialize)]
pub struct TravelTimeQuery {
    pub from: String,
    pub to: String,
}

#[derive(Serialize)]
pub struct TravelTimeResponse {
    pub from: String,
    pub to: String,
    pub travel_time_s: u64,
    pub path: Vec<String>,
}

async fn create_poi(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePoiRequest>,
) -> Result<(StatusCode, Json<Poi>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    let poi = state
        .fleet
        .write()
        .await
        .create_poi(&payload.code, &payload.name)?;
    info!(poi_id = poi.id, code = %poi.code, "poi created");
    Ok((StatusCode::CREATED, Json(poi)))
}

async fn list_pois(State(state): State<Arc<AppState>>) -> Json<Vec<Poi>> {
    Json(state.fleet.read().await.pois())
}

async fn delete_poi(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PoiId>,
) -> Result<StatusCode, AppError> {
    let poi = state.fleet.write().await.delete_poi(id)?;
    info!(poi_id = id, code = %poi.code, "poi deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_edges(State(state): State<Arc<AppState>>) -> Json<Vec<PoiEdge>> {
    Json(state.fleet.read().await.edges())
}

async fn upsert_edge(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpsertEdgeRequest>,
) -> Result<(StatusCode, Json<Vec<PoiEdge>>), AppError> {
    let edges = state.fleet.write().await.upsert_edge(
        payload.from_poi_id,
        payload.to_poi_id,
        payload.travel_time_s,
        payload.bidirectional,
    )?;
    info!(
        from = payload.from_poi_id,
        to = payload.to_poi_id,
        travel_time_s = payload.travel_time_s,
        bidirectional = payload.bidirectional,
        "poi edge saved"
    );
    Ok((StatusCode::CREATED, Json(edges)))
}

async fn delete_edge(
    State(state): State<Arc<AppState>>,
    Path((from, to)): Path<(PoiId, PoiId)>,
) -> Result<StatusCode, AppError> {
    state.fleet.write().await.delete_edge(from, to)?;
    info!(from, to, "poi edge deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn travel_time(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TravelTimeQuery>,
) -> Result<Json<TravelTimeResponse>, AppError> {
    let fleet = state.fleet.read().await;
    let lookup = |code: &str| {
        fleet
            .poi_by_code(code)
            .map(|poi| poi.id)
            .ok_or_else(|| AppError::NotFound(format!("poi {code} not found")))
    };
    let from = lookup(&query.from)?;
    let to = lookup(&query.to)?;

    let path = fleet.graph().shortest_path(from, to)?;
    let codes = path
        .poi_ids
        .iter()
        .filter_map(|id| fleet.poi(*id).map(|poi| poi.code.clone()))
        .collect();

    Ok(Json(TravelTimeResponse {
        from: query.from,
        to: query.to,
        travel_time_s: path.travel_time_s,
        path: codes,
    }))
}
