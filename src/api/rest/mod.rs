pub mod buggies;
pub mod drivers;
pub mod events;
pub mod pois;
pub mod rides;
pub mod stops;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use crate::store::RideSummary;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(pois::router())
        .merge(buggies::router())
        .merge(drivers::router())
        .merge(rides::router())
        .merge(stops::router())
        .merge(events::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/metrics/summary", get(metrics_summary))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    pois: usize,
    buggies: usize,
    rides: usize,
    pending_stops: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let fleet = state.fleet.read().await;
    Json(HealthResponse {
        status: "ok",
        pois: fleet.pois().len(),
        buggies: fleet.buggies().len(),
        rides: fleet.ride_count(),
        pending_stops: fleet.pending_stop_count(),
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

async fn metrics_summary(State(state): State<Arc<AppState>>) -> Json<RideSummary> {
    let today = Utc::now().date_naive();
    Json(state.fleet.read().await.ride_summary(today))
}
