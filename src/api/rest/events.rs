use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use serde_json::json;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::info;

use crate::error::AppError;
use crate::events::ChangeEvent;
use crate::models::DriverId;
use crate::state::AppState;

const HEARTBEAT: Duration = Duration::from_secs(15);

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events/dispatcher", get(dispatcher_events))
        .route("/events/drivers/:id", get(driver_events))
}

fn event_stream(
    hello: serde_json::Value,
    rx: broadcast::Receiver<ChangeEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let connected = Event::default().event("connected").data(hello.to_string());

    let changes = BroadcastStream::new(rx).filter_map(|result| {
        // Lagged receivers skip what they missed; the next snapshot fetch catches up.
        let change = result.ok()?;
        Event::default()
            .event(change.kind.as_str())
            .json_data(&change)
            .ok()
    });

    tokio_stream::once(connected).chain(changes).map(Ok)
}

async fn dispatcher_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("dispatcher subscribed to events");
    let rx = state.events.subscribe_dispatcher();
    Sse::new(event_stream(json!({ "type": "connected" }), rx))
        .keep_alive(KeepAlive::new().interval(HEARTBEAT))
}

async fn driver_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DriverId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.fleet.read().await.driver(id).is_none() {
        return Err(AppError::NotFound(format!("driver {id} not found")));
    }

    info!(driver_id = id, "driver subscribed to events");
    let rx = state.events.subscribe_driver(id);
    Ok(Sse::new(event_stream(json!({ "type": "connected", "driver_id": id }), rx))
        .keep_alive(KeepAlive::new().interval(HEARTBEAT)))
}
