use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use buggy_dispatch::api::rest::router;
use buggy_dispatch::engine::assignment::NewRide;
use buggy_dispatch::engine::lifecycle;
use buggy_dispatch::engine::route::ServiceTimes;
use buggy_dispatch::events::EventKind;
use buggy_dispatch::models::buggy::BuggyStatus;
use buggy_dispatch::state::AppState;
use buggy_dispatch::store::NewBuggy;
use serde_json::{json, Value};
use tower::ServiceExt;

fn shared_state() -> Arc<AppState> {
    Arc::new(AppState::new(1024, ServiceTimes::default()))
}

fn setup() -> axum::Router {
    router(shared_state())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_poi(app: &axum::Router, code: &str, name: &str) -> u64 {
    let (status, body) = send(
        app,
        json_request("POST", "/pois", json!({ "code": code, "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_u64().unwrap()
}

async fn link(app: &axum::Router, from: u64, to: u64, travel_time_s: u32) {
    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/poi-edges",
            json!({ "from_poi_id": from, "to_poi_id": to, "travel_time_s": travel_time_s }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn create_buggy(app: &axum::Router, code: &str, at: u64, status: &str) -> u64 {
    let (code_status, body) = send(
        app,
        json_request(
            "POST",
            "/buggies",
            json!({
                "code": code,
                "display_name": code,
                "capacity": 4,
                "status": status,
                "current_poi": at
            }),
        ),
    )
    .await;
    assert_eq!(code_status, StatusCode::CREATED);
    body["id"].as_u64().unwrap()
}

async fn request_ride(app: &axum::Router, pickup: &str, dropoff: &str, guests: u32) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/rides",
            json!({
                "pickup_poi_code": pickup,
                "dropoff_poi_code": dropoff,
                "num_guests": guests,
                "room_number": "101",
                "guest_name": "Test Guest"
            }),
        ),
    )
    .await
}

struct Resort {
    bel_air: u64,
    beach_bar: u64,
    reception: u64,
}

async fn resort(app: &axum::Router) -> Resort {
    let bel_air = create_poi(app, "BEL_AIR", "Bel Air").await;
    let beach_bar = create_poi(app, "BEACH_BAR", "Beach Bar").await;
    let reception = create_poi(app, "RECEPTION", "Reception").await;
    link(app, bel_air, beach_bar, 120).await;
    link(app, beach_bar, reception, 240).await;
    link(app, bel_air, reception, 90).await;
    Resort {
        bel_air,
        beach_bar,
        reception,
    }
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["buggies"], 0);
    assert_eq!(body["rides"], 0);
    assert_eq!(body["pending_stops"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("pending_stops"));
}

#[tokio::test]
async fn create_buggy_defaults_to_inactive_and_empty() {
    let app = setup();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/buggies",
            json!({ "code": "BUGGY_1", "display_name": "Buggy #1", "capacity": 4 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "INACTIVE");
    assert_eq!(body["current_onboard_guests"], 0);
    assert!(body["current_poi"].is_null());
}

#[tokio::test]
async fn create_buggy_zero_capacity_returns_400() {
    let app = setup();
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/buggies",
            json!({ "code": "BUGGY_1", "display_name": "Buggy #1", "capacity": 0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn travel_time_follows_the_shortest_path() {
    let app = setup();
    resort(&app).await;

    let (status, body) = send(
        &app,
        get_request("/pois/travel-time?from=RECEPTION&to=BEACH_BAR"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["travel_time_s"], 210);
    assert_eq!(body["path"], json!(["RECEPTION", "BEL_AIR", "BEACH_BAR"]));
}

#[tokio::test]
async fn travel_time_to_an_isolated_poi_is_unprocessable() {
    let app = setup();
    resort(&app).await;
    create_poi(&app, "SPA", "Spa").await;

    let (status, body) = send(&app, get_request("/pois/travel-time?from=RECEPTION&to=SPA")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "UNREACHABLE_POI");
}

#[tokio::test]
async fn all_buggies_inactive_returns_no_active_buggies() {
    let app = setup();
    let r = resort(&app).await;
    create_buggy(&app, "BUGGY_1", r.reception, "INACTIVE").await;

    let (status, body) = request_ride(&app, "BEACH_BAR", "RECEPTION", 2).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NO_ACTIVE_BUGGIES");

    let (_, rides) = send(&app, get_request("/rides")).await;
    assert_eq!(rides.as_array().unwrap().len(), 0);
    let (_, health) = send(&app, get_request("/health")).await;
    assert_eq!(health["pending_stops"], 0);
}

#[tokio::test]
async fn unknown_poi_code_returns_400() {
    let app = setup();
    let r = resort(&app).await;
    create_buggy(&app, "BUGGY_1", r.reception, "ACTIVE").await;

    let (status, body) = request_ride(&app, "UNKNOWN", "BEACH_BAR", 2).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("pickup_poi_code"));
}

#[tokio::test]
async fn busy_buggy_arriving_sooner_beats_idle_buggy() {
    let state = shared_state();
    let app = router(state.clone());
    let r = resort(&app).await;

    let busy = create_buggy(&app, "BUGGY_1", r.bel_air, "ACTIVE").await;
    let (status, first) = request_ride(&app, "BEL_AIR", "BEACH_BAR", 3).await;
    assert_eq!(status, StatusCode::CREATED);
    let pickup = first["stop_ids"][0].as_u64().unwrap();
    for action in ["start", "complete"] {
        let (status, _) = send(&app, post_empty(&format!("/stops/{pickup}/{action}"))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let idle = create_buggy(&app, "BUGGY_2", r.reception, "ACTIVE").await;

    let (status, body) = request_ride(&app, "BEACH_BAR", "RECEPTION", 2).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["assigned_buggy"]["id"], busy);
    assert_eq!(body["ride"]["status"], "ASSIGNED");
    assert_eq!(body["assignment"]["pickup_eta_s"], 145);
    assert_eq!(body["ride"]["public_code"].as_str().unwrap().len(), 6);

    let (_, route) = send(&app, get_request(&format!("/buggies/{busy}/route"))).await;
    let route = route.as_array().unwrap();
    assert_eq!(route.len(), 3);
    assert_eq!(route[0]["stop_type"], "DROPOFF");
    assert_eq!(route[0]["poi"], r.beach_bar);
    assert_eq!(route[1]["stop_type"], "PICKUP");
    assert_eq!(route[1]["poi"], r.beach_bar);
    assert_eq!(route[2]["stop_type"], "DROPOFF");
    assert_eq!(route[2]["poi"], r.reception);

    let (_, idle_route) = send(&app, get_request(&format!("/buggies/{idle}/route"))).await;
    assert_eq!(idle_route.as_array().unwrap().len(), 0);

    let (_, assignments) = send(&app, get_request("/assignments")).await;
    assert_eq!(assignments.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn driver_works_through_a_ride() {
    let state = shared_state();
    let app = router(state.clone());
    let r = resort(&app).await;

    let (status, driver) = send(
        &app,
        json_request("POST", "/drivers", json!({ "username": "driver1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let driver_id = driver["id"].as_u64().unwrap();

    let buggy = create_buggy(&app, "BUGGY_1", r.reception, "ACTIVE").await;
    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/buggies/{buggy}/driver"),
            json!({ "driver": driver_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut driver_events = state.events.subscribe_driver(driver_id);
    let mut dispatcher_events = state.events.subscribe_dispatcher();

    let (status, created) = request_ride(&app, "RECEPTION", "BEACH_BAR", 2).await;
    assert_eq!(status, StatusCode::CREATED);
    let ride_id = created["ride"]["id"].as_u64().unwrap();

    let assigned = driver_events.try_recv().unwrap();
    assert_eq!(assigned.kind, EventKind::RideAssigned);
    assert_eq!(assigned.buggy_id, buggy);

    let (_, route) = send(&app, get_request(&format!("/drivers/{driver_id}/route"))).await;
    let stops: Vec<u64> = route
        .as_array()
        .unwrap()
        .iter()
        .map(|stop| stop["id"].as_u64().unwrap())
        .collect();
    assert_eq!(stops.len(), 2);
    let (pickup, dropoff) = (stops[0], stops[1]);

    let (status, body) = send(&app, post_empty(&format!("/stops/{dropoff}/start"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "OUT_OF_ORDER_STOP");

    for stop in [pickup, dropoff] {
        let (status, _) = send(&app, post_empty(&format!("/stops/{stop}/start"))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, post_empty(&format!("/stops/{stop}/complete"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, post_empty(&format!("/stops/{dropoff}/complete"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_TRANSITION");

    let (_, ride) = send(&app, get_request(&format!("/rides/{ride_id}"))).await;
    assert_eq!(ride["status"], "COMPLETED");

    let (_, buggy_after) = send(&app, get_request(&format!("/buggies/{buggy}"))).await;
    assert_eq!(buggy_after["current_onboard_guests"], 0);
    assert_eq!(buggy_after["current_poi"], r.beach_bar);

    let (_, route) = send(&app, get_request(&format!("/drivers/{driver_id}/route"))).await;
    assert_eq!(route.as_array().unwrap().len(), 0);

    let mut kinds = Vec::new();
    while let Ok(event) = dispatcher_events.try_recv() {
        kinds.push(event.kind);
    }
    assert_eq!(
        kinds,
        vec![
            EventKind::RideAssigned,
            EventKind::StopStarted,
            EventKind::StopCompleted,
            EventKind::StopStarted,
            EventKind::StopCompleted,
            EventKind::RideCompleted,
        ]
    );
}

#[tokio::test]
async fn poi_in_use_cannot_be_deleted() {
    let app = setup();
    let r = resort(&app).await;
    create_buggy(&app, "BUGGY_1", r.reception, "ACTIVE").await;
    let (status, _) = request_ride(&app, "RECEPTION", "BEACH_BAR", 1).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/pois/{}", r.beach_bar))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn metrics_summary_counts_todays_rides() {
    let app = setup();
    let r = resort(&app).await;
    create_buggy(&app, "BUGGY_1", r.reception, "ACTIVE").await;
    request_ride(&app, "RECEPTION", "BEACH_BAR", 1).await;
    request_ride(&app, "BEACH_BAR", "BEL_AIR", 2).await;

    let (status, body) = send(&app, get_request("/metrics/summary")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_rides"], 2);
    assert!(body["avg_wait_time_s"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn concurrent_requests_never_share_sequence_indices() {
    let state = shared_state();
    let app = router(state.clone());
    let r = resort(&app).await;
    let buggy = create_buggy(&app, "BUGGY_1", r.reception, "ACTIVE").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            request_ride(&app, "RECEPTION", "BEACH_BAR", 1).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::CREATED);
    }

    let (_, route) = send(&app, get_request(&format!("/buggies/{buggy}/route"))).await;
    let mut indices: Vec<u64> = route
        .as_array()
        .unwrap()
        .iter()
        .map(|stop| stop["sequence_index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices.len(), 16);
    indices.dedup();
    assert_eq!(indices, (0..16).collect::<Vec<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_drivers_see_events_in_commit_order() {
    let state = shared_state();
    let stops: Vec<u64> = {
        let mut fleet = state.fleet.write().await;
        let pool = fleet.create_poi("MAIN_POOL", "Main Pool").unwrap().id;
        let spa = fleet.create_poi("SPA", "Spa").unwrap().id;
        fleet.upsert_edge(pool, spa, 60, true).unwrap();
        fleet
            .create_buggy(NewBuggy {
                code: "BUGGY_1".to_string(),
                display_name: "Buggy #1".to_string(),
                capacity: 4,
                status: BuggyStatus::Active,
                current_poi: Some(pool),
                driver: None,
            })
            .unwrap();

        let mut stops = Vec::new();
        for _ in 0..20 {
            let created = fleet
                .create_ride(
                    NewRide {
                        pickup_poi_code: "MAIN_POOL".to_string(),
                        dropoff_poi_code: "SPA".to_string(),
                        num_guests: 1,
                        room_number: String::new(),
                        guest_name: String::new(),
                    },
                    &ServiceTimes::default(),
                )
                .unwrap();
            stops.extend(created.stop_ids);
        }
        stops
    };
    let mut rx = state.events.subscribe_dispatcher();

    let starter = {
        let state = state.clone();
        let stops = stops.clone();
        tokio::spawn(async move {
            for stop in stops {
                while lifecycle::start_stop(&state, stop).await.is_err() {
                    tokio::task::yield_now().await;
                }
            }
        })
    };
    let completer = {
        let state = state.clone();
        let stops = stops.clone();
        tokio::spawn(async move {
            for stop in stops {
                while lifecycle::complete_stop(&state, stop).await.is_err() {
                    tokio::task::yield_now().await;
                }
            }
        })
    };
    starter.await.unwrap();
    completer.await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.kind != EventKind::RideCompleted {
            seen.push((event.kind, event.stop_id.unwrap()));
        }
    }
    let expected: Vec<(EventKind, u64)> = stops
        .iter()
        .flat_map(|&stop| [(EventKind::StopStarted, stop), (EventKind::StopCompleted, stop)])
        .collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn edge_longer_than_a_day_returns_400() {
    let app = setup();
    let a = create_poi(&app, "BEL_AIR", "Bel Air").await;
    let b = create_poi(&app, "BEACH_BAR", "Beach Bar").await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/poi-edges",
            json!({ "from_poi_id": a, "to_poi_id": b, "travel_time_s": 3_000_000_000u64 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, edges) = send(&app, get_request("/poi-edges")).await;
    assert_eq!(edges.as_array().unwrap().len(), 0);
}
