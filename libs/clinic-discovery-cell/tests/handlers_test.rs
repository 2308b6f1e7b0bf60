use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path};

use clinic_discovery_cell::handlers::*;
use clinic_discovery_cell::*;
use shared_utils::test_utils::{MockUpstreamResponses, TestConfig};

async fn mount_upstreams(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockUpstreamResponses::registry_clinic("c-1", "Amae Heart Centre", "Cardiology"),
            MockUpstreamResponses::registry_clinic("c-2", "Amae Skin Clinic", "Dermatology"),
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/maps/api/place/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockUpstreamResponses::places_response(vec![
            MockUpstreamResponses::places_result("ChIJ-1", "Reddington Hospital"),
            MockUpstreamResponses::places_result("ChIJ-2", "Lagoon Hospital"),
            MockUpstreamResponses::places_result("ChIJ-3", "Evercare Hospital"),
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ai/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockUpstreamResponses::ai_response(vec![
            MockUpstreamResponses::ai_guess("Mainland Family Clinic"),
        ])))
        .mount(mock_server)
        .await;
}

fn discovery_state(mock_server: &MockServer) -> Arc<DiscoveryState> {
    Arc::new(DiscoveryState::new(TestConfig::with_mock_server(&mock_server.uri()).to_arc()))
}

fn search_body(filters: Value) -> Value {
    json!({
        "location": { "latitude": 6.4474, "longitude": 3.4720, "accuracy_m": 15.0 },
        "filters": filters
    })
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_search_clinics_handler_returns_grouped_results() {
    let mock_server = MockServer::start().await;
    mount_upstreams(&mock_server).await;
    let state = discovery_state(&mock_server);

    let request: SearchRequest = serde_json::from_value(search_body(json!({
        "specialty": "Cardiology",
        "insurance": "",
        "sort_by_distance": false
    })))
    .unwrap();

    let result = search_clinics(State(state), Query(SearchQuery { wait: None }), Json(request)).await;

    let (status, Json(view)) = result.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view.total_count, 4);
    assert_eq!(view.partners.len(), 1);
    assert_eq!(view.others.len(), 3);
}

#[tokio::test]
async fn test_search_denied_location_is_unprocessable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/maps/api/place/nearbysearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockUpstreamResponses::places_response(vec![])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = clinic_discovery_routes(discovery_state(&mock_server));
    let (status, body) = send(app, "POST", "/search", Some(json!({ "location_error": 1 }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "permission_denied");
}

#[tokio::test]
async fn test_search_session_round_trip_through_router() {
    let mock_server = MockServer::start().await;
    mount_upstreams(&mock_server).await;
    let state = discovery_state(&mock_server);
    let app = clinic_discovery_routes(state.clone());

    let (status, created) = send(
        app.clone(),
        "POST",
        "/search",
        Some(search_body(json!({ "specialty": "All" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["phase"], "ready");
    assert_eq!(created["total_count"], 5);
    assert_eq!(created["partners"][0]["source"], "registered");
    assert_eq!(created["partners"][0]["badge"], "Verified Partner");

    let session_id = created["session_id"].as_str().unwrap().to_string();

    let (status, fetched) = send(app.clone(), "GET", &format!("/search/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["total_count"], 5);

    let (status, with_area) = send(
        app.clone(),
        "POST",
        &format!("/search/{}/area", session_id),
        Some(json!({ "area": "Surulere" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(with_area["total_count"], 6);
    assert_eq!(with_area["areas_searched"], json!(["Surulere"]));

    let (status, reset) = send(app.clone(), "POST", &format!("/search/{}/reset", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reset["phase"], "not_searched");
    assert_eq!(reset["total_count"], 0);

    let (status, _) = send(app.clone(), "DELETE", &format!("/search/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, "GET", &format!("/search/{}", session_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_filters_narrows_partners() {
    let mock_server = MockServer::start().await;
    mount_upstreams(&mock_server).await;
    let app = clinic_discovery_routes(discovery_state(&mock_server));

    let (_, created) = send(app.clone(), "POST", "/search", Some(search_body(json!({})))).await;
    let session_id = created["session_id"].as_str().unwrap().to_string();
    assert_eq!(created["partners"].as_array().unwrap().len(), 2);

    let (status, filtered) = send(
        app,
        "PUT",
        &format!("/search/{}/filters", session_id),
        Some(json!({ "specialty": "Dermatology", "insurance": "Hygeia", "sort_by_distance": true })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered["partners"].as_array().unwrap().len(), 1);
    assert_eq!(filtered["partners"][0]["name"], "Amae Skin Clinic");
    assert_eq!(filtered["filters"]["sort_by_distance"], true);
}

#[tokio::test]
async fn test_area_search_without_an_area_is_bad_request() {
    let mock_server = MockServer::start().await;
    let state = discovery_state(&mock_server);
    let session = state.sessions.open(None).await;
    let session_id = session.read().await.session_id();

    let result = search_area(
        State(state),
        Path(session_id),
        Json(AreaSearchRequest { area: "   ".to_string() }),
    )
    .await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unsupported_geolocation_can_search_an_area() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/search"))
        .and(body_partial_json(json!({ "area": "Ikeja", "latitude": null, "longitude": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockUpstreamResponses::ai_response(vec![
            MockUpstreamResponses::ai_guess("Ikeja Family Clinic"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = clinic_discovery_routes(discovery_state(&mock_server));
    let session_id = Uuid::new_v4();

    let (status, body) = send(
        app.clone(),
        "POST",
        "/search",
        Some(json!({ "session_id": session_id, "geolocation_supported": false })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "unsupported");

    let (status, view) = send(
        app,
        "POST",
        &format!("/search/{}/area", session_id),
        Some(json!({ "area": "Ikeja" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["total_count"], 1);
    assert_eq!(view["others"][0]["badge"], "AI Found");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let mock_server = MockServer::start().await;
    let state = discovery_state(&mock_server);

    let result = get_search(State(state), Path(Uuid::new_v4())).await;

    let response = result.unwrap_err().into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_without_wait_is_accepted() {
    let mock_server = MockServer::start().await;
    mount_upstreams(&mock_server).await;
    let app = clinic_discovery_routes(discovery_state(&mock_server));

    let (status, body) = send(app, "POST", "/search?wait=false", Some(search_body(json!({})))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["phase"], "searching");
    assert_eq!(body["pending_sources"], json!(["registered", "places_search"]));
}
