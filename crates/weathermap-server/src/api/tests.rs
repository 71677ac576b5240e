use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::FixedOffset;
use serde_json::json;
use tower::ServiceExt;
use weathermap_client::{Backend, ClientOptions, WeatherClient};
use weathermap_core::LocationRegistry;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::weather::clamp_days;
use super::*;
use crate::middleware::RateLimitState;

fn cst() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).unwrap()
}

fn state(upstream: Option<WeatherClient>) -> AppState {
    AppState {
        registry: Arc::new(LocationRegistry::builtin().expect("builtin registry")),
        upstream,
        utc_offset: cst(),
    }
}

fn upstream_client(base_url: &str) -> WeatherClient {
    let options = ClientOptions {
        timeout_secs: 5,
        user_agent: "weathermap-test/0.1".to_string(),
        utc_offset: cst(),
    };
    let backend = Backend::OpenWeather {
        api_key: "server-key".to_string(),
        lang: "zh_cn".to_string(),
    };
    WeatherClient::new(base_url, backend, &options).expect("client")
}

fn mock_app() -> Router {
    build_app(state(None), RateLimitState::per_minute(120), None)
}

async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[test]
fn api_error_validation_error_maps_to_bad_request() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn api_error_upstream_error_maps_to_internal_error() {
    let response = ApiError::new("req-1", "upstream_error", "boom").into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn clamp_days_defaults_and_bounds() {
    assert_eq!(clamp_days(None), 1);
    assert_eq!(clamp_days(Some("0")), 1);
    assert_eq!(clamp_days(Some("-3")), 1);
    assert_eq!(clamp_days(Some("3")), 3);
    assert_eq!(clamp_days(Some("9")), 5);
    assert_eq!(clamp_days(Some("soon")), 1);
}

#[tokio::test]
async fn health_reports_mock_mode() {
    let (status, json) = get(mock_app(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["upstream"], "mock");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn weather_without_coordinates_is_bad_request() {
    let (status, json) = get(mock_app(), "/api/weather?lat=39.9").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn weather_with_non_numeric_coordinate_is_bad_request() {
    let (status, json) = get(mock_app(), "/api/weather?lat=north&lon=116.4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("lat"));
}

#[tokio::test]
async fn weather_in_mock_mode_returns_sample_city() {
    let (status, json) = get(mock_app(), "/api/weather?lat=39.9042&lon=116.4074").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({ "city": "示例城市", "temperature": 25.0, "weather": "晴天", "icon": "01d" })
    );
}

#[tokio::test]
async fn forecast_in_mock_mode_has_upstream_shape() {
    let (status, json) = get(mock_app(), "/api/forecast?lat=31.2&lon=121.5&days=9").await;
    assert_eq!(status, StatusCode::OK);
    let list = json["list"].as_array().expect("list");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["weather"][0]["icon"], "01d");
    assert!(list[0]["dt"].is_i64());
}

#[tokio::test]
async fn weather_reshapes_upstream_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "39.9042"))
        .and(query_param("appid", "server-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Beijing",
            "main": { "temp": 21.4, "humidity": 40 },
            "weather": [{ "id": 800, "description": "晴", "icon": "01d" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = build_app(
        state(Some(upstream_client(&server.uri()))),
        RateLimitState::per_minute(120),
        None,
    );
    let (status, json) = get(app, "/api/weather?lat=39.9042&lon=116.4074").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({ "city": "Beijing", "temperature": 21.4, "weather": "晴", "icon": "01d" })
    );
}

#[tokio::test]
async fn forecast_passes_upstream_body_through() {
    let server = MockServer::start().await;
    let body = json!({
        "city": { "name": "Shanghai" },
        "list": [{ "dt": 1_746_158_400, "main": { "temp": 19.5 }, "weather": [{ "description": "小雨", "icon": "10d" }] }]
    });
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let app = build_app(
        state(Some(upstream_client(&server.uri()))),
        RateLimitState::per_minute(120),
        None,
    );
    let (status, json) = get(app, "/api/forecast?lat=31.2304&lon=121.4737&days=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, body);
}

#[tokio::test]
async fn upstream_failure_is_internal_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let app = build_app(
        state(Some(upstream_client(&server.uri()))),
        RateLimitState::per_minute(120),
        None,
    );
    let (status, json) = get(app, "/api/weather?lat=39.9&lon=116.4").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "upstream_error");
    let message = json["error"]["message"].as_str().unwrap();
    assert!(!message.contains("server-key"), "credential leaked: {message}");
}

#[tokio::test]
async fn cities_are_a_bare_array() {
    let (status, json) = get(mock_app(), "/api/cities").await;
    assert_eq!(status, StatusCode::OK);
    let cities = json.as_array().expect("array");
    assert_eq!(cities.len(), 70);
    assert_eq!(cities[0]["name"], "北京");
    assert!(cities[0].get("province").is_none());
}

#[tokio::test]
async fn counties_filter_by_province() {
    let (status, json) = get(mock_app(), "/api/counties?province=%E6%B2%B3%E5%8C%97").await;
    assert_eq!(status, StatusCode::OK);
    let counties = json.as_array().expect("array");
    assert_eq!(counties.len(), 8);
    assert!(counties.iter().all(|c| c["province"] == "河北"));

    let (_, all) = get(mock_app(), "/api/counties").await;
    assert!(all.as_array().unwrap().len() > counties.len());
}

#[tokio::test]
async fn unknown_api_route_is_not_found() {
    let (status, json) = get(mock_app(), "/api/visitor-count").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn rate_limit_rejects_after_budget() {
    let app = build_app(state(None), RateLimitState::new(1, Duration::from_secs(60)), None);

    let (first, _) = get(app.clone(), "/api/cities").await;
    assert_eq!(first, StatusCode::OK);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/cities").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .expect("ascii header")
        .parse()
        .expect("seconds");
    assert!((1..=60).contains(&retry_after));
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["error"]["code"], "rate_limited");

    // Health is outside the limited routes.
    let (health, _) = get(app, "/api/health").await;
    assert_eq!(health, StatusCode::OK);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let response = mock_app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn static_files_are_served_outside_api() {
    let dir = std::env::temp_dir().join(format!("weathermap-static-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create static dir");
    std::fs::write(dir.join("index.html"), "<h1>map</h1>").expect("write index");

    let app = build_app(state(None), RateLimitState::per_minute(120), Some(&dir));
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert_eq!(&body[..], b"<h1>map</h1>");

    std::fs::remove_dir_all(&dir).ok();
}
