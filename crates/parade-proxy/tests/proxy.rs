//! Router-level tests: requests go through `oneshot`, the backend and
//! WeatherAPI are wiremock servers.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use parade_core::Config;
use parade_proxy::create_app;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;
use wiremock::matchers::{body_string, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app_for(backend_url: &str, weather_url: &str, api_key: Option<&str>) -> Router {
    let mut config = Config::default();
    config.proxy.backend_url = backend_url.to_string();
    config.weather_api.base_url = weather_url.to_string();
    config.weather_api.api_key = api_key.map(str::to_string);
    create_app(Arc::new(config)).unwrap()
}

fn proxy_app(backend: &MockServer) -> Router {
    app_for(&backend.uri(), "http://127.0.0.1:1", None)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// An address nothing is listening on
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_get_forwards_path_and_query() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .and(query_param("location", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&backend)
        .await;

    // Trailing slash on the base must not produce a double slash.
    let app = app_for(&format!("{}/", backend.uri()), "http://127.0.0.1:1", None);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/proxy/weather/current?location=Paris")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    assert_eq!(body_json(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_get_sends_no_body_and_default_content_type() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header_eq("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("true"))
        .mount(&backend)
        .await;

    let response = proxy_app(&backend)
        .oneshot(
            Request::builder()
                .uri("/api/proxy/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let received = backend.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].body.is_empty());
}

#[tokio::test]
async fn test_post_body_forwarded_unchanged() {
    let raw = r#"{"location":"Paris","date":"2025-06-01","time":"14:00"}"#;
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/weather/forecast"))
        .and(body_string(raw))
        .and(header_eq("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "saved": 1 })))
        .expect(1)
        .mount(&backend)
        .await;

    let response = proxy_app(&backend)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/proxy/weather/forecast")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(raw))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await, json!({ "saved": 1 }));
}

#[tokio::test]
async fn test_post_keeps_content_length() {
    let raw = r#"{"location":"Lima","date":"2025-06-01","time":"09:00"}"#;
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/weather/recommendations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backend)
        .await;

    proxy_app(&backend)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/proxy/weather/recommendations")
                .body(Body::from(raw))
                .unwrap(),
        )
        .await
        .unwrap();

    let received = backend.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0].headers.get("content-length").unwrap(),
        raw.len().to_string().as_str()
    );
    assert!(received[0].headers.get("transfer-encoding").is_none());
    assert_eq!(received[0].body, raw.as_bytes());
}

#[tokio::test]
async fn test_credentials_are_not_forwarded() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&backend)
        .await;

    proxy_app(&backend)
        .oneshot(
            Request::builder()
                .uri("/api/proxy/weather/current")
                .header(header::AUTHORIZATION, "Bearer secret")
                .header(header::COOKIE, "session=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let received = backend.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
    assert!(received[0].headers.get("cookie").is_none());
}

#[tokio::test]
async fn test_upstream_error_status_mirrored() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather/current"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("content-type", "application/json")
                .set_body_string(r#"{"error":"down"}"#),
        )
        .mount(&backend)
        .await;

    let response = proxy_app(&backend)
        .oneshot(
            Request::builder()
                .uri("/api/proxy/weather/current?location=Paris")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await, json!({ "error": "down" }));
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let app = app_for(&closed_port_url(), "http://127.0.0.1:1", None);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/proxy/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Proxy error");
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_options_preflight() {
    let backend = MockServer::start().await;
    let response = proxy_app(&backend)
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/proxy/weather/forecast")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(
        headers.get("access-control-allow-methods").unwrap(),
        "GET,POST,OPTIONS"
    );
    assert_eq!(
        headers.get("access-control-allow-headers").unwrap(),
        "Content-Type, Authorization"
    );
    assert!(backend.received_requests().await.unwrap().is_empty());
}

fn weather_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/weather")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_weather_without_key_is_server_error() {
    let weather = MockServer::start().await;
    let app = app_for("http://127.0.0.1:1", &weather.uri(), None);

    // Key is checked before the location.
    let response = app.oneshot(weather_request("{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Weather API key is not configured" })
    );
    assert!(weather.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_weather_without_location_is_bad_request() {
    let weather = MockServer::start().await;
    let app = app_for("http://127.0.0.1:1", &weather.uri(), Some("k"));

    let response = app.oneshot(weather_request(r#"{"location":""}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({ "error": "Location is required" }));
}

#[tokio::test]
async fn test_weather_forecast_success() {
    let weather = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("key", "k"))
        .and(query_param("q", "Oslo"))
        .and(query_param("days", "7"))
        .and(query_param("aqi", "no"))
        .and(query_param("alerts", "no"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "location": { "name": "Oslo" },
            "forecast": { "forecastday": [] }
        })))
        .expect(1)
        .mount(&weather)
        .await;

    let app = app_for("http://127.0.0.1:1", &weather.uri(), Some("k"));
    let response = app
        .oneshot(weather_request(r#"{"location":"Oslo"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["location"]["name"], "Oslo");
}

#[tokio::test]
async fn test_weather_upstream_error_passes_details() {
    let weather = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 1006, "message": "No matching location found." }
        })))
        .mount(&weather)
        .await;

    let app = app_for("http://127.0.0.1:1", &weather.uri(), Some("k"));
    let response = app
        .oneshot(weather_request(r#"{"location":"Atlantis","days":3}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to fetch weather data");
    assert_eq!(body["details"]["error"]["code"], 1006);
}

/// Serves one response that promises more body than it sends, then hangs up.
async fn truncated_body_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"loc",
            )
            .await;
        let _ = socket.shutdown().await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_weather_body_read_failure_is_server_error() {
    let weather_url = truncated_body_server().await;
    let app = app_for("http://127.0.0.1:1", &weather_url, Some("k"));

    let response = app
        .oneshot(weather_request(r#"{"location":"Oslo"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Failed to fetch weather data");
    assert!(!body["details"].as_str().unwrap().is_empty());
}
