use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use enose::client::HttpPredictionClient;
use enose_server::{router, AppState};

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Start the proxy in front of `backend_url` and return the proxy's base URL
async fn spawn_proxy(backend_url: &str) -> String {
    let client = HttpPredictionClient::new(backend_url, Duration::from_secs(5)).unwrap();
    spawn(router(AppState::new(client))).await
}

struct Backend {
    url: String,
    predict_calls: Arc<AtomicUsize>,
    last_body: Arc<Mutex<Option<Value>>>,
}

/// Backend whose `/predict` echoes a fixed prediction and records the request
async fn spawn_backend() -> Backend {
    let predict_calls = Arc::new(AtomicUsize::new(0));
    let last_body: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));

    let calls = predict_calls.clone();
    let sink = last_body.clone();
    let app = Router::new()
        .route(
            "/predict",
            post(move |Json(body): Json<Value>| {
                let calls = calls.clone();
                let sink = sink.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    *sink.lock().unwrap() = Some(body);
                    Json(json!({
                        "predictions": { "meta": { "class_label": "Grade 1", "probability": 0.9 } },
                        "sensor_arrays": [[1.0, 2.0, 3.0, 4.0]]
                    }))
                }
            }),
        )
        .route(
            "/health",
            get(|| async { Json(json!({ "status": "healthy", "models_loaded": true })) }),
        )
        .route(
            "/models",
            get(|| async { Json(json!({ "base_1": { "name": "Model 1" } })) }),
        );

    Backend {
        url: spawn(app).await,
        predict_calls,
        last_body,
    }
}

async fn post_json(url: String, body: Value) -> (StatusCode, Value) {
    let response = reqwest::Client::new().post(url).json(&body).send().await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

async fn get_json(url: String) -> (StatusCode, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_predict_rejects_short_sensor_data() {
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, body) = post_json(
        format!("{}/predict", proxy),
        json!({ "sensor_data": [1.0, 2.0, 3.0] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["expected"], 4);
    assert_eq!(body["received"], 3);
    assert!(body["error"].as_str().unwrap().contains("exactly 4"));
    assert_eq!(backend.predict_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_predict_rejects_missing_sensor_data_and_bad_json() {
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, body) = post_json(format!("{}/predict", proxy), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing sensor_data in request body");

    let response = reqwest::Client::new()
        .post(format!("{}/predict", proxy))
        .header("content-type", "application/json")
        .body("{sensor_data")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(backend.predict_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_predict_forwards_valid_readings() {
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, body) = post_json(
        format!("{}/predict", proxy),
        json!({ "sensor_data": [120.5, 88, 24.3, 71] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"]["meta"]["class_label"], "Grade 1");
    assert_eq!(
        backend.last_body.lock().unwrap().clone(),
        Some(json!({ "sensor_data": [120.5, 88, 24.3, 71] }))
    );
}

#[tokio::test]
async fn test_predict_keeps_integer_readings_intact() {
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, _) = post_json(
        format!("{}/predict", proxy),
        json!({ "sensor_data": [1, 2, 3, 4] }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let forwarded = backend.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(forwarded, json!({ "sensor_data": [1, 2, 3, 4] }));
    assert!(forwarded["sensor_data"][0].is_u64());
}

#[tokio::test]
async fn test_feed_prediction_forwards_api_key() {
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, body) = post_json(
        format!("{}/predict/thingspeak", proxy),
        json!({ "api_key": "KEY" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sensor_arrays"][0][3], 4.0);
    assert_eq!(
        backend.last_body.lock().unwrap().clone(),
        Some(json!({ "api_key": "KEY" }))
    );
}

#[tokio::test]
async fn test_feed_prediction_requires_api_key() {
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, body) =
        post_json(format!("{}/predict/thingspeak", proxy), json!({ "api_key": "" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing api_key in request body");
    assert_eq!(backend.predict_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upstream_error_message_passes_through() {
    let app = Router::new().route(
        "/predict",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "model unavailable" })),
            )
        }),
    );
    let backend_url = spawn(app).await;
    let proxy = spawn_proxy(&backend_url).await;

    let (status, body) = post_json(
        format!("{}/predict", proxy),
        json!({ "sensor_data": [1, 2, 3, 4] }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "model unavailable" }));
}

#[tokio::test]
async fn test_health_merges_frontend_status() {
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, body) = get_json(format!("{}/health", proxy)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["models_loaded"], true);
    assert_eq!(body["frontend"]["service"], "E-Nose Dashboard");
    assert_eq!(body["frontend"]["backend_url"], backend.url.as_str());
}

#[tokio::test]
async fn test_health_degraded_when_backend_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let proxy = spawn_proxy(&format!("http://{}", addr)).await;

    let (status, body) = get_json(format!("{}/health", proxy)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["backend"]["status"], "unhealthy");
    assert_eq!(body["frontend"]["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_bad_gateway_on_backend_error() {
    let app = Router::new().route(
        "/health",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "boom" }))) }),
    );
    let backend_url = spawn(app).await;
    let proxy = spawn_proxy(&backend_url).await;

    let (status, body) = get_json(format!("{}/health", proxy)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["backend"]["error"], "boom");
}

#[tokio::test]
async fn test_models_forwarded_verbatim() {
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, body) = get_json(format!("{}/models", proxy)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "base_1": { "name": "Model 1" } }));
}

#[tokio::test]
async fn test_sensors_fall_back_to_builtin_catalog() {
    // Backend without a /sensors route answers 404
    let backend = spawn_backend().await;
    let proxy = spawn_proxy(&backend.url).await;

    let (status, body) = get_json(format!("{}/sensors", proxy)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sensor_count"], 4);
    assert_eq!(body["sensor_features"], json!(["MQ136", "MQ137", "TEMP", "HUMI"]));
}

#[tokio::test]
async fn test_sensors_forwarded_when_published() {
    let app = Router::new().route(
        "/sensors",
        get(|| async { Json(json!({ "sensor_count": 6 })) }),
    );
    let backend_url = spawn(app).await;
    let proxy = spawn_proxy(&backend_url).await;

    let (status, body) = get_json(format!("{}/sensors", proxy)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "sensor_count": 6 }));
}
