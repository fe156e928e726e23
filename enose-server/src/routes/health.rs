use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use enose::DashboardError;

use crate::state::AppState;

const SERVICE_NAME: &str = "E-Nose Dashboard";

fn frontend_info(backend_url: Option<&str>) -> Value {
    let mut info = json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    });
    if let Some(url) = backend_url {
        info["backend_url"] = json!(url);
    }
    info
}

/// Backend health merged with this proxy's own status.
///
/// 503 when the backend cannot be reached, 502 when it answers badly.
pub async fn health(State(state): State<AppState>) -> Response {
    match state.client.get_json("/health").await {
        Ok(mut body) => {
            let frontend = frontend_info(Some(state.backend_url()));
            match body.as_object_mut() {
                Some(map) => {
                    map.insert("frontend".to_string(), frontend);
                }
                None => body = json!({ "backend": body, "frontend": frontend }),
            }
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            log::error!("Health API error: {}", e);
            let status = match e {
                DashboardError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::BAD_GATEWAY,
            };
            let message = e.to_string();
            let body = json!({
                "status": "degraded",
                "service": SERVICE_NAME,
                "error": message,
                "frontend": frontend_info(None),
                "backend": {
                    "status": "unhealthy",
                    "error": message,
                },
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            (status, Json(body)).into_response()
        }
    }
}
