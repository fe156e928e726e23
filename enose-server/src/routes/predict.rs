use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use enose::core::CHANNEL_COUNT;
use enose::DashboardError;

use crate::error::ApiError;
use crate::state::AppState;

fn parse_body(body: &Bytes) -> Result<Value, DashboardError> {
    serde_json::from_slice(body)
        .map_err(|_| DashboardError::validation("Request body must be a JSON object"))
}

/// Check `sensor_data` is an array of exactly four numbers
pub fn validate_sensor_data(body: &Value) -> Result<Vec<f64>, DashboardError> {
    let Some(raw) = body.get("sensor_data") else {
        return Err(DashboardError::Validation {
            message: "Missing sensor_data in request body".to_string(),
            expected: Some(CHANNEL_COUNT),
            received: None,
        });
    };
    let Some(values) = raw.as_array() else {
        return Err(DashboardError::Validation {
            message: format!("sensor_data must be an array of {} numbers", CHANNEL_COUNT),
            expected: Some(CHANNEL_COUNT),
            received: None,
        });
    };
    if values.len() != CHANNEL_COUNT {
        return Err(DashboardError::length_mismatch(
            format!("sensor_data must contain exactly {} values", CHANNEL_COUNT),
            CHANNEL_COUNT,
            values.len(),
        ));
    }
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| DashboardError::validation("sensor_data values must be numbers"))
        })
        .collect()
}

pub fn validate_api_key(body: &Value) -> Result<String, DashboardError> {
    match body.get("api_key").and_then(Value::as_str).map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(DashboardError::validation("Missing api_key in request body")),
    }
}

/// Classify directly entered readings
pub async fn predict(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body = parse_body(&body)
        .and_then(|b| validate_sensor_data(&b).map(|_| b))
        .map_err(|e| {
            log::warn!("Rejected prediction request: {}", e);
            ApiError(e)
        })?;

    // Readings go upstream exactly as the caller sent them
    state
        .client
        .post_json("/predict", &json!({ "sensor_data": body["sensor_data"] }))
        .await
        .map(Json)
        .map_err(|e| {
            log::error!("Prediction API error: {}", e);
            ApiError(e)
        })
}

/// Classify the latest readings of a telemetry feed
pub async fn predict_thingspeak(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let api_key = parse_body(&body)
        .and_then(|b| validate_api_key(&b))
        .map_err(|e| {
            log::warn!("Rejected feed prediction request: {}", e);
            ApiError(e)
        })?;

    state
        .client
        .post_json("/predict", &json!({ "api_key": api_key }))
        .await
        .map(Json)
        .map_err(|e| {
            log::error!("ThingSpeak Prediction API error: {}", e);
            ApiError(e)
        })
}
