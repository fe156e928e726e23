use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use enose::core::{Channel, CHANNEL_COUNT};
use enose::DashboardError;

use crate::error::ApiError;
use crate::state::AppState;

/// Sensor catalogue from the prediction service, or the built-in one when the
/// service does not publish `/sensors`
pub async fn sensors(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.client.get_json("/sensors").await {
        Ok(body) => Ok(Json(body)),
        Err(DashboardError::Upstream { status: 404, .. }) => {
            log::debug!("Prediction service has no /sensors, serving built-in catalogue");
            Ok(Json(builtin_catalog()))
        }
        Err(e) => {
            log::error!("Sensors API error: {}", e);
            Err(ApiError(e))
        }
    }
}

pub fn builtin_catalog() -> Value {
    let features: Vec<&str> = Channel::ALL.iter().map(|c| c.sensor_name()).collect();
    json!({
        "sensor_features": features,
        "sensor_count": CHANNEL_COUNT,
        "sensor_types": {
            "gas_sensors": [Channel::GasA.sensor_name(), Channel::GasB.sensor_name()],
            "environmental_sensors": [
                Channel::Temperature.sensor_name(),
                Channel::Humidity.sensor_name()
            ]
        },
        "sensor_descriptions": {
            "MQ136": "Multi-purpose gas sensor",
            "MQ137": "Ammonia gas sensor",
            "TEMP": "Temperature (°C)",
            "HUMI": "Humidity (%)"
        }
    })
}
