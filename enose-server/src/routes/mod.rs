pub mod health;
pub mod models;
pub mod predict;
pub mod sensors;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/models", get(models::models))
        .route("/sensors", get(sensors::sensors))
        .route("/predict", post(predict::predict))
        .route("/predict/thingspeak", post(predict::predict_thingspeak))
        .with_state(state)
}
