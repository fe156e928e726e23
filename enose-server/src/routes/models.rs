use axum::extract::State;
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// Model catalogue, forwarded verbatim
pub async fn models(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.client.get_json("/models").await.map(Json).map_err(|e| {
        log::error!("Models API error: {}", e);
        ApiError(e)
    })
}
