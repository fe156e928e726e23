use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use enose::DashboardError;

/// Uniform `{ "error": message }` failure body for every proxy route
#[derive(Debug)]
pub struct ApiError(pub DashboardError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DashboardError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> Value {
        let mut body = json!({ "error": self.message() });
        if let DashboardError::Validation {
            expected, received, ..
        } = &self.0
        {
            if let Some(expected) = expected {
                body["expected"] = json!(expected);
            }
            if let Some(received) = received {
                body["received"] = json!(received);
            }
        }
        body
    }

    /// Message shown to the user; upstream messages pass through untouched
    pub fn message(&self) -> String {
        self.0.to_string()
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
