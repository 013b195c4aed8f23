use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::{
    metrics::gather_metrics,
    step::{GeneratePdfInput, StepDispatcher, StepInput},
    Error,
};

#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub result: Option<Value>,
}

/// Maps crate errors onto HTTP statuses.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_client_fault() => StatusCode::BAD_REQUEST,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Step failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn api_call(
    State(dispatcher): State<Arc<StepDispatcher>>,
    Json(input): Json<StepInput>,
) -> Result<Json<StepResponse>, ApiError> {
    let result = dispatcher.api_call(&input).await?;
    Ok(Json(StepResponse { result }))
}

pub async fn generate_pdf(
    State(dispatcher): State<Arc<StepDispatcher>>,
    Json(input): Json<GeneratePdfInput>,
) -> Result<Json<StepResponse>, ApiError> {
    let result = dispatcher.generate_pdf(&input).await?;
    Ok(Json(StepResponse {
        result: Some(result),
    }))
}

pub async fn metrics() -> Result<String, ApiError> {
    Ok(gather_metrics()?)
}
