use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::model::ModelError;
use crate::predict::ValidationError;
use crate::report::ReportError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No JSON received")]
    NoJson,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Prediction failed: {0}")]
    Model(#[from] ModelError),

    #[error("Report generation failed: {0}")]
    Report(#[from] ReportError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NoJson | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Model(_) | ApiError::Report(_) | ApiError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Rejected request: {}", self);
        }

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}
