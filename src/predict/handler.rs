use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::config::Config;
use crate::error::ApiError;
use crate::model::{Classifier, Status};
use crate::predict::patient::{PatientPayload, ValidationError, display_value};
use crate::predict::recommendations;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub model: Classifier,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    #[serde(rename = "patientId")]
    pub patient_id: Value,
    #[serde(rename = "patientName")]
    pub patient_name: Value,
    pub status: Status,
    pub probability: String,
    pub recommendations: &'static [&'static str],
    pub timestamp: String,
}

/// Unwraps a JSON body, treating a missing, unparsable, `null` or `{}` body alike.
pub fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let Json(value) = payload.map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::NoJson
    })?;

    match &value {
        Value::Null => Err(ApiError::NoJson),
        Value::Object(map) if map.is_empty() => Err(ApiError::NoJson),
        _ => Ok(value),
    }
}

pub fn parse_body<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::Validation(ValidationError::Malformed(e.to_string())))
}

pub async fn home(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "active",
        "service": "Diabetes Prediction API",
        "model_loaded": true,
        "model_version": state.model.version(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let body: PatientPayload = parse_body(json_body(payload)?)?;
    let patient = body.validate()?;

    let prediction = state.model.predict(&patient.vitals.features())?;
    tracing::info!(
        "Prediction for patient {}: {} (p={:.4})",
        display_value(&patient.patient_id),
        prediction.status,
        prediction.probability
    );

    Ok(Json(PredictResponse {
        patient_id: patient.patient_id,
        patient_name: patient.patient_name,
        status: prediction.status,
        probability: format!("{:.4}", prediction.probability),
        recommendations: recommendations::for_status(prediction.status),
        timestamp: Utc::now().to_rfc3339(),
    }))
}
