use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::Local;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::model::Status;
use crate::predict::{
    AppState, PatientPayload, ValidationError, display_value, json_body, parse_body,
};
use crate::report::{ReportData, logo, render_report};

#[derive(Debug, Deserialize)]
pub struct ReportPayload {
    #[serde(flatten)]
    pub patient: PatientPayload,
    pub status: Option<String>,
    pub probability: Option<Value>,
}

fn required<'a, T>(value: &'a Option<T>, field: &'static str) -> Result<&'a T, ValidationError> {
    value.as_ref().ok_or(ValidationError::MissingField(field))
}

impl ReportPayload {
    pub fn into_report(self, generated_at: String) -> Result<ReportData, ValidationError> {
        let patient = &self.patient;
        let patient_id = required(&patient.patient_id, "patientId")?;
        let age = required(&patient.age, "age")?;
        let blood_sugar = required(&patient.bloodsugar_capped, "bloodsugar_capped")?;
        let systolic = required(&patient.systolic_bp, "systolicBp_capped")?;
        let diastolic = required(&patient.diastolic_bp, "diastolicBp_capped")?;
        let status = required(&self.status, "status")?;
        let probability = required(&self.probability, "probability")?;

        let status = Status::parse(status.trim())
            .ok_or_else(|| ValidationError::UnknownStatus(status.clone()))?;
        // Numbers are rounded like the prediction response; strings print as sent.
        let probability = match probability.as_f64() {
            Some(p) => format!("{:.4}", p),
            None => display_value(probability),
        };

        Ok(ReportData {
            patient_id: display_value(patient_id),
            patient_name: patient
                .patient_name
                .as_ref()
                .map(display_value)
                .unwrap_or_default(),
            age: display_value(age),
            blood_sugar: display_value(blood_sugar),
            systolic_bp: display_value(systolic),
            diastolic_bp: display_value(diastolic),
            status,
            probability,
            generated_at,
        })
    }
}

/// Keeps the identifier usable inside a Content-Disposition filename.
pub fn sanitize_filename(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "patient".to_string()
    } else {
        cleaned
    }
}

pub async fn generate_report(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let body: ReportPayload = parse_body(json_body(payload)?)?;
    let generated_at = Local::now().format("%Y-%m-%d %H:%M").to_string();
    let report = body.into_report(generated_at)?;

    let filename = format!("diabetes_report_{}.pdf", sanitize_filename(&report.patient_id));
    let candidates = logo::candidate_paths(state.config.logo_path.as_deref());
    let status = report.status;

    // Layout and compression are CPU-bound; keep them off the async workers.
    let pdf = tokio::task::spawn_blocking(move || {
        let logo = logo::load_logo(&candidates);
        render_report(&report, logo.as_deref())
    })
    .await??;

    tracing::info!(
        "Generated {} report {} ({} bytes)",
        status,
        filename,
        pdf.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        Bytes::from(pdf),
    )
        .into_response())
}
