use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::FeatureVector;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("All fields are required")]
    MissingFields,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0} must be a number")]
    NotNumeric(&'static str),

    #[error("Age must be between 1 and 120")]
    AgeOutOfRange,

    #[error("Blood sugar must be between 20 and 1000")]
    BloodSugarOutOfRange,

    #[error("Systolic BP must be between 50 and 250")]
    SystolicOutOfRange,

    #[error("Diastolic BP must be between 30 and 150")]
    DiastolicOutOfRange,

    #[error("Unknown prediction status: {0}")]
    UnknownStatus(String),

    #[error("Invalid request body: {0}")]
    Malformed(String),
}

/// Reads a numeric field sent either as a JSON number or a numeric string.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Renders a field the way it should appear in text: strings without quotes.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Patient fields shared by the prediction and report endpoints.
/// Fields stay loosely typed so a wrong type is reported against its field name;
/// `null` deserializes to `None` and is treated as missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientPayload {
    #[serde(rename = "patientId")]
    pub patient_id: Option<Value>,
    #[serde(rename = "patientName")]
    pub patient_name: Option<Value>,
    pub age: Option<Value>,
    pub bloodsugar_capped: Option<Value>,
    #[serde(rename = "systolicBp_capped")]
    pub systolic_bp: Option<Value>,
    #[serde(rename = "diastolicBp_capped")]
    pub diastolic_bp: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatientVitals {
    pub age: u32,
    pub blood_sugar: f64,
    pub systolic_bp: f64,
    pub diastolic_bp: f64,
}

impl PatientVitals {
    pub fn features(&self) -> FeatureVector {
        FeatureVector([
            f64::from(self.age),
            self.blood_sugar,
            self.systolic_bp,
            self.diastolic_bp,
        ])
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedPatient {
    pub patient_id: Value,
    /// Echoed back as sent; empty string when absent.
    pub patient_name: Value,
    pub vitals: PatientVitals,
}

fn numeric(field: &'static str, value: &Value) -> Result<f64, ValidationError> {
    number(value).ok_or(ValidationError::NotNumeric(field))
}

fn in_range(value: f64, min: f64, max: f64) -> bool {
    (min..=max).contains(&value)
}

impl PatientPayload {
    /// Checks presence of every required field, then each range in turn.
    pub fn validate(&self) -> Result<ValidatedPatient, ValidationError> {
        let (Some(patient_id), Some(age), Some(blood_sugar), Some(systolic), Some(diastolic)) = (
            &self.patient_id,
            &self.age,
            &self.bloodsugar_capped,
            &self.systolic_bp,
            &self.diastolic_bp,
        ) else {
            return Err(ValidationError::MissingFields);
        };

        // Age is an integer feature; fractional input is truncated like int().
        let age = numeric("age", age)?.trunc();
        if !(age > 0.0 && age <= 120.0) {
            return Err(ValidationError::AgeOutOfRange);
        }

        let blood_sugar = numeric("bloodsugar_capped", blood_sugar)?;
        if !in_range(blood_sugar, 20.0, 1000.0) {
            return Err(ValidationError::BloodSugarOutOfRange);
        }

        let systolic_bp = numeric("systolicBp_capped", systolic)?;
        if !in_range(systolic_bp, 50.0, 250.0) {
            return Err(ValidationError::SystolicOutOfRange);
        }

        let diastolic_bp = numeric("diastolicBp_capped", diastolic)?;
        if !in_range(diastolic_bp, 30.0, 150.0) {
            return Err(ValidationError::DiastolicOutOfRange);
        }

        Ok(ValidatedPatient {
            patient_id: patient_id.clone(),
            patient_name: self
                .patient_name
                .clone()
                .unwrap_or_else(|| Value::String(String::new())),
            vitals: PatientVitals {
                age: age as u32,
                blood_sugar,
                systolic_bp,
                diastolic_bp,
            },
        })
    }
}
