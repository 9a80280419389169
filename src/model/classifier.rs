use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Number of model inputs: age, blood sugar, systolic and diastolic pressure.
pub const FEATURE_COUNT: usize = 4;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "bloodsugar_capped",
    "systolicBp_capped",
    "diastolicBp_capped",
];

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid model artifact: {0}")]
    Invalid(String),

    #[error("Model produced a non-finite score")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Non-Diabetic")]
    NonDiabetic,
    #[serde(rename = "Diabetic")]
    Diabetic,
}

impl Status {
    /// Maps the classifier's 0/1 output onto a label.
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            Status::Diabetic
        } else {
            Status::NonDiabetic
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::NonDiabetic => "Non-Diabetic",
            Status::Diabetic => "Diabetic",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Non-Diabetic" => Some(Status::NonDiabetic),
            "Diabetic" => Some(Status::Diabetic),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw feature row in model column order, before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub status: Status,
    /// Probability of the positive (diabetic) class.
    pub probability: f64,
}

#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    columns: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    version: String,
    #[serde(default)]
    description: Option<String>,
    features: Vec<String>,
    scaler: ScalerArtifact,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Standardizes a subset of the feature columns: `(x - mean) / scale`.
#[derive(Debug, Clone)]
pub struct Scaler {
    // (feature index, mean, scale)
    columns: Vec<(usize, f64, f64)>,
}

impl Scaler {
    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        let mut scaled = features.0;
        for &(index, mean, scale) in &self.columns {
            scaled[index] = (scaled[index] - mean) / scale;
        }
        FeatureVector(scaled)
    }
}

/// Logistic regression classifier with its fitted scaler, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Classifier {
    version: String,
    description: Option<String>,
    scaler: Scaler,
    coefficients: [f64; FEATURE_COUNT],
    intercept: f64,
}

impl Classifier {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_str(raw)?;
        Self::try_from(artifact)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Signed distance from the decision boundary for an already-scaled row.
    fn decision_function(&self, scaled: &FeatureVector) -> f64 {
        self.coefficients
            .iter()
            .zip(scaled.0.iter())
            .fold(self.intercept, |acc, (coef, x)| acc + coef * x)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, ModelError> {
        let scaled = self.scaler.transform(features);
        let z = self.decision_function(&scaled);
        if !z.is_finite() {
            return Err(ModelError::NonFinite);
        }

        let probability = 1.0 / (1.0 + (-z).exp());
        let class = u8::from(z > 0.0);

        Ok(Prediction {
            status: Status::from_class(class),
            probability,
        })
    }
}

impl TryFrom<ModelArtifact> for Classifier {
    type Error = ModelError;

    fn try_from(artifact: ModelArtifact) -> Result<Self, Self::Error> {
        if artifact.features.len() != FEATURE_COUNT
            || artifact
                .features
                .iter()
                .zip(FEATURE_NAMES.iter())
                .any(|(got, want)| got != want)
        {
            return Err(ModelError::Invalid(format!(
                "expected features {:?}, got {:?}",
                FEATURE_NAMES, artifact.features
            )));
        }

        let coefficients: [f64; FEATURE_COUNT] =
            artifact.coefficients.as_slice().try_into().map_err(|_| {
                ModelError::Invalid(format!(
                    "expected {} coefficients, got {}",
                    FEATURE_COUNT,
                    artifact.coefficients.len()
                ))
            })?;

        if !artifact.intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Invalid(
                "coefficients and intercept must be finite".to_string(),
            ));
        }

        let scaler = artifact.scaler;
        if scaler.mean.len() != scaler.columns.len() || scaler.scale.len() != scaler.columns.len() {
            return Err(ModelError::Invalid(format!(
                "scaler has {} columns but {} means and {} scales",
                scaler.columns.len(),
                scaler.mean.len(),
                scaler.scale.len()
            )));
        }

        let mut columns = Vec::with_capacity(scaler.columns.len());
        for ((name, mean), scale) in scaler
            .columns
            .iter()
            .zip(scaler.mean.iter())
            .zip(scaler.scale.iter())
        {
            let index = FEATURE_NAMES
                .iter()
                .position(|feature| feature == name)
                .ok_or_else(|| ModelError::Invalid(format!("unknown scaler column '{}'", name)))?;
            if !mean.is_finite() || !scale.is_finite() || *scale == 0.0 {
                return Err(ModelError::Invalid(format!(
                    "scaler column '{}' has invalid mean {} or scale {}",
                    name, mean, scale
                )));
            }
            columns.push((index, *mean, *scale));
        }

        Ok(Classifier {
            version: artifact.version,
            description: artifact.description,
            scaler: Scaler { columns },
            coefficients,
            intercept: artifact.intercept,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = include_str!("../../model/diabetes_model.json");

    fn classifier() -> Classifier {
        Classifier::from_json(ARTIFACT).expect("bundled artifact should load")
    }

    #[test]
    fn test_bundled_artifact_loads() {
        let model = classifier();
        assert_eq!(model.version(), "1.0.0");
        assert!(model.description().is_some());
    }

    #[test]
    fn test_age_is_not_scaled() {
        let model = classifier();
        let scaled = model
            .scaler
            .transform(&FeatureVector([45.0, 200.0, 150.0, 94.0]));
        assert!((scaled.0[0] - 45.0).abs() < f64::EPSILON);
        assert!((scaled.0[1] - 1.0).abs() < 1e-12);
        assert!((scaled.0[2] - 1.0).abs() < 1e-12);
        assert!((scaled.0[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_high_risk_patient_is_diabetic() {
        let prediction = classifier()
            .predict(&FeatureVector([45.0, 300.0, 140.0, 90.0]))
            .unwrap();
        assert_eq!(prediction.status, Status::Diabetic);
        assert!(prediction.probability > 0.5 && prediction.probability <= 1.0);
    }

    #[test]
    fn test_low_risk_patient_is_non_diabetic() {
        let prediction = classifier()
            .predict(&FeatureVector([30.0, 90.0, 115.0, 75.0]))
            .unwrap();
        assert_eq!(prediction.status, Status::NonDiabetic);
        assert!(prediction.probability < 0.5 && prediction.probability >= 0.0);
    }

    #[test]
    fn test_probability_matches_logistic_function() {
        // z = -2.2 + 0.03*40 + 1.8*0 + 0.35*0 + 0.2*0 = -1.0
        let prediction = classifier()
            .predict(&FeatureVector([40.0, 140.0, 130.0, 82.0]))
            .unwrap();
        let expected = 1.0 / (1.0 + 1.0_f64.exp());
        assert!((prediction.probability - expected).abs() < 1e-12);
        assert_eq!(prediction.status, Status::NonDiabetic);
    }

    #[test]
    fn test_rejects_wrong_coefficient_count() {
        let raw = ARTIFACT.replace("[0.03, 1.8, 0.35, 0.2]", "[0.03, 1.8]");
        let err = Classifier::from_json(&raw).unwrap_err();
        assert!(matches!(err, ModelError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_scale() {
        let raw = ARTIFACT.replace("[60.0, 20.0, 12.0]", "[60.0, 0.0, 12.0]");
        assert!(matches!(
            Classifier::from_json(&raw),
            Err(ModelError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_scaler_column() {
        let raw = ARTIFACT.replace(
            "\"columns\": [\"bloodsugar_capped\"",
            "\"columns\": [\"insulin\"",
        );
        assert!(matches!(
            Classifier::from_json(&raw),
            Err(ModelError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Classifier::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(Status::from_class(1).to_string(), "Diabetic");
        assert_eq!(Status::from_class(0).to_string(), "Non-Diabetic");
        assert_eq!(Status::parse("Diabetic"), Some(Status::Diabetic));
        assert_eq!(Status::parse("diabetic"), None);
        assert_eq!(
            serde_json::to_string(&Status::NonDiabetic).unwrap(),
            "\"Non-Diabetic\""
        );
    }
}
