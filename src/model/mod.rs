pub mod classifier;

pub use classifier::{Classifier, FeatureVector, ModelError, Status};
