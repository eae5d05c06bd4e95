//! Error types for the price prediction pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can surface from artifact loading or a prediction request.
///
/// Parse-level problems in the device spec never end up here: they resolve
/// to documented defaults inside the feature preprocessing.
#[derive(Error, Debug)]
pub enum PricePredictionError {
    /// Artifact file could not be read
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact file is not valid JSON for its expected shape
    #[error("failed to parse artifact {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Artifact parsed but cannot be used (inconsistent lengths, empty trees...)
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),

    /// No feature schema could be determined for the loaded model
    #[error("Cannot determine required feature names from model: {0}")]
    SchemaResolution(String),

    /// The model artifact raised while scoring the feature vector
    #[error("Model predict failed: {0}")]
    Prediction(String),
}

pub type Result<T> = std::result::Result<T, PricePredictionError>;
