use tracing::{debug, warn};

use crate::errors::{PricePredictionError, Result};
use crate::feature_preprocessing::feature_preprocessing_utils::FeatureVector;
use crate::price_model::model_artifact::ModelArtifact;
use crate::price_model::schema_resolver::ModelGeneration;
use crate::price_model::standard_scaler::StandardScaler;

/// Loaded model plus the generation-specific output convention.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: ModelArtifact,
    scaler: Option<StandardScaler>,
    output_scale: f64,
}

impl Predictor {
    pub fn new(model: ModelArtifact, scaler: Option<StandardScaler>, generation: ModelGeneration) -> Self {
        // A pipeline scales its own inputs
        let scaler = if model.is_pipeline() && scaler.is_some() {
            warn!("Ignoring the standalone scaler: the model pipeline carries its own preprocessing");
            None
        } else {
            scaler
        };
        Predictor {
            model,
            scaler,
            output_scale: generation.output_scale(),
        }
    }

    /// Predicted launch price in USD for one assembled row
    pub fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let values = match &self.scaler {
            Some(scaler) => scaler.transform(features.values())?,
            None => features.values().to_vec(),
        };
        let raw = self.model.predict(features.columns(), &values)?;
        let price = raw * self.output_scale;
        debug!("Model output {} scaled by {} -> {} USD", raw, self.output_scale, price);
        if !price.is_finite() {
            return Err(PricePredictionError::Prediction(format!(
                "rescaled prediction is not finite ({})",
                price
            )));
        }
        Ok(price)
    }
}
