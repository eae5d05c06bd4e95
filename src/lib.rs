pub mod api;
pub mod errors;
pub mod feature_preprocessing;
pub mod price_classifier;
pub mod price_model;
pub mod price_service;
pub mod utils;

use std::sync::{Arc, OnceLock};

pub use errors::{PricePredictionError, Result};
pub use feature_preprocessing::feature_preprocessing_utils::{FeatureVector, RawDeviceSpec};
pub use price_service::{PredictionResult, PricePredictor};
pub use utils::ServiceConfig;

// Loaded once, shared read-only for the process lifetime
static PRICE_PREDICTOR: OnceLock<Arc<PricePredictor>> = OnceLock::new();

/// Load the artifacts named by `config` into the process-wide predictor.
/// Later calls return the predictor from the first successful call.
pub fn initialize(config: &ServiceConfig) -> Result<Arc<PricePredictor>> {
    if let Some(predictor) = PRICE_PREDICTOR.get() {
        return Ok(Arc::clone(predictor));
    }
    let predictor = Arc::new(PricePredictor::load(config)?);
    Ok(Arc::clone(PRICE_PREDICTOR.get_or_init(|| predictor)))
}

/// Score one device with the process-wide predictor.
pub fn predict(spec: &RawDeviceSpec) -> Result<PredictionResult> {
    match PRICE_PREDICTOR.get() {
        Some(predictor) => predictor.predict(spec),
        None => Err(PricePredictionError::SchemaResolution(
            "no model loaded; call initialize first".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_initialize_then_predict() -> Result<()> {
        let config = ServiceConfig {
            model_dir: PathBuf::from("models"),
            ..Default::default()
        };
        let first = initialize(&config)?;
        let second = initialize(&ServiceConfig::default())?;
        assert!(Arc::ptr_eq(&first, &second));

        let spec = RawDeviceSpec::new("Samsung", "Snapdragon 8 Gen 2", "12GB", "256GB");
        let result = predict(&spec)?;
        assert_eq!(result, first.predict(&spec)?);
        assert_eq!(result.probabilities.len(), 4);
        Ok(())
    }
}
