pub mod model_artifact;
pub mod price_prediction;
pub mod schema_resolver;
pub mod standard_scaler;
