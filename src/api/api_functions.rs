use actix_web::HttpResponse;
use tracing::error;

use crate::api::api_objects::{ErrorResponse, HealthResponse};
use crate::errors::PricePredictionError;
use crate::price_service::PricePredictor;

pub const SERVICE_BANNER: &str = "Device price prediction service. Endpoints: POST /predict, GET /health";

/// Schema and model failures are deployment problems: 500 with the cause attached
pub fn error_response(e: &PricePredictionError) -> HttpResponse {
    error!("Prediction failed: {}", e);
    HttpResponse::InternalServerError().json(ErrorResponse { detail: e.to_string() })
}

pub fn health_report(predictor: &PricePredictor) -> HealthResponse {
    let generation = predictor.generation();
    HealthResponse {
        status: "healthy".to_string(),
        model_loaded: generation.is_some(),
        generation: generation.map(|g| g.to_string()),
        feature_count: predictor.feature_count(),
    }
}
