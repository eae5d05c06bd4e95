use std::sync::Arc;

use actix_web::{HttpResponse, Responder, web};

use crate::api::api_functions::{SERVICE_BANNER, error_response, health_report};
use crate::api::api_objects::{PredictRequest, PredictResponse};
use crate::feature_preprocessing::feature_preprocessing_utils::RawDeviceSpec;
use crate::price_service::PricePredictor;

pub async fn handle_root() -> impl Responder {
    HttpResponse::Ok().body(SERVICE_BANNER)
}

pub async fn handle_health(predictor: web::Data<Arc<PricePredictor>>) -> impl Responder {
    HttpResponse::Ok().json(health_report(&predictor))
}

pub async fn handle_predict(request: web::Json<PredictRequest>, predictor: web::Data<Arc<PricePredictor>>) -> impl Responder {
    let spec: RawDeviceSpec = request.into_inner().into();
    match predictor.predict(&spec) {
        Ok(result) => HttpResponse::Ok().json(PredictResponse::from(result)),
        Err(e) => error_response(&e),
    }
}

/// Route table shared by the server and the handler tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handle_root))
        .route("/health", web::get().to(handle_health))
        .route("/predict", web::post().to(handle_predict));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test};

    use crate::api::api_objects::{ErrorResponse, HealthResponse};
    use crate::feature_preprocessing::features_extractor::EncodingTables;
    use crate::price_model::model_artifact::ModelArtifact;
    use crate::price_model::schema_resolver::CompanionArtifacts;
    use crate::utils::ServiceConfig;

    fn predictor(model_json: &str) -> web::Data<Arc<PricePredictor>> {
        let model: ModelArtifact = serde_json::from_str(model_json).expect("valid model json");
        let predictor = PricePredictor::from_parts(
            model,
            None,
            EncodingTables::default(),
            CompanionArtifacts::default(),
            &ServiceConfig::default(),
        );
        web::Data::new(Arc::new(predictor))
    }

    const RAM_ROM_MODEL: &str =
        r#"{"feature_names_in": ["RAM", "ROM"], "estimator": {"type": "linear", "coef": [50.0, 800.0], "intercept": 0.0}}"#;

    #[actix_web::test]
    async fn test_predict_endpoint() {
        let app = test::init_service(App::new().app_data(predictor(RAM_ROM_MODEL)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({
                "ram_gb": "8GB",
                "rom_option": "256GB",
                "chip": "Dimensity 7200",
                "brand": "Xiaomi",
                "mobile_weight_g": 190
            }))
            .to_request();
        let response: PredictResponse = test::call_and_read_body_json(&app, req).await;
        // 8*50 + 0.25*800 = 600 USD -> 15M VND
        assert_eq!(response.price_usd, 600.0);
        assert_eq!(response.price_vnd, 15_000_000);
        assert_eq!(response.band, 2);
        assert_eq!(response.proba.len(), 4);
    }

    #[actix_web::test]
    async fn test_predict_without_schema_is_500() {
        let app = test::init_service(
            App::new()
                .app_data(predictor(r#"{"estimator": {"type": "linear", "coef": [1.0], "intercept": 0.0}}"#))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({"ram_gb": 8, "rom_option": 128, "chip": "A15", "brand": "Apple"}))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = test::read_body_json(response).await;
        assert!(body.detail.starts_with("Cannot determine required feature names"));
    }

    #[actix_web::test]
    async fn test_malformed_request_is_400() {
        let app = test::init_service(App::new().app_data(predictor(RAM_ROM_MODEL)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(serde_json::json!({"ram_gb": 8}))
            .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health_and_root() {
        let app = test::init_service(App::new().app_data(predictor(RAM_ROM_MODEL)).configure(configure)).await;
        let health: HealthResponse =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(health.status, "healthy");
        assert!(health.model_loaded);
        assert_eq!(health.generation.as_deref(), Some("average_price"));
        assert_eq!(health.feature_count, 2);

        let root = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(root.status(), StatusCode::OK);
    }
}
