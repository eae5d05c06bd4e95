use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use device_price_predictor::api::api_handlers::configure;
use device_price_predictor::utils::load_config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config();
    info!(
        "Loading models from {} (USD->VND {}, {} price bands)",
        config.model_dir.display(),
        config.usd_to_vnd,
        config.pricing_bands.len()
    );
    let predictor = device_price_predictor::initialize(&config)
        .with_context(|| format!("failed to load models from {}", config.model_dir.display()))?;
    match predictor.schema() {
        Ok(schema) => info!(
            "Serving the {} model with {} features",
            schema.generation,
            schema.len()
        ),
        Err(e) => tracing::error!("{}; every prediction will fail", e),
    }

    let predictor = web::Data::new(predictor);
    info!("Server started on {}:{}", config.host, config.port);
    HttpServer::new(move || App::new().app_data(predictor.clone()).configure(configure))
        .bind((config.host.as_str(), config.port))
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
        .run()
        .await
        .context("server terminated with an error")
}
