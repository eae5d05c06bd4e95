use std::path::Path;

use tracing::{error, info};

use crate::errors::{PricePredictionError, Result};
use crate::feature_preprocessing::categorical_encoder::TargetEncoder;
use crate::feature_preprocessing::feature_preprocessing_utils::RawDeviceSpec;
use crate::feature_preprocessing::features_extractor::{EncodingTables, FeatureAssembler};
use crate::feature_preprocessing::processor_price_table::ProcessorPriceTable;
use crate::feature_preprocessing::processor_vectorizer::ProcessorVectorizer;
use crate::price_classifier::{PriceBand, classify, convert_currency};
use crate::price_model::model_artifact::ModelArtifact;
use crate::price_model::price_prediction::Predictor;
use crate::price_model::schema_resolver::{CompanionArtifacts, FeatureSchema, ModelGeneration, resolve_schema};
use crate::price_model::standard_scaler::StandardScaler;
use crate::utils::{ServiceConfig, load_optional_artifact};

pub const MODEL_FILE: &str = "price_predictor.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const PRICE_TABLE_FILE: &str = "processor_price_table.json";
pub const TARGET_ENCODER_FILE: &str = "target_encoder.json";
pub const VECTORIZER_FILE: &str = "processor_vectorizer.json";
pub const PCA_FILE: &str = "processor_pca.json";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    /// USD, rounded to cents
    pub price_usd: f64,
    pub price_vnd: i64,
    pub band: i64,
    pub probabilities: Vec<f64>,
}

/// Every artifact needed to score a device, loaded once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct PricePredictor {
    // Resolution failures are kept and reported on each request
    schema: std::result::Result<FeatureSchema, String>,
    assembler: FeatureAssembler,
    predictor: Predictor,
    usd_to_vnd: f64,
    bands: Vec<PriceBand>,
}

impl PricePredictor {
    /// Load the model and its companion artifacts from `config.model_dir`.
    /// Only the model itself is required.
    pub fn load(config: &ServiceConfig) -> Result<Self> {
        let dir = config.model_dir.as_path();
        let model = ModelArtifact::load(&dir.join(MODEL_FILE))?;
        info!("Loaded model from {}", dir.join(MODEL_FILE).display());

        let scaler = load_optional_artifact(&dir.join(SCALER_FILE), StandardScaler::load);
        let price_table = load_optional_artifact(&dir.join(PRICE_TABLE_FILE), ProcessorPriceTable::load);
        let target_encoder = load_optional_artifact(&dir.join(TARGET_ENCODER_FILE), TargetEncoder::load);
        let vectorizer = load_optional_artifact(&dir.join(VECTORIZER_FILE), |path: &Path| {
            ProcessorVectorizer::load(path, &dir.join(PCA_FILE))
        });

        let companions = CompanionArtifacts {
            target_encoder: target_encoder.is_some(),
            price_table: price_table.is_some(),
            vectorizer: vectorizer.is_some(),
        };
        let tables = EncodingTables {
            price_table: price_table.unwrap_or_default(),
            target_encoder: target_encoder.unwrap_or(TargetEncoder::Fallback),
            vectorizer,
        };
        Ok(Self::from_parts(model, scaler, tables, companions, config))
    }

    /// Assemble a predictor from already loaded artifacts
    pub fn from_parts(
        model: ModelArtifact,
        scaler: Option<StandardScaler>,
        tables: EncodingTables,
        companions: CompanionArtifacts,
        config: &ServiceConfig,
    ) -> Self {
        let schema = resolve_schema(&model, companions).map_err(|e| {
            error!("{}", e);
            match e {
                PricePredictionError::SchemaResolution(reason) => reason,
                other => other.to_string(),
            }
        });
        // Without a schema no request reaches the model, so the output scale is moot
        let generation = schema
            .as_ref()
            .map(|s| s.generation)
            .unwrap_or(ModelGeneration::AveragePrice);
        PricePredictor {
            schema,
            assembler: FeatureAssembler::new(tables),
            predictor: Predictor::new(model, scaler, generation),
            usd_to_vnd: config.usd_to_vnd,
            bands: config.pricing_bands.clone(),
        }
    }

    pub fn schema(&self) -> Result<&FeatureSchema> {
        self.schema
            .as_ref()
            .map_err(|reason| PricePredictionError::SchemaResolution(reason.clone()))
    }

    pub fn generation(&self) -> Option<ModelGeneration> {
        self.schema.as_ref().ok().map(|s| s.generation)
    }

    pub fn feature_count(&self) -> usize {
        self.schema.as_ref().map_or(0, FeatureSchema::len)
    }

    pub fn bands(&self) -> &[PriceBand] {
        &self.bands
    }

    pub fn predict(&self, spec: &RawDeviceSpec) -> Result<PredictionResult> {
        let schema = self.schema()?;
        let features = self.assembler.assemble(spec, schema);
        let price = self.predictor.predict(&features)?;

        let price_vnd = convert_currency(price, self.usd_to_vnd);
        let classification = classify(price_vnd as f64, &self.bands);
        info!(
            "Predicted {:.2} USD ({} VND, band {}) for {} {}",
            price, price_vnd, classification.band, spec.brand, spec.chip
        );
        Ok(PredictionResult {
            price_usd: (price * 100.0).round() / 100.0,
            price_vnd,
            band: classification.band,
            probabilities: classification.probabilities,
        })
    }
}
