use tracing::debug;

use crate::feature_preprocessing::categorical_encoder::{BrandOneHot, TargetEncoder};
use crate::feature_preprocessing::feature_preprocessing_utils::{FeatureVector, RawDeviceSpec};
use crate::feature_preprocessing::processor_price_table::ProcessorPriceTable;
use crate::feature_preprocessing::processor_vectorizer::ProcessorVectorizer;
use crate::price_model::schema_resolver::{FeatureColumn, FeatureSchema};

/// Most recent launch year in the training data
pub const LAUNCH_YEAR: f64 = 2024.0;

/// Lookup tables for the categorical columns. Each one is optional on disk;
/// missing ones fall back to the built-in tables.
#[derive(Debug, Clone)]
pub struct EncodingTables {
    pub price_table: ProcessorPriceTable,
    pub target_encoder: TargetEncoder,
    pub vectorizer: Option<ProcessorVectorizer>,
}

impl Default for EncodingTables {
    fn default() -> Self {
        EncodingTables {
            price_table: ProcessorPriceTable::default(),
            target_encoder: TargetEncoder::Fallback,
            vectorizer: None,
        }
    }
}

/// Turns a raw device spec into the model's input row.
#[derive(Debug, Clone, Default)]
pub struct FeatureAssembler {
    tables: EncodingTables,
}

impl FeatureAssembler {
    pub fn new(tables: EncodingTables) -> Self {
        FeatureAssembler { tables }
    }

    pub fn tables(&self) -> &EncodingTables {
        &self.tables
    }

    /// One value per schema column, in schema order.
    pub fn assemble(&self, spec: &RawDeviceSpec, schema: &FeatureSchema) -> FeatureVector {
        let units = schema.generation.units();
        let one_hot = BrandOneHot::from_columns(schema.brand_columns());
        // Projected lazily, at most once per row
        let mut chip_vector: Option<Vec<f64>> = None;

        let mut features = FeatureVector::with_capacity(schema.len());
        for (name, column) in schema.names.iter().zip(&schema.columns) {
            let value = match column {
                FeatureColumn::Ram => units.ram(&spec.ram),
                FeatureColumn::FrontCamera => units.camera(spec.front_camera.as_deref()),
                FeatureColumn::BackCamera => units.camera(spec.back_camera.as_deref()),
                FeatureColumn::Battery => units.battery(spec.battery.as_deref()),
                FeatureColumn::ScreenSize => units.screen_size(spec.screen_size.as_deref()),
                FeatureColumn::Storage => units.storage(&spec.storage),
                FeatureColumn::Brand(column_brand) => one_hot.encode(&spec.brand, column_brand),
                FeatureColumn::ChipAveragePrice => self.tables.price_table.lookup(&spec.chip),
                FeatureColumn::ChipVector(component) => {
                    let projected = chip_vector.get_or_insert_with(|| self.project_chip(&spec.chip));
                    projected.get(*component).copied().unwrap_or(0.0)
                }
                FeatureColumn::BrandTargetEncoded => self.tables.target_encoder.encode_brand(&spec.brand),
                FeatureColumn::ChipTargetEncoded => self.tables.target_encoder.encode_chip(&spec.chip),
                FeatureColumn::LaunchYear => LAUNCH_YEAR,
                FeatureColumn::Unmapped => {
                    debug!("No mapping for column {:?}, filling 0.0", name);
                    0.0
                }
            };
            features.push(name, value);
        }
        features
    }

    fn project_chip(&self, chip: &str) -> Vec<f64> {
        match &self.tables.vectorizer {
            Some(vectorizer) => vectorizer.project(chip),
            None => {
                debug!("No processor vectorizer loaded, chip vector columns are 0.0");
                Vec::new()
            }
        }
    }
}
