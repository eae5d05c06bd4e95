use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{PricePredictionError, Result};
use crate::feature_preprocessing::value_normalizer::{StorageUnit, UnitConvention};
use crate::price_model::model_artifact::ModelArtifact;

pub const BRAND_COLUMN_PREFIX: &str = "Company_";
pub const CHIP_VECTOR_PREFIX: &str = "Processor_vec";
pub const CHIP_AVERAGE_PRICE_COLUMN: &str = "Processor_Avg_Price_Scaled";

/// Models trained on the target-encoded schema predict USD / 100
pub const TARGET_ENCODED_OUTPUT_SCALE: f64 = 100.0;

const NUMERIC_COLUMNS: [&str; 6] = ["RAM", "Front Camera", "Back Camera", "Battery Capacity", "Screen Size", "ROM"];
const ONE_HOT_COLUMNS: [&str; 6] = [
    "Company_Apple",
    "Company_Honor",
    "Company_Oppo",
    "Company_Other",
    "Company_Samsung",
    "Company_Vivo",
];

/// Training generation of the loaded model. Each generation fixes how brand and
/// chip are encoded, which units the measurements use and what unit the
/// prediction comes out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelGeneration {
    /// Brand one-hot, chip as TF-IDF + PCA components
    ProcessorVectorized,
    /// Brand one-hot, chip as its scaled average launch price
    AveragePrice,
    /// Brand and chip both target encoded
    TargetEncoded,
}

impl ModelGeneration {
    pub fn units(&self) -> UnitConvention {
        match self {
            ModelGeneration::ProcessorVectorized => UnitConvention {
                camera_divisor: 10.0,
                storage_unit: StorageUnit::Gigabytes,
            },
            ModelGeneration::AveragePrice | ModelGeneration::TargetEncoded => UnitConvention {
                camera_divisor: 1.0,
                storage_unit: StorageUnit::Terabytes,
            },
        }
    }

    /// Factor turning the raw model output into USD
    pub fn output_scale(&self) -> f64 {
        match self {
            ModelGeneration::TargetEncoded => TARGET_ENCODED_OUTPUT_SCALE,
            ModelGeneration::ProcessorVectorized | ModelGeneration::AveragePrice => 1.0,
        }
    }

    /// Column ordering the generation was trained with
    pub fn default_columns(&self) -> Vec<String> {
        let mut columns: Vec<&str> = NUMERIC_COLUMNS.to_vec();
        match self {
            ModelGeneration::ProcessorVectorized => {
                columns.extend(ONE_HOT_COLUMNS);
                columns.extend(["Processor_vec1", "Processor_vec2", "Processor_vec3"]);
            }
            ModelGeneration::AveragePrice => {
                columns.extend(ONE_HOT_COLUMNS);
                columns.push(CHIP_AVERAGE_PRICE_COLUMN);
            }
            ModelGeneration::TargetEncoded => {
                columns.extend(["Brand_Encoded", "Processor_Encoded"]);
            }
        }
        columns.into_iter().map(str::to_string).collect()
    }

    fn from_companions(companions: CompanionArtifacts) -> Option<Self> {
        if companions.target_encoder {
            Some(ModelGeneration::TargetEncoded)
        } else if companions.price_table {
            Some(ModelGeneration::AveragePrice)
        } else if companions.vectorizer {
            Some(ModelGeneration::ProcessorVectorized)
        } else {
            None
        }
    }
}

impl fmt::Display for ModelGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelGeneration::ProcessorVectorized => "processor_vectorized",
            ModelGeneration::AveragePrice => "average_price",
            ModelGeneration::TargetEncoded => "target_encoded",
        };
        f.write_str(name)
    }
}

/// Which optional artifacts were found next to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompanionArtifacts {
    pub target_encoder: bool,
    pub price_table: bool,
    pub vectorizer: bool,
}

/// Meaning of one schema column, decided from its name.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureColumn {
    Ram,
    FrontCamera,
    BackCamera,
    Battery,
    ScreenSize,
    Storage,
    /// One-hot indicator for the named brand ("Other" included)
    Brand(String),
    ChipAveragePrice,
    /// Zero-based PCA component of the vectorized chip name
    ChipVector(usize),
    BrandTargetEncoded,
    ChipTargetEncoded,
    LaunchYear,
    Unmapped,
}

impl FeatureColumn {
    pub fn parse(name: &str) -> Self {
        match name {
            "RAM" => FeatureColumn::Ram,
            "Front Camera" => FeatureColumn::FrontCamera,
            "Back Camera" => FeatureColumn::BackCamera,
            "Battery Capacity" => FeatureColumn::Battery,
            "Screen Size" => FeatureColumn::ScreenSize,
            "ROM" => FeatureColumn::Storage,
            "Launched Year" => FeatureColumn::LaunchYear,
            CHIP_AVERAGE_PRICE_COLUMN => FeatureColumn::ChipAveragePrice,
            // Checked before the one-hot prefix: "Company_Encoded" is not a brand
            "Brand_Encoded" | "Company_Encoded" => FeatureColumn::BrandTargetEncoded,
            "Processor_Encoded" | "Chip_Encoded" => FeatureColumn::ChipTargetEncoded,
            _ => {
                if let Some(brand) = name.strip_prefix(BRAND_COLUMN_PREFIX) {
                    if !brand.is_empty() {
                        return FeatureColumn::Brand(brand.to_string());
                    }
                }
                if let Some(n) = name.strip_prefix(CHIP_VECTOR_PREFIX) {
                    if let Ok(n) = n.parse::<usize>() {
                        if n >= 1 {
                            return FeatureColumn::ChipVector(n - 1);
                        }
                    }
                }
                FeatureColumn::Unmapped
            }
        }
    }

    fn marks(&self) -> Option<ModelGeneration> {
        match self {
            FeatureColumn::BrandTargetEncoded | FeatureColumn::ChipTargetEncoded => Some(ModelGeneration::TargetEncoded),
            FeatureColumn::ChipAveragePrice => Some(ModelGeneration::AveragePrice),
            FeatureColumn::ChipVector(_) => Some(ModelGeneration::ProcessorVectorized),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    ModelFeatureNames,
    PipelineFirstStep,
    DefaultOrdering,
}

/// Ordered feature names the loaded model expects, with their parsed meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    pub generation: ModelGeneration,
    pub source: SchemaSource,
    pub names: Vec<String>,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    pub fn new(generation: ModelGeneration, source: SchemaSource, names: Vec<String>) -> Self {
        let columns = names.iter().map(|n| FeatureColumn::parse(n)).collect();
        FeatureSchema {
            generation,
            source,
            names,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Brand names carried by one-hot columns, in schema order
    pub fn brand_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| match c {
            FeatureColumn::Brand(brand) => Some(brand.as_str()),
            _ => None,
        })
    }
}

/// Determine the feature schema of `model`.
///
/// Order of preference: the artifact's own `feature_names_in`, the first step
/// of a pipeline, then a default ordering chosen from the companion artifacts.
pub fn resolve_schema(model: &ModelArtifact, companions: CompanionArtifacts) -> Result<FeatureSchema> {
    let introspected = model
        .own_feature_names()
        .map(|names| (SchemaSource::ModelFeatureNames, names))
        .or_else(|| {
            model
                .first_step_feature_names()
                .map(|names| (SchemaSource::PipelineFirstStep, names))
        });

    if let Some((source, names)) = introspected {
        let columns: Vec<FeatureColumn> = names.iter().map(|n| FeatureColumn::parse(n)).collect();
        let generation = columns
            .iter()
            .find_map(FeatureColumn::marks)
            .or_else(|| ModelGeneration::from_companions(companions))
            .unwrap_or(ModelGeneration::AveragePrice);
        for (name, column) in names.iter().zip(&columns) {
            if *column == FeatureColumn::Unmapped {
                warn!("Model expects column {:?} which has no feature mapping; it will be 0.0", name);
            }
        }
        info!(
            "Resolved {} model features from {:?} ({} generation)",
            names.len(),
            source,
            generation
        );
        return Ok(FeatureSchema {
            generation,
            source,
            names: names.to_vec(),
            columns,
        });
    }

    let generation = ModelGeneration::from_companions(companions).ok_or_else(|| {
        PricePredictionError::SchemaResolution(
            "model exposes no feature names and no companion artifact selects a default ordering".to_string(),
        )
    })?;
    warn!(
        "Model exposes no feature names, using the default {} ordering",
        generation
    );
    Ok(FeatureSchema::new(
        generation,
        SchemaSource::DefaultOrdering,
        generation.default_columns(),
    ))
}
