use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{PricePredictionError, Result};
use crate::utils::read_json_artifact;

/// Brands with their own one-hot column in the default schemas
pub const KNOWN_BRANDS: [&str; 5] = ["Apple", "Honor", "Oppo", "Samsung", "Vivo"];
pub const OTHER_BRAND: &str = "Other";

/// Training-set mean of the scaled launch price (USD / 100)
pub const GLOBAL_TARGET_MEAN: f64 = 4.37;

lazy_static! {
    // Mean scaled launch price per brand, keyed by lowercase brand
    static ref FALLBACK_BRAND_MEANS: HashMap<&'static str, f64> = HashMap::from([
        ("apple", 9.46),
        ("samsung", 6.83),
        ("google", 6.91),
        ("sony", 7.12),
        ("huawei", 5.87),
        ("oneplus", 5.64),
        ("honor", 4.32),
        ("oppo", 4.18),
        ("vivo", 3.94),
        ("xiaomi", 3.61),
        ("motorola", 3.24),
        ("lenovo", 3.02),
        ("poco", 2.91),
        ("realme", 2.63),
        ("nokia", 2.41),
        ("tecno", 1.93),
        ("infinix", 1.82),
    ]);
}

// Chip family fragments, most specific first; the first fragment contained in
// the lowercase chip name wins.
const FALLBACK_CHIP_MEANS: &[(&str, f64)] = &[
    ("a18", 11.12),
    ("a17", 10.47),
    ("a16", 9.21),
    ("a15", 7.94),
    ("a14", 6.93),
    ("a13", 6.12),
    ("snapdragon 8 gen 3", 9.83),
    ("snapdragon 8 gen 2", 8.41),
    ("snapdragon 8 gen 1", 7.22),
    ("snapdragon 888", 6.52),
    ("snapdragon 8", 6.74),
    ("exynos 2400", 9.04),
    ("exynos", 4.92),
    ("tensor", 7.13),
    ("kirin 9", 7.41),
    ("kirin", 4.03),
    ("dimensity 9", 6.81),
    ("dimensity 8", 4.62),
    ("dimensity 7", 3.13),
    ("dimensity 6", 2.24),
    ("snapdragon 7", 4.21),
    ("snapdragon 6", 2.93),
    ("snapdragon 4", 1.84),
    ("helio", 1.71),
    ("unisoc", 1.22),
];

/// Brand one-hot encoding over a fixed set of brands plus an "Other" catch-all.
#[derive(Debug, Clone)]
pub struct BrandOneHot {
    known: Vec<String>,
}

impl BrandOneHot {
    /// Known brands are the schema's own brand columns; without any, the fixed set.
    pub fn from_columns<'a, I>(brand_columns: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut known: Vec<String> = brand_columns
            .into_iter()
            .filter(|b| !b.eq_ignore_ascii_case(OTHER_BRAND))
            .map(str::to_string)
            .collect();
        if known.is_empty() {
            known = KNOWN_BRANDS.iter().map(|b| b.to_string()).collect();
        }
        BrandOneHot { known }
    }

    pub fn is_known(&self, brand: &str) -> bool {
        let brand = brand.trim();
        self.known.iter().any(|k| k.eq_ignore_ascii_case(brand))
    }

    /// Value of the one-hot column for `column_brand` given the device brand.
    pub fn encode(&self, brand: &str, column_brand: &str) -> f64 {
        let hit = if column_brand.eq_ignore_ascii_case(OTHER_BRAND) {
            !self.is_known(brand)
        } else {
            column_brand.eq_ignore_ascii_case(brand.trim())
        };
        if hit { 1.0 } else { 0.0 }
    }
}

/// Learned target encoder exported from the training run.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetEncoderArtifact {
    pub brand: HashMap<String, f64>,
    pub chip: HashMap<String, f64>,
    #[serde(default = "default_global_mean")]
    pub global_mean: f64,
}

fn default_global_mean() -> f64 {
    GLOBAL_TARGET_MEAN
}

impl TargetEncoderArtifact {
    fn lookup(table: &HashMap<String, f64>, value: &str) -> Option<f64> {
        let value = value.trim();
        table.get(value).copied().or_else(|| {
            // Smallest matching key wins so case variants resolve identically on every run
            table
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(value))
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(_, v)| *v)
        })
    }
}

/// Target encoding for brand and chip identity.
#[derive(Debug, Clone)]
pub enum TargetEncoder {
    Learned(TargetEncoderArtifact),
    /// Precomputed per-brand and per-chip-family means
    Fallback,
}

impl TargetEncoder {
    pub fn load(path: &Path) -> Result<Self> {
        let artifact: TargetEncoderArtifact = read_json_artifact(path)?;
        if !artifact.global_mean.is_finite() {
            return Err(PricePredictionError::InvalidArtifact(format!(
                "target encoder {} has a non-finite global mean",
                path.display()
            )));
        }
        Ok(TargetEncoder::Learned(artifact))
    }

    pub fn encode_brand(&self, brand: &str) -> f64 {
        match self {
            TargetEncoder::Learned(artifact) => {
                TargetEncoderArtifact::lookup(&artifact.brand, brand).unwrap_or(artifact.global_mean)
            }
            TargetEncoder::Fallback => {
                let key = brand.trim().to_lowercase();
                FALLBACK_BRAND_MEANS.get(key.as_str()).copied().unwrap_or_else(|| {
                    debug!("No brand mean for {:?}, using global mean", brand);
                    GLOBAL_TARGET_MEAN
                })
            }
        }
    }

    pub fn encode_chip(&self, chip: &str) -> f64 {
        match self {
            TargetEncoder::Learned(artifact) => {
                TargetEncoderArtifact::lookup(&artifact.chip, chip).unwrap_or(artifact.global_mean)
            }
            TargetEncoder::Fallback => {
                let key = chip.trim().to_lowercase();
                FALLBACK_CHIP_MEANS
                    .iter()
                    .find(|(fragment, _)| key.contains(fragment))
                    .map(|(_, mean)| *mean)
                    .unwrap_or_else(|| {
                        debug!("No chip family mean for {:?}, using global mean", chip);
                        GLOBAL_TARGET_MEAN
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_default_brands() {
        let one_hot = BrandOneHot::from_columns(std::iter::empty());
        assert_eq!(one_hot.encode("Samsung", "Samsung"), 1.0);
        assert_eq!(one_hot.encode("samsung ", "Samsung"), 1.0);
        assert_eq!(one_hot.encode("Samsung", "Apple"), 0.0);
        assert_eq!(one_hot.encode("Samsung", "Other"), 0.0);
        assert_eq!(one_hot.encode("Xiaomi", "Other"), 1.0);
        assert_eq!(one_hot.encode("Xiaomi", "Samsung"), 0.0);
    }

    #[test]
    fn test_one_hot_uses_schema_brands() {
        let one_hot = BrandOneHot::from_columns(["Apple", "Xiaomi", "Other"]);
        assert_eq!(one_hot.encode("Xiaomi", "Xiaomi"), 1.0);
        assert_eq!(one_hot.encode("Xiaomi", "Other"), 0.0);
        assert_eq!(one_hot.encode("Samsung", "Other"), 1.0);
    }

    #[test]
    fn test_fallback_target_encoding() {
        let encoder = TargetEncoder::Fallback;
        assert_eq!(encoder.encode_brand("Apple"), 9.46);
        assert_eq!(encoder.encode_brand("  SAMSUNG"), 6.83);
        assert_eq!(encoder.encode_brand("Nothing Phone"), GLOBAL_TARGET_MEAN);
        assert_eq!(encoder.encode_chip("Snapdragon 8 Gen 2"), 8.41);
        assert_eq!(encoder.encode_chip("Apple A17 Pro"), 10.47);
        assert_eq!(encoder.encode_chip("MediaTek Helio G99"), 1.71);
        assert_eq!(encoder.encode_chip("Mystery X1"), GLOBAL_TARGET_MEAN);
    }

    #[test]
    fn test_learned_target_encoding() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("target_encoder.json");
        std::fs::write(
            &path,
            r#"{"brand": {"Apple": 9.9, "Samsung": 7.0}, "chip": {"A17 Bionic": 10.1}, "global_mean": 4.5}"#,
        )?;
        let encoder = TargetEncoder::load(&path)?;
        assert_eq!(encoder.encode_brand("apple"), 9.9);
        assert_eq!(encoder.encode_brand("Vivo"), 4.5);
        assert_eq!(encoder.encode_chip("A17 Bionic"), 10.1);
        assert_eq!(encoder.encode_chip("Snapdragon 8 Gen 2"), 4.5);
        Ok(())
    }

    #[test]
    fn test_learned_encoding_case_variants_are_stable() {
        for _ in 0..20 {
            let encoder = TargetEncoder::Learned(TargetEncoderArtifact {
                brand: HashMap::from([
                    ("apple".to_string(), 9.9),
                    ("APPLE".to_string(), 9.0),
                    ("Apple".to_string(), 9.5),
                ]),
                chip: HashMap::new(),
                global_mean: GLOBAL_TARGET_MEAN,
            });
            assert_eq!(encoder.encode_brand("aPPLE"), 9.0);
        }
    }

    #[test]
    fn test_learned_encoder_missing_file() {
        assert!(TargetEncoder::load(Path::new("no/such/encoder.json")).is_err());
    }
}
