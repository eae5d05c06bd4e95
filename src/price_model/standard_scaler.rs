use std::path::Path;

use serde::Deserialize;

use crate::errors::{PricePredictionError, Result};
use crate::utils::read_json_artifact;

#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    #[serde(default)]
    var: Option<Vec<f64>>,
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
}

impl StandardScaler {
    pub fn load(scaler_file_path: &Path) -> Result<Self> {
        let scaler: StandardScaler = read_json_artifact(scaler_file_path)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn validate(&self) -> Result<()> {
        let width = self.mean.len();
        let var_width = self.var.as_ref().map_or(width, Vec::len);
        if width == 0 || self.scale.len() != width || var_width != width {
            return Err(PricePredictionError::InvalidArtifact(format!(
                "standard scaler has mean/scale/var of lengths {}/{}/{}",
                width,
                self.scale.len(),
                var_width
            )));
        }
        if self.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(PricePredictionError::InvalidArtifact(
                "standard scaler has a zero or non-finite scale".to_string(),
            ));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Equivalent to sklearn's StandardScaler.transform(X) for a single row
    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.width() {
            return Err(PricePredictionError::Prediction(format!(
                "X has {} features, but StandardScaler is expecting {} features as input",
                x.len(),
                self.width()
            )));
        }
        Ok(x.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((&xi, &m), &s)| (xi - m) / s)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_transform() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let scaler: StandardScaler =
            serde_json::from_str(r#"{"mean": [8.0, 0.25, 4.5], "scale": [4.0, 0.125, 0.5], "var": [16.0, 0.015625, 0.25]}"#)?;
        scaler.validate()?;

        let x_scaled = scaler.transform(&[12.0, 0.5, 4.0])?;
        assert_eq!(x_scaled, vec![1.0, 2.0, -1.0]);
        Ok(())
    }

    #[test]
    fn test_scaler_rejects_wrong_width() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let scaler: StandardScaler = serde_json::from_str(r#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#)?;
        assert!(matches!(scaler.transform(&[1.0]), Err(PricePredictionError::Prediction(_))));
        Ok(())
    }

    #[test]
    fn test_scaler_validation() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let zero_scale: StandardScaler = serde_json::from_str(r#"{"mean": [0.0], "scale": [0.0]}"#)?;
        assert!(zero_scale.validate().is_err());
        let mismatched: StandardScaler = serde_json::from_str(r#"{"mean": [0.0, 1.0], "scale": [1.0]}"#)?;
        assert!(mismatched.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_load_missing_scaler() {
        assert!(matches!(
            StandardScaler::load(Path::new("no/such/scaler.json")),
            Err(PricePredictionError::Io { .. })
        ));
    }
}
