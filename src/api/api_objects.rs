use serde::{Deserialize, Serialize};

use crate::feature_preprocessing::feature_preprocessing_utils::RawDeviceSpec;
use crate::price_service::PredictionResult;

/// A measurement as sent by clients: either a bare number (12) or text with a unit ("12GB").
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SpecValue {
    Number(f64),
    Text(String),
}

impl SpecValue {
    pub fn into_raw(self) -> String {
        match self {
            SpecValue::Number(n) => n.to_string(),
            SpecValue::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictRequest {
    pub ram_gb: SpecValue,
    pub rom_option: SpecValue,
    pub chip: String,
    pub brand: String,
    #[serde(default)]
    pub front_camera_mp: Option<SpecValue>,
    #[serde(default)]
    pub back_camera_mp: Option<SpecValue>,
    #[serde(default)]
    pub battery_mah: Option<SpecValue>,
    #[serde(default)]
    pub screen_size_in: Option<SpecValue>,
}

impl From<PredictRequest> for RawDeviceSpec {
    fn from(request: PredictRequest) -> Self {
        RawDeviceSpec {
            brand: request.brand,
            chip: request.chip,
            ram: request.ram_gb.into_raw(),
            storage: request.rom_option.into_raw(),
            front_camera: request.front_camera_mp.map(SpecValue::into_raw),
            back_camera: request.back_camera_mp.map(SpecValue::into_raw),
            battery: request.battery_mah.map(SpecValue::into_raw),
            screen_size: request.screen_size_in.map(SpecValue::into_raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PredictResponse {
    pub price_usd: f64,
    pub price_vnd: i64,
    #[serde(rename = "class")]
    pub band: i64,
    pub proba: Vec<f64>,
}

impl From<PredictionResult> for PredictResponse {
    fn from(result: PredictionResult) -> Self {
        PredictResponse {
            price_usd: result.price_usd,
            price_vnd: result.price_vnd,
            band: result.band,
            proba: result.probabilities,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub generation: Option<String>,
    pub feature_count: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}
