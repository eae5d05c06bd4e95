use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::errors::{PricePredictionError, Result};
use crate::price_classifier::{PriceBand, default_bands, parse_bands};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_USD_TO_VND: f64 = 25000.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub usd_to_vnd: f64,
    pub pricing_bands: Vec<PriceBand>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            model_dir: PathBuf::from("models"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            usd_to_vnd: DEFAULT_USD_TO_VND,
            pricing_bands: default_bands(),
        }
    }
}

pub fn load_config() -> ServiceConfig {
    // Loads the configuration file, then lets the process environment override it:
    //    1) PRICE_SERVICE_CONFIG points to another yaml file (default config.yaml)
    //    2) MODEL_DIR, HOST, PORT, USD_TO_VND, PRICING_BANDS_VND override single fields
    let path = std::env::var("PRICE_SERVICE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = load_config_from(Path::new(&path));
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

pub fn load_config_from(path: &Path) -> ServiceConfig {
    let config = match fs::read_to_string(path) {
        Ok(config_content) => match serde_yaml::from_str::<ServiceConfig>(&config_content) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                ServiceConfig::default()
            }
        },
        Err(_) => {
            warn!("{} not found, using defaults", path.display());
            ServiceConfig::default()
        }
    };
    if config.pricing_bands.is_empty() {
        warn!("No pricing bands configured, using the default bands");
        return ServiceConfig {
            pricing_bands: default_bands(),
            ..config
        };
    }
    config
}

pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(model_dir) = lookup("MODEL_DIR") {
        config.model_dir = PathBuf::from(model_dir);
    }
    if let Some(host) = lookup("HOST") {
        config.host = host;
    }
    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.port = port,
            Err(_) => warn!("Ignoring invalid PORT {:?}", port),
        }
    }
    if let Some(rate) = lookup("USD_TO_VND") {
        match rate.trim().parse::<f64>() {
            Ok(rate) if rate.is_finite() && rate > 0.0 => config.usd_to_vnd = rate,
            _ => warn!("Ignoring invalid USD_TO_VND {:?}, keeping {}", rate, config.usd_to_vnd),
        }
    }
    if let Some(bands) = lookup("PRICING_BANDS_VND") {
        config.pricing_bands = parse_bands(&bands);
    }
}

/// Read a JSON artifact exported by the offline training process.
pub fn read_json_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json_str = fs::read_to_string(path).map_err(|source| PricePredictionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&json_str).map_err(|source| PricePredictionError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an optional companion artifact. Absence and load failures both yield None;
/// failures are logged since they silently switch the encoding strategy.
pub fn load_optional_artifact<T, F>(path: &Path, loader: F) -> Option<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    if !path.exists() {
        info!("Optional artifact {} not found", path.display());
        return None;
    }
    match loader(path) {
        Ok(artifact) => {
            info!("Loaded {}", path.display());
            Some(artifact)
        }
        Err(e) => {
            warn!("Failed to load {}, falling back: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = load_config_from(Path::new("does/not/exist.yaml"));
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.usd_to_vnd, 25000.0);
        assert_eq!(config.pricing_bands.len(), 4);
    }

    #[test]
    fn test_yaml_config_is_parsed() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "model_dir: /srv/models\nport: 9000\nusd_to_vnd: 26000\npricing_bands:\n  - [0, 0, 10000000]\n  - [1, 10000000, 50000000]\n",
        )?;
        let config = load_config_from(&path);
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.usd_to_vnd, 26000.0);
        assert_eq!(config.pricing_bands.len(), 2);
        assert_eq!(config.pricing_bands[1].upper, 50_000_000.0);
        Ok(())
    }

    #[test]
    fn test_env_overrides_exchange_rate() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, env(&[("USD_TO_VND", "27000"), ("PORT", "8080")]));
        assert_eq!(config.usd_to_vnd, 27000.0);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_exchange_rate_is_ignored() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, env(&[("USD_TO_VND", "lots")]));
        assert_eq!(config.usd_to_vnd, 25000.0);
    }

    #[test]
    fn test_malformed_bands_revert_to_defaults() {
        let mut config = ServiceConfig::default();
        config.pricing_bands = vec![PriceBand::new(0, 0.0, 1.0)];
        apply_env_overrides(&mut config, env(&[("PRICING_BANDS_VND", "not json [")]));
        assert_eq!(config.pricing_bands, default_bands());
    }

    #[test]
    fn test_optional_artifact_absent_or_broken() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("missing.json");
        let loaded: Option<HashMap<String, f64>> = load_optional_artifact(&missing, read_json_artifact);
        assert!(loaded.is_none());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ nope")?;
        let loaded: Option<HashMap<String, f64>> = load_optional_artifact(&broken, read_json_artifact);
        assert!(loaded.is_none());

        let good = dir.path().join("good.json");
        fs::write(&good, r#"{"A17 Bionic": 10.5}"#)?;
        let loaded: Option<HashMap<String, f64>> = load_optional_artifact(&good, read_json_artifact);
        assert_eq!(loaded.and_then(|m| m.get("A17 Bionic").copied()), Some(10.5));
        Ok(())
    }
}
