use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

pub const DEFAULT_CAMERA_MP: f64 = 12.0;
pub const DEFAULT_BATTERY_MAH: f64 = 4000.0;
pub const DEFAULT_SCREEN_INCHES: f64 = 6.0;
pub const DEFAULT_STORAGE_TB: f64 = 0.125;
pub const DEFAULT_STORAGE_GB: f64 = 128.0;

const GB_PER_TB: f64 = 1024.0;
const MAH_PER_UNIT: f64 = 1000.0;

lazy_static! {
    // Unit letters, whitespace, '+' and thousands separators are dropped before parsing
    static ref UNIT_CHARACTERS: Regex = Regex::new(r"[A-Z\s+,]").expect("unit pattern is valid");
    static ref LEADING_NUMBER: Regex = Regex::new(r"(\d+\.?\d*)").expect("number pattern is valid");
}

/// Unit in which a model generation expects the storage ("ROM") column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageUnit {
    Terabytes,
    Gigabytes,
}

/// Parse the numeric part of a measurement string such as "12GB" or "6.9 inches".
/// Returns None when nothing numeric is left after stripping the unit, or when
/// the digits overflow to infinity.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let upper = raw.to_uppercase();
    let stripped = UNIT_CHARACTERS.replace_all(&upper, "");
    LEADING_NUMBER
        .captures(&stripped)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Like `parse_quantity` but never fails: absent or unparseable values become `default`.
pub fn quantity_or(raw: Option<&str>, default: f64) -> f64 {
    match raw {
        None => default,
        Some(text) => match parse_quantity(text) {
            Some(value) => value,
            None => {
                debug!("Unparseable measurement {:?}, using default {}", text, default);
                default
            }
        },
    }
}

/// Storage normalization.
///
/// Terabytes: "1TB" -> 1.0, "256GB" -> 0.25, unparseable -> 0.125.
/// Gigabytes: "1TB" -> 1024.0, "256GB" -> 256.0, unparseable -> 128.0.
pub fn normalize_storage(raw: &str, unit: StorageUnit) -> f64 {
    let upper = raw.trim().to_uppercase();
    let in_terabytes = upper.ends_with("TB");
    match (unit, parse_quantity(&upper)) {
        (StorageUnit::Terabytes, Some(value)) if in_terabytes => value,
        (StorageUnit::Terabytes, Some(value)) => value / GB_PER_TB,
        (StorageUnit::Gigabytes, Some(value)) if in_terabytes => value * GB_PER_TB,
        (StorageUnit::Gigabytes, Some(value)) => value,
        (StorageUnit::Terabytes, None) => {
            debug!("Unparseable storage {:?}, using {} TB", raw, DEFAULT_STORAGE_TB);
            DEFAULT_STORAGE_TB
        }
        (StorageUnit::Gigabytes, None) => {
            debug!("Unparseable storage {:?}, using {} GB", raw, DEFAULT_STORAGE_GB);
            DEFAULT_STORAGE_GB
        }
    }
}

/// Measurement conventions a model generation was trained with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConvention {
    pub camera_divisor: f64,
    pub storage_unit: StorageUnit,
}

impl UnitConvention {
    pub fn ram(&self, raw: &str) -> f64 {
        quantity_or(Some(raw), 0.0)
    }

    pub fn camera(&self, raw: Option<&str>) -> f64 {
        quantity_or(raw, DEFAULT_CAMERA_MP) / self.camera_divisor
    }

    /// Battery is always expressed in thousands of mAh; values of 10 or less are
    /// taken as already converted.
    pub fn battery(&self, raw: Option<&str>) -> f64 {
        let mah = quantity_or(raw, DEFAULT_BATTERY_MAH);
        if mah > 10.0 { mah / MAH_PER_UNIT } else { mah }
    }

    pub fn screen_size(&self, raw: Option<&str>) -> f64 {
        quantity_or(raw, DEFAULT_SCREEN_INCHES)
    }

    pub fn storage(&self, raw: &str) -> f64 {
        normalize_storage(raw, self.storage_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TB_CONVENTION: UnitConvention = UnitConvention {
        camera_divisor: 1.0,
        storage_unit: StorageUnit::Terabytes,
    };

    #[test]
    fn test_parse_quantity_strips_units() {
        assert_eq!(parse_quantity("12GB"), Some(12.0));
        assert_eq!(parse_quantity("50MP"), Some(50.0));
        assert_eq!(parse_quantity("5000mAh"), Some(5000.0));
        assert_eq!(parse_quantity("6.9 inches"), Some(6.9));
        assert_eq!(parse_quantity("5,000 mAh"), Some(5000.0));
        assert_eq!(parse_quantity("unknown"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn test_storage_terabyte_suffix_is_kept() {
        for tb in [1.0, 2.0, 0.5] {
            let raw = format!("{}TB", tb);
            assert_eq!(normalize_storage(&raw, StorageUnit::Terabytes), tb);
        }
        assert_eq!(normalize_storage(" 1tb ", StorageUnit::Terabytes), 1.0);
    }

    #[test]
    fn test_storage_gigabytes_divided_by_1024() {
        for gb in [32.0, 64.0, 128.0, 256.0, 512.0] {
            let raw = format!("{}GB", gb);
            assert_eq!(normalize_storage(&raw, StorageUnit::Terabytes), gb / 1024.0);
        }
        assert_eq!(normalize_storage("256GB", StorageUnit::Terabytes), 0.25);
    }

    #[test]
    fn test_storage_unparseable_defaults() {
        assert_eq!(normalize_storage("lots", StorageUnit::Terabytes), 0.125);
        assert_eq!(normalize_storage("", StorageUnit::Gigabytes), 128.0);
    }

    #[test]
    fn test_storage_gigabyte_convention() {
        assert_eq!(normalize_storage("1TB", StorageUnit::Gigabytes), 1024.0);
        assert_eq!(normalize_storage("256", StorageUnit::Gigabytes), 256.0);
    }

    #[test]
    fn test_optional_fields_fall_back_to_defaults() {
        assert_eq!(TB_CONVENTION.camera(None), 12.0);
        assert_eq!(TB_CONVENTION.camera(Some("n/a")), 12.0);
        assert_eq!(TB_CONVENTION.battery(None), 4.0);
        assert_eq!(TB_CONVENTION.battery(Some("???")), 4.0);
        assert_eq!(TB_CONVENTION.screen_size(None), 6.0);
        assert_eq!(TB_CONVENTION.screen_size(Some("big")), 6.0);
    }

    #[test]
    fn test_ram_unparseable_is_zero() {
        assert_eq!(TB_CONVENTION.ram("12GB"), 12.0);
        assert_eq!(TB_CONVENTION.ram("plenty"), 0.0);
    }

    #[test]
    fn test_overflowing_digits_fall_back_to_defaults() {
        let huge = format!("{}GB", "9".repeat(400));
        assert_eq!(parse_quantity(&huge), None);
        assert_eq!(TB_CONVENTION.ram(&huge), 0.0);
        assert_eq!(TB_CONVENTION.storage(&huge), DEFAULT_STORAGE_TB);
        assert_eq!(TB_CONVENTION.camera(Some(&huge)), DEFAULT_CAMERA_MP);
    }

    #[test]
    fn test_camera_divisor_and_battery_scaling() {
        let legacy = UnitConvention {
            camera_divisor: 10.0,
            storage_unit: StorageUnit::Gigabytes,
        };
        assert_eq!(legacy.camera(Some("50MP")), 5.0);
        assert_eq!(TB_CONVENTION.camera(Some("50MP")), 50.0);
        assert_eq!(TB_CONVENTION.battery(Some("5000mAh")), 5.0);
        assert_eq!(TB_CONVENTION.battery(Some("4.4")), 4.4);
    }
}
