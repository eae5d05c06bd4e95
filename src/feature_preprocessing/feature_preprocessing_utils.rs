/// Device specification as received from a caller.
///
/// Every measurement stays in its raw, human-entered form ("12GB", "50MP",
/// "6.9 inches") until the value normalizer turns it into the unit the active
/// model generation was trained with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDeviceSpec {
    // Required
    pub brand: String,
    pub chip: String,
    pub ram: String,
    pub storage: String,

    // Optional, defaults applied during normalization
    pub front_camera: Option<String>,
    pub back_camera: Option<String>,
    pub battery: Option<String>,
    pub screen_size: Option<String>,
}

impl RawDeviceSpec {
    pub fn new(brand: &str, chip: &str, ram: &str, storage: &str) -> Self {
        RawDeviceSpec {
            brand: brand.to_string(),
            chip: chip.to_string(),
            ram: ram.to_string(),
            storage: storage.to_string(),
            ..Default::default()
        }
    }
}

/// Single-row, named input for the model artifact.
///
/// `columns` and `values` always have the same length and follow the order of
/// the resolved feature schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn with_capacity(capacity: usize) -> Self {
        FeatureVector {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: &str, value: f64) {
        self.columns.push(column.to_string());
        self.values.push(value);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
