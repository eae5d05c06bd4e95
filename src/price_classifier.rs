//! Maps a predicted price onto display bands in the secondary currency.

use serde::{Deserialize, Serialize};
use tracing::warn;

const DISTANCE_EPSILON: f64 = 1e-6;

/// One price interval, configured as an `[index, lower, upper]` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i64, f64, f64)", into = "(i64, f64, f64)")]
pub struct PriceBand {
    pub index: i64,
    pub lower: f64,
    pub upper: f64,
}

impl PriceBand {
    pub fn new(index: i64, lower: f64, upper: f64) -> Self {
        PriceBand { index, lower, upper }
    }

    pub fn contains(&self, price: f64) -> bool {
        self.lower <= price && price <= self.upper
    }

    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }
}

impl From<(i64, f64, f64)> for PriceBand {
    fn from((index, lower, upper): (i64, f64, f64)) -> Self {
        PriceBand::new(index, lower, upper)
    }
}

impl From<PriceBand> for (i64, f64, f64) {
    fn from(band: PriceBand) -> Self {
        (band.index, band.lower, band.upper)
    }
}

pub fn default_bands() -> Vec<PriceBand> {
    vec![
        PriceBand::new(0, 2_000_000.0, 4_000_000.0),
        PriceBand::new(1, 4_000_000.0, 8_000_000.0),
        PriceBand::new(2, 8_000_000.0, 15_000_000.0),
        PriceBand::new(3, 15_000_000.0, 30_000_000.0),
    ]
}

/// Parse a JSON list of `[index, lower, upper]` triples.
/// Entries of the wrong shape are skipped; invalid JSON or an empty result
/// yields the default bands.
pub fn parse_bands(raw: &str) -> Vec<PriceBand> {
    let parsed: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("PRICING_BANDS_VND is not valid JSON ({}), using default bands", e);
            return default_bands();
        }
    };
    let bands: Vec<PriceBand> = parsed
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let triple = item.as_array().filter(|t| t.len() == 3)?;
                    let index = triple[0].as_f64()?;
                    Some(PriceBand::new(index as i64, triple[1].as_f64()?, triple[2].as_f64()?))
                })
                .collect()
        })
        .unwrap_or_default();
    if bands.is_empty() {
        warn!("PRICING_BANDS_VND has no valid [index, lower, upper] entries, using default bands");
        return default_bands();
    }
    bands
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceClassification {
    pub band: i64,
    pub probabilities: Vec<f64>,
}

/// Total over real prices: the first containing band wins, prices above the
/// last upper bound go to the last band, anything else stays on the first band.
pub fn classify(price: f64, bands: &[PriceBand]) -> PriceClassification {
    let Some(last) = bands.last() else {
        return PriceClassification {
            band: 0,
            probabilities: Vec::new(),
        };
    };

    let position = bands
        .iter()
        .position(|b| b.contains(price))
        .unwrap_or(if price > last.upper { bands.len() - 1 } else { 0 });
    let band = bands[position].index;

    // Inverse distance to each band midpoint, normalized
    let weights: Vec<f64> = bands
        .iter()
        .map(|b| 1.0 / ((price - b.midpoint()).abs() + DISTANCE_EPSILON))
        .collect();
    let total: f64 = weights.iter().sum();
    let probabilities = if total > 0.0 && total.is_finite() {
        weights.iter().map(|w| w / total).collect()
    } else {
        (0..bands.len())
            .map(|i| if i == position { 1.0 } else { 0.0 })
            .collect()
    };

    PriceClassification { band, probabilities }
}

/// Convert a primary-currency price, rounding to whole units and clamping at zero.
pub fn convert_currency(price: f64, rate: f64) -> i64 {
    (price * rate).round().max(0.0) as i64
}
