use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::errors::{PricePredictionError, Result};
use crate::utils::read_json_artifact;

lazy_static! {
    // Default token pattern of the training-time TfidfVectorizer: two or more word characters
    static ref TOKEN: Regex = Regex::new(r"\b\w\w+\b").expect("token pattern is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TfidfNorm {
    L1,
    L2,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_lowercase")]
    lowercase: bool,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_norm")]
    norm: Option<TfidfNorm>,
}

fn default_lowercase() -> bool {
    true
}

fn default_norm() -> Option<TfidfNorm> {
    Some(TfidfNorm::L2)
}

impl TfidfVectorizer {
    pub fn width(&self) -> usize {
        self.idf.len()
    }

    pub fn transform(&self, text: &str) -> Vec<f64> {
        let text = if self.lowercase { text.to_lowercase() } else { text.to_string() };
        let mut counts = vec![0.0f64; self.idf.len()];
        for token in TOKEN.find_iter(&text) {
            if let Some(&column) = self.vocabulary.get(token.as_str()) {
                counts[column] += 1.0;
            }
        }

        let mut weights: Vec<f64> = counts
            .iter()
            .zip(&self.idf)
            .map(|(&tf, &idf)| {
                let tf = if self.sublinear_tf && tf > 0.0 { 1.0 + tf.ln() } else { tf };
                tf * idf
            })
            .collect();

        let norm = match self.norm {
            Some(TfidfNorm::L2) => weights.iter().map(|w| w * w).sum::<f64>().sqrt(),
            Some(TfidfNorm::L1) => weights.iter().map(|w| w.abs()).sum::<f64>(),
            None => 0.0,
        };
        if norm > 0.0 {
            weights.iter_mut().for_each(|w| *w /= norm);
        }
        weights
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pca {
    mean: Vec<f64>,
    components: Vec<Vec<f64>>,
}

impl Pca {
    /// components · (x - mean)
    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        self.components
            .iter()
            .map(|component| {
                component
                    .iter()
                    .zip(x.iter().zip(&self.mean))
                    .map(|(c, (xi, m))| c * (xi - m))
                    .sum()
            })
            .collect()
    }
}

/// Chip name -> dense low-dimensional vector (TF-IDF followed by PCA).
#[derive(Debug, Clone)]
pub struct ProcessorVectorizer {
    tfidf: TfidfVectorizer,
    pca: Pca,
}

impl ProcessorVectorizer {
    pub fn new(tfidf: TfidfVectorizer, pca: Pca) -> Result<Self> {
        let width = tfidf.width();
        if let Some((token, column)) = tfidf.vocabulary.iter().find(|(_, c)| **c >= width) {
            return Err(PricePredictionError::InvalidArtifact(format!(
                "vectorizer token {:?} maps to column {} but idf has {} entries",
                token, column, width
            )));
        }
        if pca.mean.len() != width || pca.components.iter().any(|c| c.len() != width) {
            return Err(PricePredictionError::InvalidArtifact(format!(
                "PCA expects inputs of width {} but the vectorizer produces {}",
                pca.mean.len(),
                width
            )));
        }
        Ok(ProcessorVectorizer { tfidf, pca })
    }

    pub fn load(vectorizer_path: &Path, pca_path: &Path) -> Result<Self> {
        let tfidf: TfidfVectorizer = read_json_artifact(vectorizer_path)?;
        let pca: Pca = read_json_artifact(pca_path)?;
        Self::new(tfidf, pca)
    }

    pub fn project(&self, chip: &str) -> Vec<f64> {
        self.pca.transform(&self.tfidf.transform(chip))
    }
}
