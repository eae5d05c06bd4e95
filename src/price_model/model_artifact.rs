//! JSON export of the trained regression model.
//!
//! The offline training process dumps the fitted scikit-learn estimator's
//! parameters; this module evaluates them for a single row.

use std::path::Path;

use serde::Deserialize;

use crate::errors::{PricePredictionError, Result};
use crate::price_model::standard_scaler::StandardScaler;
use crate::utils::read_json_artifact;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    /// Column names seen at fit time, when the estimator recorded them
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
    pub estimator: Estimator,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearRegressor),
    TreeEnsemble(TreeEnsemble),
    Pipeline(Pipeline),
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearRegressor {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Random forest: average of the trees
    #[default]
    Mean,
    /// Gradient boosting: base_score + learning_rate * sum of the trees
    Sum,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    pub trees: Vec<RegressionTree>,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

fn default_learning_rate() -> f64 {
    1.0
}

/// sklearn `tree_` arrays; node 0 is the root, `children_left == -1` marks a leaf.
#[derive(Debug, Clone, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub steps: Vec<PipelineStep>,
    pub estimator: Box<Estimator>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineStep {
    SimpleImputer(SimpleImputer),
    StandardScaler(StandardScaler),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimpleImputer {
    pub statistics: Vec<f64>,
    #[serde(default)]
    pub feature_names_in: Option<Vec<String>>,
}

impl SimpleImputer {
    fn transform(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.statistics.len() {
            return Err(PricePredictionError::Prediction(format!(
                "X has {} features, but SimpleImputer is expecting {} features as input",
                x.len(),
                self.statistics.len()
            )));
        }
        Ok(x.iter()
            .zip(&self.statistics)
            .map(|(&xi, &fill)| if xi.is_nan() { fill } else { xi })
            .collect())
    }
}

impl PipelineStep {
    fn feature_names_in(&self) -> Option<&[String]> {
        match self {
            PipelineStep::SimpleImputer(imputer) => imputer.feature_names_in.as_deref(),
            PipelineStep::StandardScaler(scaler) => scaler.feature_names_in.as_deref(),
        }
    }

    fn transform(&self, x: &[f64]) -> Result<Vec<f64>> {
        match self {
            PipelineStep::SimpleImputer(imputer) => imputer.transform(x),
            PipelineStep::StandardScaler(scaler) => scaler.transform(x),
        }
    }
}

impl RegressionTree {
    fn validate(&self) -> Result<()> {
        let n = self.children_left.len();
        let lengths = [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ];
        if n == 0 || lengths.iter().any(|&l| l != n) {
            return Err(PricePredictionError::InvalidArtifact(format!(
                "regression tree arrays have inconsistent lengths ({} nodes)",
                n
            )));
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        self.validate()
            .map_err(|e| PricePredictionError::Prediction(e.to_string()))?;
        let mut node = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.value.len() {
            let left = self.children_left[node];
            if left < 0 {
                return Ok(self.value[node]);
            }
            let feature = usize::try_from(self.feature[node])
                .ok()
                .filter(|&f| f < x.len())
                .ok_or_else(|| {
                    PricePredictionError::Prediction(format!(
                        "tree node {} splits on feature {} but the row has {} features",
                        node,
                        self.feature[node],
                        x.len()
                    ))
                })?;
            let next = if x[feature] <= self.threshold[node] { left } else { self.children_right[node] };
            node = usize::try_from(next)
                .ok()
                .filter(|&n| n < self.value.len())
                .ok_or_else(|| {
                    PricePredictionError::Prediction(format!("tree node {} points to invalid child {}", node, next))
                })?;
        }
        Err(PricePredictionError::Prediction(
            "tree traversal did not reach a leaf".to_string(),
        ))
    }
}

impl Estimator {
    fn validate(&self) -> Result<()> {
        match self {
            Estimator::Linear(linear) => {
                if linear.coef.is_empty() {
                    return Err(PricePredictionError::InvalidArtifact(
                        "linear model has no coefficients".to_string(),
                    ));
                }
                Ok(())
            }
            Estimator::TreeEnsemble(ensemble) => {
                if ensemble.trees.is_empty() {
                    return Err(PricePredictionError::InvalidArtifact(
                        "tree ensemble has no trees".to_string(),
                    ));
                }
                ensemble.trees.iter().try_for_each(RegressionTree::validate)
            }
            Estimator::Pipeline(pipeline) => {
                for step in &pipeline.steps {
                    if let PipelineStep::StandardScaler(scaler) = step {
                        scaler.validate()?;
                    }
                }
                pipeline.estimator.validate()
            }
        }
    }

    fn predict_row(&self, x: &[f64]) -> Result<f64> {
        match self {
            Estimator::Linear(linear) => {
                if x.len() != linear.coef.len() {
                    return Err(PricePredictionError::Prediction(format!(
                        "X has {} features, but the linear model is expecting {} features as input",
                        x.len(),
                        linear.coef.len()
                    )));
                }
                Ok(linear.intercept + linear.coef.iter().zip(x).map(|(c, xi)| c * xi).sum::<f64>())
            }
            Estimator::TreeEnsemble(ensemble) => {
                let mut total = 0.0f64;
                for tree in &ensemble.trees {
                    total += tree.evaluate(x)?;
                }
                Ok(match ensemble.aggregation {
                    Aggregation::Mean => total / ensemble.trees.len() as f64,
                    Aggregation::Sum => ensemble.base_score + ensemble.learning_rate * total,
                })
            }
            Estimator::Pipeline(pipeline) => {
                let mut row = x.to_vec();
                for step in &pipeline.steps {
                    row = step.transform(&row)?;
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(PricePredictionError::Prediction(
                        "input contains NaN or infinity after the pipeline steps".to_string(),
                    ));
                }
                pipeline.estimator.predict_row(&row)
            }
        }
    }
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        let artifact: ModelArtifact = read_json_artifact(path)?;
        artifact.estimator.validate()?;
        Ok(artifact)
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(self.estimator, Estimator::Pipeline(_))
    }

    /// Feature names attached to the artifact itself
    pub fn own_feature_names(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref().filter(|names| !names.is_empty())
    }

    /// Feature names recorded by the first preprocessing step of a pipeline
    pub fn first_step_feature_names(&self) -> Option<&[String]> {
        match &self.estimator {
            Estimator::Pipeline(pipeline) => pipeline
                .steps
                .first()
                .and_then(PipelineStep::feature_names_in)
                .filter(|names| !names.is_empty()),
            _ => None,
        }
    }

    /// Score one row. Declared feature names must match `columns` exactly.
    pub fn predict(&self, columns: &[String], values: &[f64]) -> Result<f64> {
        if let Some(expected) = self.own_feature_names().or_else(|| self.first_step_feature_names()) {
            if expected != columns {
                return Err(PricePredictionError::Prediction(format!(
                    "feature names should match those passed during fit: expected {:?}, got {:?}",
                    expected, columns
                )));
            }
        }
        if values.iter().any(|v| !v.is_finite()) && !self.is_pipeline() {
            return Err(PricePredictionError::Prediction(
                "input contains NaN or infinity".to_string(),
            ));
        }
        let prediction = self.estimator.predict_row(values)?;
        if !prediction.is_finite() {
            return Err(PricePredictionError::Prediction(format!(
                "model produced a non-finite prediction ({})",
                prediction
            )));
        }
        Ok(prediction)
    }
}
