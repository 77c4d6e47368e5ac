//! Fitted classifier boundary
//!
//! The pipeline treats the model as a black box: it exposes the column order it
//! was fitted on and maps an aligned feature vector to a class index. Model
//! artifacts are serde documents tagged by `kind`.

use crate::config::read_json_artifact;
use crate::error::PipelineError;
use crate::types::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A fitted classifier safe to share across worker threads
pub trait Classifier: Send + Sync {
    /// Column order the model was fitted on
    fn expected_columns(&self) -> &[String];

    /// Predict a class index for an aligned feature vector
    fn predict(&self, features: &FeatureVector) -> Result<usize, PipelineError>;
}

/// Serialized model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic(LogisticModel),
}

impl ModelArtifact {
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.check()?;
        Ok(artifact)
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let artifact: Self = read_json_artifact(path)?;
        artifact
            .check()
            .map_err(|e| PipelineError::artifact_load(path, e))?;
        Ok(artifact)
    }

    fn check(&self) -> Result<(), PipelineError> {
        match self {
            ModelArtifact::Logistic(model) => model.check(),
        }
    }

    pub fn into_classifier(self) -> Box<dyn Classifier> {
        match self {
            ModelArtifact::Logistic(model) => Box::new(model),
        }
    }
}

fn default_threshold() -> f64 {
    0.5
}

/// Binary logistic regression over named columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub columns: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Probability at or above which class 1 is predicted
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticModel {
    pub fn new(
        columns: Vec<String>,
        coefficients: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, PipelineError> {
        let model = Self {
            columns,
            coefficients,
            intercept,
            threshold: default_threshold(),
        };
        model.check()?;
        Ok(model)
    }

    fn check(&self) -> Result<(), PipelineError> {
        if self.columns.len() != self.coefficients.len() {
            return Err(PipelineError::Model(format!(
                "{} columns but {} coefficients",
                self.columns.len(),
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PipelineError::Model("non-finite parameter".to_string()));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(PipelineError::Model(format!(
                "threshold {} outside (0, 1)",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Probability of class 1
    pub fn probability(&self, features: &FeatureVector) -> Result<f64, PipelineError> {
        if features.len() != self.coefficients.len() {
            return Err(PipelineError::Model(format!(
                "expected {} features, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }

        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features.values())
                .map(|(w, x)| w * x)
                .sum::<f64>();

        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for LogisticModel {
    fn expected_columns(&self) -> &[String] {
        &self.columns
    }

    fn predict(&self, features: &FeatureVector) -> Result<usize, PipelineError> {
        let p = self.probability(features)?;
        Ok(usize::from(p >= self.threshold))
    }
}
