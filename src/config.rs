//! Artifact configuration
//!
//! The service needs three fitted artifacts: the categorical encoder, the
//! numeric scaler and the model. Their paths come from a JSON config file, from
//! command-line flags, or both (flags win).

use crate::error::PipelineError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Paths to the fitted artifacts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,
}

/// Artifact paths with every entry present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub encoder: PathBuf,
    pub scaler: PathBuf,
    pub model: PathBuf,
}

impl ArtifactConfig {
    pub fn new(encoder: PathBuf, scaler: PathBuf, model: PathBuf) -> Self {
        Self {
            encoder: Some(encoder),
            scaler: Some(scaler),
            model: Some(model),
        }
    }

    /// Read a config file. Relative artifact paths resolve against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, PipelineError> {
        let mut config: Self = read_json_artifact(path)?;
        if let Some(base) = path.parent() {
            for entry in [&mut config.encoder, &mut config.scaler, &mut config.model] {
                if let Some(p) = entry.as_mut() {
                    if p.is_relative() {
                        *p = base.join(&*p);
                    }
                }
            }
        }
        Ok(config)
    }

    /// Overlay another config; its present entries replace ours
    pub fn merge(self, overrides: ArtifactConfig) -> Self {
        Self {
            encoder: overrides.encoder.or(self.encoder),
            scaler: overrides.scaler.or(self.scaler),
            model: overrides.model.or(self.model),
        }
    }

    /// Require every path to be set and to exist on disk
    pub fn resolve(&self) -> Result<ArtifactPaths, PipelineError> {
        Ok(ArtifactPaths {
            encoder: require_path(&self.encoder, "encoder")?,
            scaler: require_path(&self.scaler, "scaler")?,
            model: require_path(&self.model, "model")?,
        })
    }
}

fn require_path(path: &Option<PathBuf>, name: &str) -> Result<PathBuf, PipelineError> {
    let path = path
        .as_ref()
        .ok_or_else(|| PipelineError::artifact_load(name, "no path configured"))?;
    if !path.is_file() {
        return Err(PipelineError::artifact_load(path, "file does not exist"));
    }
    Ok(path.clone())
}

/// Read and deserialize a JSON artifact, reporting any failure as an artifact load error
pub(crate) fn read_json_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let content =
        fs::read_to_string(path).map_err(|e| PipelineError::artifact_load(path, e))?;
    serde_json::from_str(&content).map_err(|e| PipelineError::artifact_load(path, e))
}
