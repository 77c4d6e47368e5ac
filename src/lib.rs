//! Mood Risk - Train/serve-consistent depression-risk screening
//!
//! Mood Risk turns a raw student survey record into the exact feature vector a
//! previously fitted classifier expects, then applies that classifier:
//! field validation → ordinal mapping / one-hot encoding / min-max scaling →
//! alignment to the model's columns → binary prediction.
//!
//! ## Modules
//!
//! - **Serving**: [`ArtifactContext`] loads fitted artifacts once; [`InferencePipeline`]
//!   predicts records against it, singly or in parallel batches
//! - **Fitting**: [`TrainingFitter`] learns the encoder and scaler from a corpus and
//!   emits training rows through the same transforms serving uses

pub mod aligner;
pub mod config;
pub mod context;
pub mod encoder;
pub mod error;
pub mod fit;
pub mod model;
pub mod ordinal;
pub mod pipeline;
pub mod report;
pub mod scaler;
pub mod schema;
pub mod types;

pub use config::ArtifactConfig;
pub use context::ArtifactContext;
pub use error::PipelineError;
pub use fit::{FittedArtifacts, TrainingFitter};
pub use model::Classifier;
pub use pipeline::{predict, InferencePipeline, PredictionOutcome};
pub use schema::{RecordAdapter, Schema, SCHEMA_VERSION};
pub use types::{DepressionLabel, FeatureVector, PredictionResult, RawRecord};

/// Crate version reported by the CLI
pub const MOOD_RISK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "mood-risk";
