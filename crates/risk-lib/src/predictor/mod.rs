//! ML prediction engine

mod inference;
mod loader;
mod logistic;
mod output;
mod service;

pub use inference::OnnxClassifier;
pub use loader::{ModelArtifact, ModelFormat, ModelInfo};
pub use logistic::{FeatureSpec, LogisticPipeline, UnknownCategory};
pub use output::{
    format_probability, BatchPredictions, ERROR_COLUMN, RISK_LABEL_COLUMN, RISK_PROBABILITY_COLUMN,
};
pub use service::{PredictionError, PredictionService};

use crate::table::Table;
use anyhow::Result;

/// Trait for binary classifier implementations
///
/// Inputs are tables already projected onto the column schema. Both
/// methods return one entry per input row.
pub trait Classifier: Send + Sync {
    /// Predicted class (0 or 1) per row
    fn predict(&self, input: &Table) -> Result<Vec<u8>>;

    /// `[P(class 0), P(class 1)]` per row
    fn predict_proba(&self, input: &Table) -> Result<Vec<[f64; 2]>>;

    /// Classes and probabilities from a single scoring pass
    ///
    /// The default runs both methods; classifiers that can derive the class
    /// from the probability override it.
    fn predict_with_proba(&self, input: &Table) -> Result<(Vec<u8>, Vec<[f64; 2]>)> {
        Ok((self.predict(input)?, self.predict_proba(input)?))
    }

    /// Short name of the model family, for logs and metrics
    fn kind(&self) -> &'static str;
}
