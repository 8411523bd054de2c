//! Prediction output formatting
//!
//! Maps raw classifier outputs onto the response shapes: the single-client
//! `PredictionResult` and the two columns appended to a batch table.

use crate::models::{FeatureValue, PredictionResult, RiskLabel};
use crate::table::Table;

/// Batch column holding the predicted class (0/1)
pub const RISK_LABEL_COLUMN: &str = "risk_label";

/// Batch column holding P(class 1)
pub const RISK_PROBABILITY_COLUMN: &str = "risk_probability";

/// Batch column holding the failure message when a batch cannot be scored
pub const ERROR_COLUMN: &str = "error";

/// Format a probability as a two-decimal percentage, e.g. `0.87` -> `"87.00%"`
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Build the single-client response from a class and P(class 1)
pub fn single_result(class: u8, probability: f64) -> PredictionResult {
    PredictionResult {
        prediction_label: RiskLabel::from_class(class),
        prediction_value: class,
        probability_percent: format_probability(probability),
        probability_float: probability,
    }
}

/// Row-aligned batch outputs
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPredictions {
    pub labels: Vec<u8>,
    pub probabilities: Vec<f64>,
}

impl BatchPredictions {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of rows predicted as class 1
    pub fn at_risk_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Append `risk_label` and `risk_probability` to `table`
    ///
    /// The caller guarantees one prediction per row.
    pub fn append_to(self, mut table: Table) -> Table {
        let labels = self
            .labels
            .into_iter()
            .map(|l| FeatureValue::Number(f64::from(l)))
            .collect();
        let probabilities = self
            .probabilities
            .into_iter()
            .map(FeatureValue::Number)
            .collect();
        table.set_column(RISK_LABEL_COLUMN, labels);
        table.set_column(RISK_PROBABILITY_COLUMN, probabilities);
        table
    }
}
