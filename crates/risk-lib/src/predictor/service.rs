//! Prediction pipeline
//!
//! Validates client data against the column schema, runs the shared
//! classifier and shapes the output. Every failure is returned as a
//! `PredictionError`; nothing escapes as a panic, and a missing model is a
//! permanent state for the life of the process.

use super::output::{single_result, BatchPredictions, ERROR_COLUMN};
use super::{ModelArtifact, ModelInfo};
use crate::models::{ClientRecord, FeatureValue, PredictionResult};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::schema::{ColumnSchema, SchemaError};
use crate::table::Table;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

const MODE_SINGLE: &str = "single";
const MODE_BATCH: &str = "batch";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("model not available")]
    ModelUnavailable,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("prediction error: {0}")]
    Inference(String),
}

impl PredictionError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::ModelUnavailable => "model_unavailable",
            PredictionError::Schema(_) => "schema_error",
            PredictionError::Inference(_) => "inference_error",
        }
    }

    fn inference(err: anyhow::Error) -> Self {
        PredictionError::Inference(format!("{:#}", err))
    }
}

/// Prediction pipeline over an injected, immutable model handle
///
/// Cheap to clone; safe to share across request handlers.
#[derive(Debug, Clone)]
pub struct PredictionService {
    model: Option<Arc<ModelArtifact>>,
    schema: ColumnSchema,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(model: Option<Arc<ModelArtifact>>, schema: ColumnSchema) -> Self {
        Self {
            model,
            schema,
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.model.as_deref().map(ModelArtifact::info)
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Restrict and reorder `table` to the schema columns
    pub fn prepare(&self, table: &Table) -> Result<Table, SchemaError> {
        self.schema.project(table)
    }

    pub fn prepare_record(&self, record: &ClientRecord) -> Result<Table, SchemaError> {
        self.schema.project(&Table::from_record(record))
    }

    /// Score a single client
    pub fn predict_single(&self, record: &ClientRecord) -> Result<PredictionResult, PredictionError> {
        let start = Instant::now();
        let outcome = self.score_single(record);
        let elapsed = start.elapsed();
        self.metrics
            .observe_prediction_latency(MODE_SINGLE, elapsed.as_secs_f64());

        match &outcome {
            Ok(result) => {
                self.metrics.inc_predictions(MODE_SINGLE, 1);
                self.logger.log_prediction(
                    result.prediction_label.as_str(),
                    result.probability_float,
                    elapsed.as_micros(),
                );
            }
            Err(e) => self.record_failure(MODE_SINGLE, e),
        }
        outcome
    }

    fn score_single(&self, record: &ClientRecord) -> Result<PredictionResult, PredictionError> {
        let model = self.model.as_deref().ok_or(PredictionError::ModelUnavailable)?;
        let input = self.prepare_record(record)?;
        let predictions = infer(model, &input)?;
        match (predictions.labels.first(), predictions.probabilities.first()) {
            (Some(&class), Some(&probability)) => Ok(single_result(class, probability)),
            _ => Err(PredictionError::Inference(
                "model returned no prediction".to_string(),
            )),
        }
    }

    /// Score every row of `table`, all or nothing
    pub fn try_predict_batch(&self, table: &Table) -> Result<BatchPredictions, PredictionError> {
        let start = Instant::now();
        let outcome = self
            .model
            .as_deref()
            .ok_or(PredictionError::ModelUnavailable)
            .and_then(|model| {
                let input = self.prepare(table)?;
                infer(model, &input)
            });
        let elapsed = start.elapsed();
        self.metrics
            .observe_prediction_latency(MODE_BATCH, elapsed.as_secs_f64());
        self.metrics.observe_batch_rows(table.len());

        match &outcome {
            Ok(predictions) => {
                self.metrics.inc_predictions(MODE_BATCH, predictions.len() as u64);
                self.logger.log_batch_prediction(
                    predictions.len(),
                    predictions.at_risk_count(),
                    elapsed.as_millis(),
                );
            }
            Err(e) => self.record_failure(MODE_BATCH, e),
        }
        outcome
    }

    /// Score a table and return it augmented with the prediction columns
    ///
    /// On any failure the input comes back with a single `error` column
    /// instead; no row is ever partially scored.
    pub fn predict_batch(&self, table: Table) -> Table {
        match self.try_predict_batch(&table) {
            Ok(predictions) => predictions.append_to(table),
            Err(e) => table.with_constant_column(ERROR_COLUMN, FeatureValue::Text(e.to_string())),
        }
    }

    fn record_failure(&self, mode: &str, error: &PredictionError) {
        self.metrics.inc_prediction_errors(error.kind());
        self.logger
            .log_prediction_failed(mode, error.kind(), &error.to_string());
    }
}

/// Run the classifier on a projected table and validate its outputs
fn infer(model: &ModelArtifact, input: &Table) -> Result<BatchPredictions, PredictionError> {
    let (labels, proba) = model
        .classifier()
        .predict_with_proba(input)
        .map_err(PredictionError::inference)?;

    if labels.len() != input.len() || proba.len() != input.len() {
        return Err(PredictionError::Inference(format!(
            "model returned {} labels and {} probabilities for {} rows",
            labels.len(),
            proba.len(),
            input.len()
        )));
    }
    if let Some(bad) = labels.iter().find(|&&l| l > 1) {
        return Err(PredictionError::Inference(format!(
            "model returned class {}, expected 0 or 1",
            bad
        )));
    }

    let probabilities: Vec<f64> = proba.iter().map(|p| p[1]).collect();
    if let Some(bad) = probabilities.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(PredictionError::Inference(format!(
            "model returned probability {} outside [0, 1]",
            bad
        )));
    }

    Ok(BatchPredictions {
        labels,
        probabilities,
    })
}
