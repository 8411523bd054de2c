//! ONNX inference using tract
//!
//! Runs numeric-only binary classifiers exported to ONNX (scikit-learn
//! exports must disable ZipMap so probabilities come out as a plain f32
//! tensor). Rows are scored one at a time with input shape `[1, n_features]`.

use super::Classifier;
use crate::table::Table;
use anyhow::{bail, Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum per-row inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

/// Class-1 probability above which a row is predicted positive
const DECISION_THRESHOLD: f64 = 0.5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: TractModel,
    num_features: usize,
}

impl OnnxClassifier {
    /// Load and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8], num_features: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model, num_features })
    }

    /// Convert one projected row to a `[1, n]` tensor
    fn row_to_tensor(&self, input: &Table, row_idx: usize) -> Result<Tensor> {
        let row = &input.rows()[row_idx];
        let data = row
            .iter()
            .zip(input.columns())
            .map(|(value, column)| {
                value.as_f64().map(|v| v as f32).with_context(|| {
                    format!("feature {} expects a numeric value, got '{}'", column, value)
                })
            })
            .collect::<Result<Vec<f32>>>()?;

        let array = tract_ndarray::Array2::from_shape_vec((1, self.num_features), data)
            .context("Row width does not match model input")?;
        Ok(array.into())
    }

    /// P(class 1) for a single row
    fn score_row(&self, input: &Table, row_idx: usize) -> Result<f64> {
        let start = Instant::now();
        let tensor = self.row_to_tensor(input, row_idx)?;
        let outputs = self.model.run(tvec!(tensor.into()))?;

        // The probability tensor is the last f32 output (labels come first as i64)
        let values: Vec<f32> = outputs
            .iter()
            .rev()
            .find_map(|o| o.to_array_view::<f32>().ok().map(|v| v.iter().copied().collect()))
            .context("Model produced no f32 probability output")?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        let probability = match values.as_slice() {
            [_, p1] => f64::from(*p1),
            [p1] => f64::from(*p1),
            other => bail!("Model output has {} values, expected 1 or 2", other.len()),
        };
        if !(0.0..=1.0).contains(&probability) {
            bail!("Model produced probability {} outside [0, 1]", probability);
        }
        Ok(probability)
    }

    fn positive_probabilities(&self, input: &Table) -> Result<Vec<f64>> {
        if input.width() != self.num_features {
            bail!(
                "Model expects {} features, input has {}",
                self.num_features,
                input.width()
            );
        }
        (0..input.len())
            .map(|i| self.score_row(input, i).with_context(|| format!("row {}", i)))
            .collect()
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &Table) -> Result<Vec<u8>> {
        Ok(self
            .positive_probabilities(input)?
            .into_iter()
            .map(|p| u8::from(p > DECISION_THRESHOLD))
            .collect())
    }

    fn predict_proba(&self, input: &Table) -> Result<Vec<[f64; 2]>> {
        Ok(self
            .positive_probabilities(input)?
            .into_iter()
            .map(|p| [1.0 - p, p])
            .collect())
    }

    fn predict_with_proba(&self, input: &Table) -> Result<(Vec<u8>, Vec<[f64; 2]>)> {
        let probabilities = self.positive_probabilities(input)?;
        let labels = probabilities
            .iter()
            .map(|&p| u8::from(p > DECISION_THRESHOLD))
            .collect();
        Ok((labels, probabilities.into_iter().map(|p| [1.0 - p, p]).collect()))
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
