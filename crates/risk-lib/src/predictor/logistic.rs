//! Logistic-regression pipeline loaded from a JSON artifact
//!
//! The artifact carries its own preprocessing: numeric features are
//! standardised with `(x - mean) / scale`, categorical features are one-hot
//! encoded against a fixed category list. The encoded vector feeds a
//! single linear layer followed by the logistic function.
//!
//! ```json
//! {
//!   "version": "lr-impaye-1",
//!   "features": [
//!     {"type": "numeric", "name": "Anciennete", "mean": 4.2, "scale": 2.9},
//!     {"type": "categorical", "name": "Type_abonnement", "categories": ["Basique", "Premium"]}
//!   ],
//!   "coefficients": [-0.41, 0.12, -0.30],
//!   "intercept": -0.8
//! }
//! ```

use super::Classifier;
use crate::models::FeatureValue;
use crate::table::Table;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What to do with a categorical value outside the trained categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCategory {
    /// Encode as all zeros
    #[default]
    Ignore,
    /// Fail the prediction
    Error,
}

/// Preprocessing for one input column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeatureSpec {
    Numeric {
        name: String,
        #[serde(default)]
        mean: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    Categorical {
        name: String,
        categories: Vec<String>,
        #[serde(default)]
        handle_unknown: UnknownCategory,
    },
}

fn default_scale() -> f64 {
    1.0
}

fn default_threshold() -> f64 {
    0.5
}

impl FeatureSpec {
    pub fn name(&self) -> &str {
        match self {
            FeatureSpec::Numeric { name, .. } | FeatureSpec::Categorical { name, .. } => name,
        }
    }

    fn width(&self) -> usize {
        match self {
            FeatureSpec::Numeric { .. } => 1,
            FeatureSpec::Categorical { categories, .. } => categories.len(),
        }
    }

    fn encode(&self, value: &FeatureValue, out: &mut Vec<f64>) -> Result<()> {
        if value.is_null() {
            bail!("missing value for feature {}", self.name());
        }
        match self {
            FeatureSpec::Numeric { name, mean, scale } => {
                let x = value
                    .as_f64()
                    .with_context(|| format!("feature {} expects a numeric value, got '{}'", name, value))?;
                out.push((x - mean) / scale);
            }
            FeatureSpec::Categorical {
                name,
                categories,
                handle_unknown,
            } => {
                let raw = value.to_string();
                let key = raw.trim();
                let hit = categories.iter().position(|c| c == key);
                if hit.is_none() && *handle_unknown == UnknownCategory::Error {
                    bail!("unknown category '{}' for feature {}", key, name);
                }
                out.extend((0..categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
            }
        }
        Ok(())
    }
}

/// Standardise, one-hot encode, then apply a logistic-regression layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticPipeline {
    #[serde(default)]
    pub version: Option<String>,
    pub features: Vec<FeatureSpec>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticPipeline {
    /// Parse and validate a JSON artifact
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let pipeline: LogisticPipeline =
            serde_json::from_slice(bytes).context("Failed to parse logistic-regression artifact")?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            bail!("artifact declares no features");
        }

        let mut names = HashSet::new();
        for feature in &self.features {
            if !names.insert(feature.name()) {
                bail!("feature {} declared twice", feature.name());
            }
            match feature {
                FeatureSpec::Numeric { name, mean, scale } => {
                    if !mean.is_finite() || !scale.is_finite() || *scale == 0.0 {
                        bail!("feature {} has an invalid mean/scale", name);
                    }
                }
                FeatureSpec::Categorical { name, categories, .. } => {
                    if categories.is_empty() {
                        bail!("categorical feature {} has no categories", name);
                    }
                    let unique: HashSet<&String> = categories.iter().collect();
                    if unique.len() != categories.len() {
                        bail!("categorical feature {} repeats a category", name);
                    }
                }
            }
        }

        let width = self.encoded_width();
        if self.coefficients.len() != width {
            bail!(
                "artifact has {} coefficients, encoded features need {}",
                self.coefficients.len(),
                width
            );
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("artifact contains non-finite weights");
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            bail!("decision threshold {} outside (0, 1)", self.threshold);
        }
        Ok(())
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(FeatureSpec::name).collect()
    }

    fn encoded_width(&self) -> usize {
        self.features.iter().map(FeatureSpec::width).sum()
    }

    fn check_columns(&self, input: &Table) -> Result<()> {
        let expected = self.feature_names();
        let actual: Vec<&str> = input.columns().iter().map(String::as_str).collect();
        if expected != actual {
            bail!(
                "model expects columns [{}], got [{}]",
                expected.join(", "),
                actual.join(", ")
            );
        }
        Ok(())
    }

    fn positive_probability(&self, row: &[FeatureValue], encoded: &mut Vec<f64>) -> Result<f64> {
        encoded.clear();
        for (feature, value) in self.features.iter().zip(row) {
            feature.encode(value, encoded)?;
        }
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(encoded.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        Ok(sigmoid(z))
    }

    fn positive_probabilities(&self, input: &Table) -> Result<Vec<f64>> {
        self.check_columns(input)?;
        let mut encoded = Vec::with_capacity(self.encoded_width());
        input
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                self.positive_probability(row, &mut encoded)
                    .with_context(|| format!("row {}", i))
            })
            .collect()
    }
}

impl Classifier for LogisticPipeline {
    fn predict(&self, input: &Table) -> Result<Vec<u8>> {
        Ok(self
            .positive_probabilities(input)?
            .into_iter()
            .map(|p| u8::from(p > self.threshold))
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
            .map(|&p| u8::from(p > self.threshold))
            .collect();
        Ok((labels, probabilities.into_iter().map(|p| [1.0 - p, p]).collect()))
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
