//! Model artifact loading
//!
//! The artifact is read once at startup and shared read-only for the life
//! of the process. A missing or invalid file leaves the service without a
//! model instead of aborting startup.

use super::{Classifier, LogisticPipeline, OnnxClassifier};
use crate::schema::ColumnSchema;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// On-disk artifact format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    /// `.json` logistic-regression pipeline
    Json,
    /// `.onnx` graph run through tract
    Onnx,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
            Some(ext) if ext == "json" => Ok(ModelFormat::Json),
            Some(ext) if ext == "onnx" => Ok(ModelFormat::Onnx),
            _ => bail!(
                "Unsupported model artifact {:?} (expected a .json or .onnx file)",
                path
            ),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Json => "json",
            ModelFormat::Onnx => "onnx",
        }
    }
}

/// Metadata describing the loaded artifact
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub path: PathBuf,
    pub format: ModelFormat,
    pub kind: String,
    pub version: String,
    pub checksum: String,
    pub size_bytes: usize,
    pub loaded_at: i64,
}

/// Immutable handle to a loaded classifier
pub struct ModelArtifact {
    classifier: Box<dyn Classifier>,
    info: ModelInfo,
}

impl fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelArtifact").field("info", &self.info).finish()
    }
}

impl ModelArtifact {
    /// Wrap an already-built classifier (tests, embedded models)
    pub fn from_classifier(classifier: Box<dyn Classifier>, version: impl Into<String>) -> Self {
        let info = ModelInfo {
            path: PathBuf::new(),
            format: ModelFormat::Json,
            kind: classifier.kind().to_string(),
            version: version.into(),
            checksum: String::new(),
            size_bytes: 0,
            loaded_at: chrono::Utc::now().timestamp(),
        };
        Self { classifier, info }
    }

    /// Load an artifact from disk and check it against the column schema
    pub fn load(path: impl AsRef<Path>, schema: &ColumnSchema) -> Result<Self> {
        let path = path.as_ref();
        let format = ModelFormat::from_path(path)?;
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model artifact {:?}", path))?;
        let checksum = hex::encode(Sha256::digest(&bytes));

        let (classifier, version): (Box<dyn Classifier>, String) = match format {
            ModelFormat::Json => {
                let pipeline = LogisticPipeline::from_slice(&bytes)?;
                let features = pipeline.feature_names();
                if features != schema.columns() {
                    bail!(
                        "Model features [{}] do not match the column schema [{}]",
                        features.join(", "),
                        schema.columns().join(", ")
                    );
                }
                let version = pipeline
                    .version
                    .clone()
                    .unwrap_or_else(|| short_version(&checksum));
                (Box::new(pipeline) as Box<dyn Classifier>, version)
            }
            ModelFormat::Onnx => {
                let classifier = OnnxClassifier::from_bytes(&bytes, schema.len())?;
                (
                    Box::new(classifier) as Box<dyn Classifier>,
                    short_version(&checksum),
                )
            }
        };

        let info = ModelInfo {
            path: path.to_path_buf(),
            format,
            kind: classifier.kind().to_string(),
            version,
            checksum,
            size_bytes: bytes.len(),
            loaded_at: chrono::Utc::now().timestamp(),
        };

        info!(
            path = %path.display(),
            format = format.as_str(),
            version = %info.version,
            checksum = %info.checksum,
            size_bytes = info.size_bytes,
            "Model artifact loaded"
        );

        Ok(Self { classifier, info })
    }

    /// Load the artifact, degrading to `None` when it is absent or invalid
    pub fn load_optional(path: impl AsRef<Path>, schema: &ColumnSchema) -> Option<Arc<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "Model artifact not found, predictions disabled");
            return None;
        }
        match Self::load(path, schema) {
            Ok(artifact) => Some(Arc::new(artifact)),
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(
                    path = %path.display(),
                    error = %error,
                    "Failed to load model artifact, predictions disabled"
                );
                None
            }
        }
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }
}

fn short_version(checksum: &str) -> String {
    format!("sha256-{}", &checksum[..checksum.len().min(12)])
}
