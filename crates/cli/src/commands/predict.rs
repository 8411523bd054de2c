//! Prediction commands

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};

use crate::client::{ApiClient, PredictionResult};
use crate::output::{color_label, print_info, print_json, print_success, OutputFormat};

/// Score one client built from a JSON file and/or `NAME=VALUE` pairs
pub async fn predict(
    client: &ApiClient,
    file: Option<PathBuf>,
    fields: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let record = build_record(file.as_deref(), &fields)?;
    let result: PredictionResult = client.post("/predict", &record).await?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Table => {
            println!("{}", "Risk Prediction".bold());
            println!("{}", "=".repeat(40));
            println!("Label:       {}", color_label(&result.prediction_label));
            println!("Class:       {}", result.prediction_value);
            println!("Probability: {}", result.probability_percent.cyan());
        }
    }

    Ok(())
}

/// Upload a CSV and write the scored CSV to `output` or stdout
pub async fn batch(client: &ApiClient, csv: &Path, output: Option<PathBuf>) -> Result<()> {
    let body = client.upload("/predict_batch", csv).await?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, &body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            let rows = body.iter().filter(|b| **b == b'\n').count().saturating_sub(1);
            print_success(&format!("Wrote {} scored row(s) to {}", rows, path.display()));
        }
        None => {
            let text = String::from_utf8_lossy(&body);
            print!("{}", text);
            if text.is_empty() {
                print_info("Server returned an empty file");
            }
        }
    }

    Ok(())
}

/// Merge the optional JSON file with `NAME=VALUE` overrides
fn build_record(file: Option<&Path>, fields: &[String]) -> Result<Map<String, Value>> {
    let mut record = match file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str(&raw).context("Invalid JSON record")? {
                Value::Object(map) => map,
                _ => bail!("{} must contain a JSON object", path.display()),
            }
        }
        None => Map::new(),
    };

    for field in fields {
        let (name, value) = field
            .split_once('=')
            .with_context(|| format!("Invalid field '{}', expected NAME=VALUE", field))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("Invalid field '{}', empty name", field);
        }
        record.insert(name.to_string(), parse_value(value));
    }

    if record.is_empty() {
        bail!("No client fields given, use --file or --field NAME=VALUE");
    }
    Ok(record)
}

/// Numbers go out as JSON numbers, everything else as strings
fn parse_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(trimmed.to_string()))
}
