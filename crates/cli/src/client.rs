//! API client for communicating with the risk server

use anyhow::{Context, Result};
use reqwest::{multipart, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use url::Url;

/// API client for the risk server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .user_agent(concat!("riskctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;
        response.json().await.context("Failed to parse response")
    }

    /// Fetch `/healthz`, which answers 503 with the same report when unhealthy
    pub async fn health(&self) -> Result<HealthReport> {
        let url = self.base_url.join("/healthz").context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let response = if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            response
        } else {
            check_status(response).await?
        };
        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;
        response.json().await.context("Failed to parse response")
    }

    /// Upload a file as the `file` multipart field and return the raw response body
    pub async fn upload(&self, path: &str, file: &Path) -> Result<Vec<u8>> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .context("Invalid content type")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .context("Failed to send request")?;

        let response = check_status(response).await?;
        let body = response.bytes().await.context("Failed to read response")?;
        Ok(body.to_vec())
    }
}

async fn check_status(response: Response) -> Result<Response> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("API error ({}): {}", status, body);
    }
    Ok(response)
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction_label: String,
    pub prediction_value: u8,
    pub probability_percent: String,
    pub probability_float: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailRequest {
    pub client_name: String,
    pub amount_due: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailResponse {
    pub generated_mail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// One dashboard row, keyed by column name
pub type ClientRow = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorSummary {
    pub sector: String,
    pub clients: usize,
    pub at_risk: usize,
    pub risk_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_clients: usize,
    pub at_risk_clients: usize,
    pub at_risk_percent: f64,
    pub mean_monthly_amount: f64,
    pub mean_reminders: f64,
    pub sectors: Vec<SectorSummary>,
    pub most_affected_sector: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub kind: String,
    pub version: String,
    pub format: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    pub version: String,
    pub model_loaded: bool,
    #[serde(default)]
    pub model: Option<ModelSummary>,
    pub text_generation_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub components: std::collections::BTreeMap<String, ComponentHealth>,
}
