//! Server configuration

use anyhow::{Context, Result};
use risk_lib::assist::{GroqConfig, DEFAULT_BASE_URL, DEFAULT_CURRENCY, DEFAULT_LANGUAGE, DEFAULT_MODEL};
use risk_lib::schema::{ColumnSchema, DEFAULT_COLUMNS};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "RISK_CONFIG";

/// Config file read when `RISK_CONFIG` is unset; optional
pub const DEFAULT_CONFIG_FILE: &str = "config/risk-server.toml";

const ENV_PREFIX: &str = "RISK";

/// Legacy variable holding the Groq key
const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Placeholder shipped in sample config files, never a real key
const PLACEHOLDER_API_KEY: &str = "votre_cle_api_ici";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Serialized classifier (`.json` or `.onnx`)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Feature columns in the order the model was trained on
    #[serde(default = "default_expected_columns")]
    pub expected_columns: Vec<String>,

    /// CSV served to the BI dashboard
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Ground-truth risk column of the dashboard CSV
    #[serde(default = "default_risk_column")]
    pub risk_column: String,

    /// Maximum request body size, in bytes
    #[serde(default = "default_upload_limit")]
    pub upload_limit_bytes: usize,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// Hosted text-generation settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            currency: default_currency(),
            language: default_language(),
        }
    }
}

impl LlmConfig {
    pub fn client_config(&self) -> GroqConfig {
        GroqConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    /// The configured key, if it is a usable one
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/lr_impaye_model.json")
}

fn default_expected_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("clients_impayes.csv")
}

fn default_risk_column() -> String {
    "Risque_impaye".to_string()
}

fn default_upload_limit() -> usize {
    10 * 1024 * 1024
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_llm_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_llm_timeout() -> u64 {
    30
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_path: default_model_path(),
            expected_columns: default_expected_columns(),
            data_file: default_data_file(),
            risk_column: default_risk_column(),
            upload_limit_bytes: default_upload_limit(),
            log_format: default_log_format(),
            llm: LlmConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file and `RISK_*` environment variables
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let required = explicit.is_some();
        let path = PathBuf::from(explicit.unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()));

        Self::from_sources(
            Some((path, required)),
            None,
            std::env::var(GROQ_API_KEY_ENV).ok(),
        )
    }

    /// Build from an optional file plus environment overrides
    ///
    /// `env_vars` replaces the process environment when given.
    pub fn from_sources(
        file: Option<(PathBuf, bool)>,
        env_vars: Option<HashMap<String, String>>,
        groq_api_key: Option<String>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some((path, required)) = file {
            builder = builder.add_source(config::File::from(path).required(required));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("expected_columns")
                .try_parsing(true)
                .source(env_vars),
        );

        let mut config: ServerConfig = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.llm.usable_api_key().is_none() {
            config.llm.api_key = groq_api_key.filter(|key| !key.trim().is_empty());
        }
        config
            .schema()
            .context("Invalid expected_columns setting")?;

        Ok(config)
    }

    pub fn schema(&self) -> Result<ColumnSchema> {
        Ok(ColumnSchema::new(self.expected_columns.iter().map(|c| c.trim()))?)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}
