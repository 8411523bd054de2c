//! HTTP API: predictions, text generation, dashboard data and service status

mod assist;
mod dashboard;
mod error;
mod predict;
mod status;

pub use error::{ApiError, ApiResult};

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use risk_lib::{
    assist::{ChatAssistant, GroqClient, ReminderMailer, TextGenerator},
    dashboard::ClientsDataset,
    health::HealthRegistry,
    observability::{ServiceMetrics, StructuredLogger},
    predictor::{ModelArtifact, PredictionService},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub predictor: PredictionService,
    pub mailer: ReminderMailer,
    pub assistant: ChatAssistant,
    pub dataset: ClientsDataset,
    pub health_registry: HealthRegistry,
    pub upload_limit_bytes: usize,
}

impl AppState {
    /// Wire every service from configuration
    ///
    /// A missing model, API key or data file degrades the matching component
    /// instead of failing startup.
    pub async fn from_config(config: &ServerConfig, logger: StructuredLogger) -> Result<Self> {
        let schema = config.schema()?;
        let metrics = ServiceMetrics::new();

        let model = ModelArtifact::load_optional(&config.model_path, &schema);
        match model.as_deref().map(ModelArtifact::info) {
            Some(info) => {
                metrics.set_model(Some((info.version.as_str(), info.format.as_str())));
                logger.log_model_loaded(&info.version, info.format.as_str(), &info.checksum);
            }
            None => {
                metrics.set_model(None);
                logger.log_model_unavailable(&config.model_path.display().to_string());
            }
        }

        let generator: Option<Arc<dyn TextGenerator>> = match config.llm.usable_api_key() {
            Some(key) => {
                let client = GroqClient::new(key, config.llm.client_config())
                    .context("Failed to create text-generation client")?;
                info!(model = %client.model(), "Text generation enabled");
                Some(Arc::new(client))
            }
            None => None,
        };

        let dataset = ClientsDataset::new(&config.data_file, &config.risk_column);

        let health_registry = HealthRegistry::new();
        health_registry
            .report_model(model.as_deref().map(ModelArtifact::info))
            .await;
        health_registry
            .report_text_generation(generator.is_some())
            .await;
        health_registry.report_dataset(dataset.path()).await;

        Ok(Self {
            predictor: PredictionService::new(model, schema).with_logger(logger.clone()),
            mailer: ReminderMailer::new(generator.clone())
                .with_language(&config.llm.language)
                .with_currency(&config.llm.currency)
                .with_logger(logger.clone()),
            assistant: ChatAssistant::new(generator, Some(dataset.clone())).with_logger(logger),
            dataset,
            health_registry,
            upload_limit_bytes: config.upload_limit_bytes,
        })
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.upload_limit_bytes;

    Router::new()
        .route("/", get(status::index))
        .route("/predict", post(predict::predict))
        .route("/predict_batch", post(predict::predict_batch))
        .route("/generate_mail", post(assist::generate_mail))
        .route("/api/chat", post(assist::chat))
        .route("/api/clients_data", get(dashboard::clients_data))
        .route("/api/clients_summary", get(dashboard::clients_summary))
        .route("/healthz", get(status::healthz))
        .route("/readyz", get(status::readyz))
        .route("/metrics", get(status::metrics))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    Ok(())
}
