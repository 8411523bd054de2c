//! Risk server - client non-payment risk prediction service
//!
//! Serves single and batch predictions from a pre-trained classifier,
//! LLM-drafted reminder mails, a portfolio chat assistant and the BI
//! dashboard dataset.

use anyhow::Result;
use risk_lib::observability::StructuredLogger;
use risk_server::{api, LogFormat, ServerConfig};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load()?;

    // Initialize tracing with the configured output and env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init(),
    }

    info!(
        model_path = %config.model_path.display(),
        data_file = %config.data_file.display(),
        "Starting risk-server"
    );

    let addr = config.bind_addr()?;
    let logger = StructuredLogger::default();
    let state = api::AppState::from_config(&config, logger.clone()).await?;

    let model_version = state.predictor.model_info().map(|info| info.version.clone());
    logger.log_startup(SERVICE_VERSION, model_version.as_deref());

    state.health_registry.set_ready(true).await;

    api::serve(addr, Arc::new(state), shutdown_signal(logger)).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal(logger: StructuredLogger) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => logger.log_shutdown("SIGINT received"),
        _ = terminate => logger.log_shutdown("SIGTERM received"),
    }
}
