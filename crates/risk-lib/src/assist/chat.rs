//! Contextual chat assistant

use super::client::{ChatMessage, TextGenerator};
use super::{FEATURE_CHAT, OUTCOME_ERROR, OUTCOME_FALLBACK, OUTCOME_SUCCESS};
use crate::dashboard::{ClientsDataset, DashboardSummary};
use crate::observability::{ServiceMetrics, StructuredLogger};
use std::sync::Arc;
use tracing::warn;

pub const UNAVAILABLE_REPLY: &str = "Sorry, the assistant is not available at the moment.";
pub const ERROR_REPLY: &str = "Sorry, an error occurred while communicating with the assistant.";
const NO_DATA_CONTEXT: &str = "No client data is available at the moment.";

const SYSTEM_PROMPT: &str = "You are an expert assistant for client risk analysis. \
     Answer the user's questions concisely and professionally, \
     based EXCLUSIVELY on the data context provided. \
     Do not mention that you are an AI. Act as an assistant built into the application.";

/// Answers questions about the client portfolio
#[derive(Clone)]
pub struct ChatAssistant {
    generator: Option<Arc<dyn TextGenerator>>,
    dataset: Option<ClientsDataset>,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl ChatAssistant {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, dataset: Option<ClientsDataset>) -> Self {
        Self {
            generator,
            dataset,
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Application context handed to the model, recomputed on every question
    pub async fn context(&self) -> String {
        let Some(dataset) = self.dataset.clone() else {
            return NO_DATA_CONTEXT.to_string();
        };
        match tokio::task::spawn_blocking(move || dataset.summary()).await {
            Ok(Ok(Some(summary))) => render_context(&summary),
            Ok(Ok(None)) => NO_DATA_CONTEXT.to_string(),
            Ok(Err(e)) => {
                let error = format!("{:#}", e);
                warn!(error = %error, "Failed to summarize client data for chat context");
                NO_DATA_CONTEXT.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Chat context task failed");
                NO_DATA_CONTEXT.to_string()
            }
        }
    }

    pub async fn messages(&self, question: &str) -> Vec<ChatMessage> {
        let context = self.context().await;
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Application context:\n{}\n\nUser question:\n{}",
                context, question
            )),
        ]
    }

    /// Answer `question`; never fails, degraded paths return a fixed reply
    pub async fn reply(&self, question: &str) -> String {
        let Some(generator) = &self.generator else {
            self.record(OUTCOME_FALLBACK);
            return UNAVAILABLE_REPLY.to_string();
        };

        let messages = self.messages(question).await;
        match generator.complete(&messages).await {
            Ok(reply) => {
                self.record(OUTCOME_SUCCESS);
                reply
            }
            Err(e) => {
                warn!(error = %e, "Chat completion failed");
                self.record(OUTCOME_ERROR);
                ERROR_REPLY.to_string()
            }
        }
    }

    fn record(&self, outcome: &str) {
        self.metrics.inc_text_generation(FEATURE_CHAT, outcome);
        self.logger.log_text_generation(FEATURE_CHAT, outcome);
    }
}

fn render_context(summary: &DashboardSummary) -> String {
    format!(
        "Summary of the current application data:\n\
         - Total number of clients: {}\n\
         - Number of clients identified as at risk: {}\n\
         - Business sector with the most at-risk clients: {}",
        summary.total_clients,
        summary.at_risk_clients,
        summary.most_affected_sector.as_deref().unwrap_or("none"),
    )
}
