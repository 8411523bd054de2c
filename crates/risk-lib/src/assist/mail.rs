//! Reminder mail drafting

use super::client::{ChatMessage, TextGenerator};
use super::{FEATURE_MAIL, OUTCOME_ERROR, OUTCOME_FALLBACK, OUTCOME_SUCCESS};
use crate::observability::{ServiceMetrics, StructuredLogger};
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_LANGUAGE: &str = "French";
pub const DEFAULT_CURRENCY: &str = "XAF";

const TONE: &str = "courteous but firm, a friendly reminder that recalls the due dates \
                    and the consequences of late payment";

/// Drafts payment reminder mails for overdue clients
#[derive(Clone)]
pub struct ReminderMailer {
    generator: Option<Arc<dyn TextGenerator>>,
    language: String,
    currency: String,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl ReminderMailer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            generator,
            language: DEFAULT_LANGUAGE.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::default(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub fn prompt(&self, client_name: &str, amount_due: f64) -> String {
        format!(
            "Write a payment reminder mail to a client named {name} who has an unpaid invoice \
             of {amount} {currency}.\n\
             The tone must be {tone}.\n\
             The mail must be short, clear and professional, written in {language}.\n\
             Structure it with a clear subject line, a greeting, the body and a closing formula.",
            name = client_name,
            amount = format_amount(amount_due),
            currency = self.currency,
            tone = TONE,
            language = self.language,
        )
    }

    /// Draft a reminder mail; never fails, degraded paths return a fixed text
    pub async fn generate(&self, client_name: &str, amount_due: f64) -> String {
        let Some(generator) = &self.generator else {
            self.record(OUTCOME_FALLBACK);
            return format!(
                "AI service unavailable. Reminder mail for {} (amount: {} {}).",
                client_name,
                format_amount(amount_due),
                self.currency
            );
        };

        let messages = [ChatMessage::user(self.prompt(client_name, amount_due))];
        match generator.complete(&messages).await {
            Ok(mail) => {
                self.record(OUTCOME_SUCCESS);
                mail
            }
            Err(e) => {
                warn!(error = %e, "Reminder mail generation failed");
                self.record(OUTCOME_ERROR);
                format!(
                    "Sorry, an error occurred while contacting the AI service: {}",
                    e
                )
            }
        }
    }

    fn record(&self, outcome: &str) {
        self.metrics.inc_text_generation(FEATURE_MAIL, outcome);
        self.logger.log_text_generation(FEATURE_MAIL, outcome);
    }
}

/// Round to a whole amount and group thousands with commas, e.g. `1500000.4` -> `"1,500,000"`
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}
