//! Library for client non-payment risk prediction
//!
//! This crate provides the core functionality for:
//! - Tabular client data and the ordered column schema
//! - Model artifact loading and the prediction pipeline
//! - LLM-backed reminder mails and chat assistant
//! - Dashboard dataset access and KPI summary
//! - Health checks and observability

pub mod assist;
pub mod dashboard;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;
pub mod table;

pub use assist::{ChatAssistant, GroqClient, GroqConfig, ReminderMailer, TextGenerator};
pub use dashboard::{ClientsDataset, DashboardSummary, SectorSummary};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{ModelArtifact, ModelInfo, PredictionError, PredictionService};
pub use schema::{ColumnSchema, SchemaError, DEFAULT_COLUMNS};
pub use table::{Table, TableError};
