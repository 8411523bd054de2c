//! Dashboard dataset endpoints

use super::{ApiError, ApiResult, AppState};
use axum::{extract::State, Json};
use risk_lib::dashboard::{ClientsDataset, DashboardSummary};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Every row of the dashboard CSV as a JSON object
pub async fn clients_data(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Map<String, Value>>>> {
    let records = read_dataset(&state, ClientsDataset::load_records).await?;
    Ok(Json(records))
}

/// Headline KPIs of the dashboard CSV
pub async fn clients_summary(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<DashboardSummary>> {
    let summary = read_dataset(&state, ClientsDataset::summary).await?;
    Ok(Json(summary))
}

/// Run a dataset read off the async workers, mapping absence to 404
///
/// Every read refreshes the `dashboard_data` health component.
async fn read_dataset<T, F>(state: &AppState, read: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&ClientsDataset) -> anyhow::Result<Option<T>> + Send + 'static,
{
    let dataset = state.dataset.clone();
    let result = tokio::task::spawn_blocking(move || read(&dataset))
        .await
        .map_err(|e| ApiError::Internal(format!("dataset task failed: {}", e)))?;

    let path = state.dataset.path();
    match result {
        Ok(Some(value)) => {
            state.health_registry.report_dataset_read(path, None).await;
            Ok(value)
        }
        Ok(None) => {
            state.health_registry.report_dataset_read(path, None).await;
            Err(ApiError::NotFound(format!(
                "file '{}' not found on the server",
                path.display()
            )))
        }
        Err(e) => {
            let error = format!("{:#}", e);
            state
                .health_registry
                .report_dataset_read(path, Some(&error))
                .await;
            Err(ApiError::Internal(error))
        }
    }
}
