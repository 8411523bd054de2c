//! Prediction endpoints

use super::{ApiError, ApiResult, AppState};
use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use risk_lib::{models::record_from_json, PredictionResult, Table, TableError};
use serde_json::Value;
use std::sync::Arc;

const UPLOAD_FIELD: &str = "file";
const RESULT_FILENAME: &str = "predictions.csv";

/// Score one client sent as a JSON object
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PredictionResult>> {
    let Json(body) = payload?;
    let object = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("request body must be a JSON object".to_string()))?;
    let record = record_from_json(object)
        .map_err(|key| ApiError::BadRequest(format!("field '{}' must be a scalar value", key)))?;

    let result = state.predictor.predict_single(&record)?;
    Ok(Json(result))
}

/// Score an uploaded CSV and return it with the prediction columns appended
pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Response> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let (filename, bytes) = read_upload(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("no file provided".to_string()))?;

    if !filename.ends_with(".csv") {
        return Err(ApiError::BadRequest(
            "unsupported file format (CSV required)".to_string(),
        ));
    }

    let predictor = state.predictor.clone();
    let csv = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, TableError> {
        let table = Table::from_csv_bytes(&bytes)?;
        predictor.predict_batch(table).to_csv_bytes()
    })
    .await
    .map_err(|e| ApiError::Internal(format!("batch task failed: {}", e)))?
    .map_err(upload_error)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", RESULT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}

/// First `file` field of the form, with its client-side filename
async fn read_upload(multipart: &mut Multipart) -> ApiResult<Option<(String, Bytes)>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some((filename, bytes)));
    }
    Ok(None)
}

/// Header problems are the uploader's to fix; anything else is a processing failure
fn upload_error(err: TableError) -> ApiError {
    match err {
        TableError::DuplicateColumn(_) | TableError::MissingHeader => {
            ApiError::BadRequest(format!("invalid CSV header: {}", err))
        }
        other => ApiError::Internal(format!("error while processing the file: {}", other)),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
