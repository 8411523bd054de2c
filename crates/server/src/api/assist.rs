//! Text-generation endpoints

use super::{ApiError, ApiResult, AppState};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct MailResponse {
    pub generated_mail: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Draft a reminder mail for `{client_name, amount_due}`
pub async fn generate_mail(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<MailResponse>> {
    let Json(body) = payload?;
    let client_name = non_empty_str(&body, "client_name");
    let amount_due = body.get("amount_due").filter(|v| !v.is_null());

    let (Some(client_name), Some(amount_due)) = (client_name, amount_due) else {
        return Err(ApiError::BadRequest(
            "fields 'client_name' and 'amount_due' are required".to_string(),
        ));
    };
    let amount_due = parse_amount(amount_due)
        .ok_or_else(|| ApiError::BadRequest("field 'amount_due' must be a number".to_string()))?;

    let generated_mail = state.mailer.generate(client_name, amount_due).await;
    Ok(Json(MailResponse { generated_mail }))
}

/// Answer a question about the client portfolio
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(body) = payload?;
    let message = non_empty_str(&body, "message")
        .ok_or_else(|| ApiError::BadRequest("missing message".to_string()))?;

    let reply = state.assistant.reply(message).await;
    Ok(Json(ChatResponse { reply }))
}

fn non_empty_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Numbers and numeric strings are both accepted
fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|amount| amount.is_finite())
}
