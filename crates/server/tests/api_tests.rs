//! Integration tests for the risk-server API endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use risk_lib::health::{components, ComponentHealth};
use risk_server::{create_router, AppState, ServerConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "risk-test-boundary";

const FEATURES: [&str; 8] = [
    "Anciennete",
    "Nb_factures_impayees",
    "Moyenne_retards_jours",
    "Delai_moyen_paiement",
    "Montant_mensuel",
    "Nb_tickets_service",
    "Note_satisfaction",
    "Nb_relances",
];

const DATASET: &str = "\
ID_client,Secteur_activite,Montant_mensuel,Nb_relances,Risque_impaye
CL0001,Commerce,100000,2,1
CL0002,Industrie,50000,,0
CL0003,Commerce,30000,4,1
";

/// Logistic artifact where only `Nb_factures_impayees` carries weight,
/// so P(at risk) = sigmoid(invoices)
fn model_json() -> String {
    let mut features: Vec<Value> = FEATURES
        .iter()
        .map(|name| json!({"type": "numeric", "name": name}))
        .collect();
    features.push(json!({"type": "categorical", "name": "Type_organisation", "categories": ["PME", "TPE"]}));
    features.push(json!({"type": "categorical", "name": "Secteur_activite", "categories": ["Commerce", "Industrie"]}));
    features.push(json!({"type": "categorical", "name": "Type_abonnement", "categories": ["Basique", "Premium"]}));

    let mut coefficients = vec![0.0; 14];
    coefficients[1] = 1.0;

    json!({
        "version": "test-model",
        "features": features,
        "coefficients": coefficients,
        "intercept": 0.0
    })
    .to_string()
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _dir: TempDir,
}

async fn setup_app(with_model: bool, with_dataset: bool) -> TestApp {
    setup_app_with(with_model, with_dataset, |_| {}).await
}

async fn setup_app_with(
    with_model: bool,
    with_dataset: bool,
    customize: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    let data_path = dir.path().join("clients.csv");
    if with_model {
        std::fs::write(&model_path, model_json()).unwrap();
    }
    if with_dataset {
        std::fs::write(&data_path, DATASET).unwrap();
    }

    let mut config = ServerConfig {
        model_path,
        data_file: data_path,
        ..ServerConfig::default()
    };
    config.llm.api_key = None;
    customize(&mut config);

    let state = AppState::from_config(&config, Default::default())
        .await
        .unwrap();
    let state = Arc::new(state);
    TestApp {
        router: create_router(state.clone()),
        state,
        _dir: dir,
    }
}

fn client_record() -> Value {
    json!({
        "ID_client": "CL0042",
        "Anciennete": 5,
        "Nb_factures_impayees": 2,
        "Moyenne_retards_jours": 12,
        "Delai_moyen_paiement": 30,
        "Montant_mensuel": 150000,
        "Nb_tickets_service": 3,
        "Note_satisfaction": 2,
        "Nb_relances": 4,
        "Type_organisation": "PME",
        "Secteur_activite": "Commerce",
        "Type_abonnement": "Premium"
    })
}

fn batch_csv() -> String {
    let mut csv = String::from("ID_client,");
    csv.push_str(&FEATURES.join(","));
    csv.push_str(",Type_organisation,Secteur_activite,Type_abonnement\n");
    for (id, invoices) in [("CL1", 3), ("CL2", -2), ("CL3", 0)] {
        csv.push_str(&format!(
            "{},5,{},1,30,100000,1,3,2,PME,Commerce,Basique\n",
            id, invoices
        ));
    }
    csv
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn upload_request(field: &str, filename: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\r\n{contents}\r\n--{b}--\r\n",
        b = BOUNDARY,
        field = field,
        filename = filename,
        contents = contents,
    );
    Request::builder()
        .method("POST")
        .uri("/predict_batch")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_index_reports_model() {
    let app = setup_app(true, false).await;

    let response = app.router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["model"]["version"], "test-model");
    assert_eq!(body["model"]["format"], "json");
    assert_eq!(body["text_generation_enabled"], false);
}

#[tokio::test]
async fn test_predict_single_client() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .oneshot(json_request("POST", "/predict", &client_record()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["prediction_label"], "At Risk");
    assert_eq!(body["prediction_value"], 1);
    assert_eq!(body["probability_percent"], "88.08%");
    let p = body["probability_float"].as_f64().unwrap();
    assert!((p - 0.880_797_077_977_882_3).abs() < 1e-12);
}

#[tokio::test]
async fn test_predict_low_risk() {
    let app = setup_app(true, false).await;
    let mut record = client_record();
    record["Nb_factures_impayees"] = json!(-1);

    let response = app
        .router
        .oneshot(json_request("POST", "/predict", &record))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["prediction_label"], "Low Risk");
    assert_eq!(body["prediction_value"], 0);
}

#[tokio::test]
async fn test_predict_missing_column() {
    let app = setup_app(true, false).await;
    let mut record = client_record();
    record.as_object_mut().unwrap().remove("Note_satisfaction");

    let response = app
        .router
        .oneshot(json_request("POST", "/predict", &record))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "missing required columns: Note_satisfaction");
    assert_eq!(body["kind"], "schema_error");
}

#[tokio::test]
async fn test_predict_without_model() {
    let app = setup_app(false, false).await;

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", "/predict", &client_record()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "model not available");
        assert_eq!(body["kind"], "model_unavailable");
    }
}

#[tokio::test]
async fn test_predict_rejects_non_object_body() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/predict", &json!([1, 2, 3])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.oneshot(malformed).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_predict_batch_appends_columns() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .oneshot(upload_request("file", "clients.csv", &batch_csv()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=predictions.csv"
    );

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("ID_client,Anciennete,"));
    assert!(lines[0].ends_with(",risk_label,risk_probability"));
    assert!(lines[1].starts_with("CL1,"));
    assert!(lines[1].contains(",1,0.95"));
    assert!(lines[2].starts_with("CL2,"));
    assert!(lines[2].contains(",0,0.11"));
    assert!(lines[3].ends_with(",0,0.5"));
}

#[tokio::test]
async fn test_predict_batch_without_model_embeds_error() {
    let app = setup_app(false, false).await;

    let response = app
        .router
        .oneshot(upload_request("file", "clients.csv", &batch_csv()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with(",Type_abonnement,error"));
    assert!(lines[1..].iter().all(|l| l.ends_with(",model not available")));
}

#[tokio::test]
async fn test_predict_batch_missing_columns_embeds_error() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .oneshot(upload_request(
            "file",
            "clients.csv",
            "ID_client,Anciennete\nCL1,4\nCL2,8\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["ID_client", "Anciennete", "error"]
    );
    let errors: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[2].to_string())
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("missing required columns: Delai_moyen_paiement"));
    assert_eq!(errors[0], errors[1]);
}

#[tokio::test]
async fn test_predict_batch_rejects_non_csv() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .oneshot(upload_request("file", "clients.xlsx", &batch_csv()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "unsupported file format (CSV required)"
    );
}

#[tokio::test]
async fn test_predict_batch_requires_file_field() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .oneshot(upload_request("document", "clients.csv", &batch_csv()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "no file provided");
}

#[tokio::test]
async fn test_predict_batch_unreadable_csv() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .oneshot(upload_request("file", "clients.csv", "a,b\n1,2\n3\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("error while processing the file"));
}

#[tokio::test]
async fn test_predict_batch_duplicate_header_is_bad_request() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .oneshot(upload_request("file", "clients.csv", "ID_client,a,a\nCL1,1,2\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert_eq!(error, "invalid CSV header: duplicate column: a");
}

#[tokio::test]
async fn test_predict_batch_over_upload_limit() {
    let app = setup_app_with(true, false, |config| config.upload_limit_bytes = 256).await;

    let response = app
        .router
        .oneshot(upload_request("file", "clients.csv", &batch_csv().repeat(10)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_generate_mail_fallback() {
    let app = setup_app(false, false).await;

    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/generate_mail",
            &json!({"client_name": "Société Alpha", "amount_due": "1500000"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["generated_mail"],
        "AI service unavailable. Reminder mail for Société Alpha (amount: 1,500,000 XAF)."
    );
}

#[tokio::test]
async fn test_generate_mail_validation() {
    let app = setup_app(false, false).await;

    for body in [
        json!({"amount_due": 100}),
        json!({"client_name": "", "amount_due": 100}),
        json!({"client_name": "Alpha"}),
        json!({"client_name": "Alpha", "amount_due": "a lot"}),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", "/generate_mail", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }
}

#[tokio::test]
async fn test_chat() {
    let app = setup_app(false, true).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/api/chat", &json!({"message": "Combien de clients ?"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["reply"],
        risk_lib::assist::UNAVAILABLE_REPLY
    );

    let response = app
        .router
        .oneshot(json_request("POST", "/api/chat", &json!({"message": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing message");
}

#[tokio::test]
async fn test_clients_data() {
    let app = setup_app(false, true).await;

    let response = app.router.oneshot(get("/api/clients_data")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["ID_client"], "CL0001");
    assert_eq!(rows[0]["Montant_mensuel"], 100000);
    assert_eq!(rows[1]["Nb_relances"], Value::Null);
}

#[tokio::test]
async fn test_clients_data_missing_file() {
    let app = setup_app(false, false).await;

    let response = app
        .router
        .clone()
        .oneshot(get("/api/clients_data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_json(response).await["error"]
        .as_str()
        .unwrap()
        .contains("not found"));

    let response = app.router.oneshot(get("/api/clients_summary")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clients_summary() {
    let app = setup_app(false, true).await;

    let response = app.router.oneshot(get("/api/clients_summary")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_clients"], 3);
    assert_eq!(body["at_risk_clients"], 2);
    assert_eq!(body["most_affected_sector"], "Commerce");
    assert_eq!(body["sectors"][0]["sector"], "Commerce");
    assert_eq!(body["sectors"][0]["clients"], 2);
}

#[tokio::test]
async fn test_healthz_degraded_without_optional_components() {
    let app = setup_app(true, false).await;

    let response = app.router.oneshot(get("/healthz")).await.unwrap();
    // Degraded still returns 200 (operational)
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["predictor"]["status"], "healthy");
    assert_eq!(health["components"]["text_generation"]["status"], "degraded");
    assert_eq!(health["components"]["dashboard_data"]["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let app = setup_app(true, true).await;
    app.state
        .health_registry
        .update(components::PREDICTOR, ComponentHealth::unhealthy("Failed"))
        .await;

    let response = app.router.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_unreadable_dataset_marks_service_unhealthy() {
    let app = setup_app(true, false).await;
    std::fs::write(app.state.dataset.path(), "ID_client,Risque_impaye\nCL0001\n").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(get("/api/clients_data"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = app.router.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let health = body_json(response).await;
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["components"]["dashboard_data"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_startup() {
    let app = setup_app(false, false).await;

    let response = app.router.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);

    // A missing model degrades the service but does not block readiness
    app.state.health_registry.set_ready(true).await;
    let response = app.router.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup_app(true, false).await;

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/predict", &client_record()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("risk_service_predictions_total"));
    assert!(body.contains("risk_service_prediction_latency_seconds"));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = setup_app(false, false).await;
    let response = app.router.oneshot(get("/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
