//! CLI integration tests

use std::process::{Command, Output};

fn riskctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_riskctl"))
        .args(args)
        .env_remove("RISK_API_URL")
        .output()
        .expect("Failed to execute riskctl")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = riskctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Client Risk Predictor"),
        "Should show app name"
    );
    for command in ["predict", "batch", "mail", "chat", "clients", "status"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = riskctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("riskctl"), "Should show binary name");
}

#[test]
fn test_predict_help() {
    let output = riskctl(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--file"), "Should show file option");
    assert!(stdout.contains("--field"), "Should show field option");
}

#[test]
fn test_mail_requires_amount() {
    let output = riskctl(&["mail", "--client", "Alpha"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("--amount"), "Should name the missing option");
}

#[test]
fn test_mail_rejects_non_numeric_amount() {
    let output = riskctl(&["mail", "--client", "Alpha", "--amount", "lots"]);
    assert!(!output.status.success());
}

#[test]
fn test_format_option() {
    let output = riskctl(&["--format", "yaml", "status"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown format should fail");
    assert!(stderr.contains("table") || stderr.contains("json"));
}

#[test]
fn test_invalid_command() {
    let output = riskctl(&["approve"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_predict_without_fields_fails_before_request() {
    // Port 9 is discard; the command must fail on input validation first
    let output = riskctl(&["--api-url", "http://127.0.0.1:9", "predict"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("No client fields given"));
}

#[test]
fn test_api_error_surfaces_status_and_body() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/api/clients_data")
        .with_status(404)
        .with_body(r#"{"error":"file 'clients_impayes.csv' not found on the server"}"#)
        .create();

    let url = server.url();
    let output = riskctl(&["--api-url", &url, "clients"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("404"), "Should show status code: {}", stderr);
    assert!(stderr.contains("clients_impayes.csv"), "Should show body");
}

#[test]
fn test_predict_json_output() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/predict")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"prediction_label":"At Risk","prediction_value":1,"probability_percent":"88.08%","probability_float":0.8808}"#,
        )
        .create();

    let url = server.url();
    let output = riskctl(&[
        "--api-url",
        &url,
        "--format",
        "json",
        "predict",
        "--field",
        "Nb_factures_impayees=2",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("\"prediction_label\": \"At Risk\""));
    assert!(stdout.contains("88.08%"));
}

#[test]
fn test_batch_writes_output_file() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", "/predict_batch")
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body("ID_client,prediction_label\nCL1,At Risk\nCL2,Low Risk\n")
        .create();

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clients.csv");
    let scored = dir.path().join("scored.csv");
    std::fs::write(&input, "ID_client\nCL1\nCL2\n").unwrap();

    let url = server.url();
    let output = riskctl(&[
        "--api-url",
        &url,
        "batch",
        input.to_str().unwrap(),
        "--output",
        scored.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let written = std::fs::read_to_string(&scored).unwrap();
    assert!(written.contains("CL2,Low Risk"));
}
