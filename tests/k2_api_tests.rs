//! Integration tests using mock HTTP server
//!
//! Tests the full flow: config file → K2 REST API → Parquet tables and state

use clap::Parser;
use k2_extractor::cli::{Cli, Runner};
use k2_extractor::client::sign_request;
use k2_extractor::output::TableManifest;
use k2_extractor::state::RunState;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn line(id: i64) -> Value {
    json!({"DOClassName": "InvoiceLine", "FieldValues": [{"Name": "LineId", "Value": id}]})
}

fn invoice(id: i64, lines: Vec<Value>) -> Value {
    json!({
        "DOClassName": "Invoice",
        "FieldValues": [
            {"Name": "Id", "Value": id},
            {"Name": "Number", "Value": format!("INV-{id}")},
            {"Name": "Customer", "Value": {
                "__type": "DataObjectWrapper:K2.Data",
                "DOClassName": "Customer",
                "FieldValues": [{"Name": "Name", "Value": "ACME"}]
            }},
            {"Name": "Lines", "Value": {
                "__type": "ChildDataObjectWrapper:K2.Data",
                "Items": lines
            }}
        ]
    })
}

async fn mount_metadata(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/svc/Meta/Invoice"))
        .and(header(
            "Authorization",
            sign_request("user", "pass", &format!("{}/svc/Meta/Invoice", server.uri()))
                .unwrap()
                .as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ClassName": "Invoice",
            "Caption": "Invoices",
            "FieldList": [
                {"FieldName": "Id", "Description": "Identifier"},
                {"FieldName": "Number", "Description": "Invoice number"}
            ],
            "PrimaryKeyFieldList": [{"FieldName": "Id"}],
            "ChildList": [{"FieldName": "Lines", "ChildClassName": "InvoiceLine"}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/svc/Meta/InvoiceLine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ClassName": "InvoiceLine",
            "FieldList": [{"FieldName": "LineId"}],
            "PrimaryKeyFieldList": [{"FieldName": "LineId"}],
            "ChildList": []
        })))
        .mount(server)
        .await;
}

fn write_config(dir: &Path, server: &MockServer, extra: &str) -> PathBuf {
    let path = dir.join("config.json");
    let body = format!(
        r##"{{
            "parameters": {{
                "username": "user",
                "#password": "pass",
                "data_object": "Invoice",
                "fields": "Number, Lines",
                "source_url": "{}",
                "service_name": "svc",
                "page_size": 1,
                "http": {{"timeout_secs": 5, "max_retries": 0}}
                {extra}
            }}
        }}"##,
        server.uri()
    );
    std::fs::write(&path, body).unwrap();
    path
}

fn runner(command: &str, config: &Path, state: &Path, output: &Path) -> Runner {
    Runner::new(
        Cli::try_parse_from([
            "k2-extractor",
            command,
            "-C",
            config.to_str().unwrap(),
            "-s",
            state.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap(),
    )
}

fn read_manifest(dir: &Path, table: &str) -> TableManifest {
    let content = std::fs::read_to_string(dir.join(format!("{table}.manifest.json"))).unwrap();
    serde_json::from_str(&content).unwrap()
}

// ============================================================================
// Runs
// ============================================================================

#[tokio::test]
async fn test_full_load_over_http() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_metadata(&server).await;

    let next_url = format!("{}/svc/Data/Invoice?page=2", server.uri());
    Mock::given(method("GET"))
        .and(path("/svc/Data/Invoice"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [invoice(2, vec![line(20)])],
            "NextPageUrl": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/svc/Data/Invoice"))
        .and(query_param("fields", "Number,Lines"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [invoice(1, vec![line(10), line(11)])],
            "NextPageUrl": next_url
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = write_config(dir.path(), &server, "");
    let state = dir.path().join("state.json");
    let output = dir.path().join("out");

    let result = runner("run", &config, &state, &output)
        .execute()
        .await
        .unwrap();

    assert_eq!(result["type"], "STATS");
    assert_eq!(result["stats"]["pages"], 2);
    assert_eq!(result["stats"]["records"], 2);
    assert_eq!(result["stats"]["rows_per_table"]["Invoice_Lines"], 3);

    let root = read_manifest(&output, "Invoice");
    assert_eq!(root.columns, vec!["Id", "Number", "Customer_Name"]);
    assert_eq!(root.description.as_deref(), Some("Invoices"));
    assert_eq!(root.column_descriptions["Number"], "Invoice number");

    let lines = read_manifest(&output, "Invoice_Lines");
    assert_eq!(lines.columns, vec!["LineId", "Invoice_Id"]);
    assert!(output.join("Invoice_Lines.parquet").exists());

    let saved: RunState = serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    assert!(saved.last_run.is_some());
    assert_eq!(saved.previous_columns("Invoice_Lines"), vec!["LineId", "Invoice_Id"]);
}

#[tokio::test]
async fn test_incremental_load_sends_window_condition() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_metadata(&server).await;

    Mock::given(method("GET"))
        .and(path("/svc/Data/Invoice"))
        .and(query_param(
            "conditions",
            "Status;EQ;Open,TimeStamp;GE;2024-05-01 10:00:00,TimeStamp;LE;2024-06-01 00:00:00",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [invoice(1, vec![])],
            "NextPageUrl": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = write_config(
        dir.path(),
        &server,
        r#", "conditions": "Status;EQ;Open",
            "loading_options": {"load_type": "Incremental load", "incremental_field": "TimeStamp",
                                "date_from": "last run", "date_to": "2024-06-01"}"#,
    );
    let state = dir.path().join("state.json");
    std::fs::write(
        &state,
        r#"{"last_run": "2024-05-01 10:00:00", "previous_columns": {"Invoice": ["Id", "Legacy"]}}"#,
    )
    .unwrap();
    let output = dir.path().join("out");

    runner("run", &config, &state, &output)
        .execute()
        .await
        .unwrap();

    let root = read_manifest(&output, "Invoice");
    assert!(root.incremental);
    assert_eq!(root.columns, vec!["Id", "Legacy", "Number", "Customer_Name"]);

    let saved: RunState = serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
    assert_ne!(saved.last_run.as_deref(), Some("2024-05-01 10:00:00"));
}

#[tokio::test]
async fn test_resolve_prints_routing_table_without_data_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_metadata(&server).await;

    Mock::given(method("GET"))
        .and(path("/svc/Data/Invoice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = write_config(dir.path(), &server, "");
    let output = dir.path().join("out");

    let result = runner("resolve", &config, &dir.path().join("state.json"), &output)
        .execute()
        .await
        .unwrap();

    assert_eq!(result["root"], "Invoice");
    assert_eq!(
        result["tables"],
        json!([
            {"table_name": "Invoice", "class_name": "Invoice", "primary_keys": ["Id"],
             "foreign_keys": [], "parent_table": null, "description": "Invoices"},
            {"table_name": "Invoice_Lines", "class_name": "InvoiceLine",
             "primary_keys": ["LineId", "Invoice_Id"], "foreign_keys": ["Invoice_Id"],
             "parent_table": "Invoice"}
        ])
    );
    assert!(!output.exists());
}

#[tokio::test]
async fn test_authorization_failure_is_runtime_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = write_config(dir.path(), &server, "");
    let state = dir.path().join("state.json");
    let output = dir.path().join("out");

    let err = runner("run", &config, &state, &output)
        .execute()
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert!(!output.exists());
    assert!(!state.exists());
}
