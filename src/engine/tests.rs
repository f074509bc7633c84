//! Tests for the extraction engine

use super::*;
use crate::decode::DataObject;
use crate::error::Error;
use crate::metadata::{EntityMetadata, PrimaryKeyPolicy, StaticMetadataProvider};
use crate::output::MemorySink;
use crate::pagination::StaticPageProvider;
use crate::state::{RunState, StateManager};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn provider() -> StaticMetadataProvider {
    [
        EntityMetadata::new("Order")
            .with_caption("Orders")
            .with_primary_keys(["Id"])
            .with_fields(["Id", "Total"])
            .with_child("Items", "OrderLine")
            .with_child("Payments", "Payment"),
        EntityMetadata::new("OrderLine")
            .with_primary_keys(["LineNo"])
            .with_child("Taxes", "Tax"),
        EntityMetadata::new("Tax").with_primary_keys(["Code"]),
        EntityMetadata::new("Payment").with_primary_keys(["PaymentId"]),
    ]
    .into_iter()
    .collect()
}

fn fields(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

fn order(id: i64, lines: &[i64]) -> DataObject {
    DataObject::new("Order")
        .scalar("Id", id)
        .scalar("Total", format!("{id}0"))
        .collection(
            "Items",
            lines
                .iter()
                .map(|l| {
                    DataObject::new("OrderLine")
                        .scalar("LineNo", *l)
                        .collection("Taxes", vec![DataObject::new("Tax").scalar("Code", "VAT")])
                })
                .collect(),
        )
}

fn job() -> ExtractionJob {
    ExtractionJob::new("Order").with_fields(fields(&["Id", "Total", "Items.Taxes"]))
}

#[test]
fn test_job_query() {
    let query = job()
        .with_conditions(Some("Status;EQ;Open".to_string()))
        .with_page_size(Some(25))
        .query();

    assert_eq!(query.class_name, "Order");
    assert_eq!(query.fields_param(), "Id,Total,Items.Taxes");
    assert_eq!(query.conditions.as_deref(), Some("Status;EQ;Open"));
    assert_eq!(query.page_size, Some(25));
}

#[tokio::test]
async fn test_plan_tables() {
    let metadata = provider();
    let data = StaticPageProvider::new(vec![]);
    let engine = ExtractionEngine::new(&metadata, &data, StateManager::in_memory());

    let plan = engine.plan(&job()).await.unwrap();

    let names: Vec<&str> = plan.tables.iter().map(|t| t.table_name.as_str()).collect();
    assert_eq!(names, vec!["Order", "Order_Items", "OrderLine_Taxes"]);

    let root = plan.table("Order").unwrap();
    assert_eq!(root.primary_keys, fields(&["Id"]));
    assert_eq!(root.description.as_deref(), Some("Orders"));
    assert!(root.parent_table.is_none());

    let items = plan.table("Order_Items").unwrap();
    assert_eq!(items.primary_keys, fields(&["LineNo", "Order_Id"]));
    assert_eq!(items.foreign_keys, fields(&["Order_Id"]));
    assert_eq!(items.parent_table.as_deref(), Some("Order"));

    let taxes = plan.table("OrderLine_Taxes").unwrap();
    assert_eq!(taxes.primary_keys, fields(&["Code", "OrderLine_LineNo"]));
    assert_eq!(taxes.parent_table.as_deref(), Some("Order_Items"));
}

#[tokio::test]
async fn test_plan_with_override_keys() {
    let metadata = provider();
    let data = StaticPageProvider::new(vec![]);
    let engine = ExtractionEngine::new(&metadata, &data, StateManager::in_memory());
    let job = job().with_policy(PrimaryKeyPolicy::declared().with_override("Order", fields(&["Number"])));

    let plan = engine.plan(&job).await.unwrap();

    assert_eq!(plan.table("Order").unwrap().primary_keys, fields(&["Number"]));
    assert_eq!(
        plan.table("Order_Items").unwrap().foreign_keys,
        fields(&["Order_Number"])
    );
}

#[tokio::test]
async fn test_plan_unknown_root_class() {
    let metadata = provider();
    let data = StaticPageProvider::new(vec![]);
    let engine = ExtractionEngine::new(&metadata, &data, StateManager::in_memory());

    let err = engine.plan(&ExtractionJob::new("Ghost")).await.unwrap_err();
    assert!(matches!(err, Error::MetadataUnavailable { .. }));
}

#[tokio::test]
async fn test_run_multi_page() {
    let metadata = provider();
    let data = StaticPageProvider::new(vec![
        vec![order(1, &[1, 2])],
        vec![order(2, &[1])],
    ]);
    let state = StateManager::in_memory();
    let engine = ExtractionEngine::new(&metadata, &data, state.clone());
    let mut sink = MemorySink::new();

    let stats = engine.run(&job(), &mut sink).await.unwrap();

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.records, 2);
    assert_eq!(stats.rows_per_table["Order"], 2);
    assert_eq!(stats.rows_per_table["Order_Items"], 3);
    assert_eq!(stats.rows_per_table["OrderLine_Taxes"], 3);
    assert_eq!(stats.total_rows(), 8);
    assert_eq!(stats.missing_parent_keys, 0);

    assert_eq!(
        sink.rectangular("Order_Items").unwrap(),
        vec![
            vec![json!(1), json!(1)],
            vec![json!(2), json!(1)],
            vec![json!(1), json!(2)],
        ]
    );
    assert_eq!(
        sink.manifest("Order_Items").unwrap().columns,
        fields(&["LineNo", "Order_Id"])
    );

    let saved = state.snapshot().await;
    assert!(saved.last_run_at().is_some());
    assert_eq!(saved.previous_columns("Order"), fields(&["Id", "Total"]));
    assert_eq!(
        saved.previous_columns("OrderLine_Taxes"),
        fields(&["Code", "OrderLine_LineNo"])
    );
}

#[tokio::test]
async fn test_run_seeds_columns_from_state() {
    let metadata = provider();
    let data = StaticPageProvider::new(vec![vec![DataObject::new("Order")
        .scalar("Id", 7)
        .scalar("Discount", "1")]]);
    let mut previous = RunState::new();
    previous.set_columns("Order", fields(&["Id", "Total"]));
    previous.set_columns("Order_Legacy", fields(&["X"]));
    let state = StateManager::with_state(previous);
    let engine = ExtractionEngine::new(&metadata, &data, state.clone());
    let mut sink = MemorySink::new();

    engine
        .run(&ExtractionJob::new("Order"), &mut sink)
        .await
        .unwrap();

    let manifest = sink.manifest("Order").unwrap();
    assert_eq!(manifest.columns, fields(&["Id", "Total", "Discount"]));
    assert_eq!(
        sink.rectangular("Order").unwrap(),
        vec![vec![json!(7), Value::Null, json!("1")]]
    );

    let saved = state.snapshot().await;
    assert_eq!(saved.previous_columns("Order"), fields(&["Id", "Total", "Discount"]));
    assert_eq!(saved.previous_columns("Order_Legacy"), fields(&["X"]));
}

#[tokio::test]
async fn test_run_reports_unmatched_collections() {
    let metadata = provider();
    let record = order(1, &[1]).collection(
        "Payments",
        vec![DataObject::new("Payment").scalar("PaymentId", 9)],
    );
    let data = StaticPageProvider::new(vec![vec![record]]);
    let engine = ExtractionEngine::new(&metadata, &data, StateManager::in_memory());
    let mut sink = MemorySink::new();

    // Only Items is requested; Taxes and Payments have no relation
    let job = ExtractionJob::new("Order").with_fields(fields(&["Id", "Items"]));
    let stats = engine.run(&job, &mut sink).await.unwrap();

    assert_eq!(
        stats.unmatched_collections.iter().cloned().collect::<Vec<_>>(),
        fields(&["Payments", "Taxes"])
    );
    assert!(!sink.table_names().contains(&"Order_Payments"));
}

#[tokio::test]
async fn test_run_counts_missing_parent_keys() {
    let metadata = provider();
    let record = DataObject::new("Order").collection(
        "Items",
        vec![
            DataObject::new("OrderLine").scalar("LineNo", 1),
            DataObject::new("OrderLine").scalar("LineNo", 2),
        ],
    );
    let data = StaticPageProvider::new(vec![vec![record]]);
    let engine = ExtractionEngine::new(&metadata, &data, StateManager::in_memory());
    let mut sink = MemorySink::new();

    let job = ExtractionJob::new("Order").with_fields(fields(&["Items"]));
    let stats = engine.run(&job, &mut sink).await.unwrap();

    assert_eq!(stats.missing_parent_keys, 2);
    assert_eq!(
        sink.rectangular("Order_Items").unwrap(),
        vec![vec![json!(1), Value::Null], vec![json!(2), Value::Null]]
    );
}

#[tokio::test]
async fn test_run_failure_finalizes_nothing() {
    let metadata = provider();
    let data = StaticPageProvider::new(vec![vec![order(1, &[1])], vec![order(2, &[1])]])
        .failing_at(1, "connection reset");
    let mut previous = RunState::new();
    previous.last_run = Some("2024-01-01 00:00:00".to_string());
    let state = StateManager::with_state(previous.clone());
    let engine = ExtractionEngine::new(&metadata, &data, state.clone());
    let mut sink = MemorySink::new();

    let err = engine.run(&job(), &mut sink).await.unwrap_err();

    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert!(sink.manifests().next().is_none());
    assert_eq!(state.snapshot().await, previous);
}

#[tokio::test]
async fn test_run_empty_result_still_finalizes_tables() {
    let metadata = provider();
    let data = StaticPageProvider::new(vec![]);
    let engine = ExtractionEngine::new(&metadata, &data, StateManager::in_memory())
        .with_config(EngineConfig::new().with_progress_interval(1));
    let mut sink = MemorySink::new();

    let stats = engine.run(&job(), &mut sink).await.unwrap();

    assert_eq!(stats.pages, 1);
    assert_eq!(stats.records, 0);
    assert!(sink.is_finalized("Order"));
    assert!(sink.is_finalized("Order_Items"));
    assert!(sink.manifest("Order").unwrap().columns.is_empty());
}

#[tokio::test]
async fn test_run_marks_incremental_tables() {
    let metadata = provider();
    let data = StaticPageProvider::new(vec![vec![order(1, &[])]]);
    let engine = ExtractionEngine::new(&metadata, &data, StateManager::in_memory());
    let mut sink = MemorySink::new();

    engine
        .run(&job().with_incremental(true), &mut sink)
        .await
        .unwrap();

    assert!(sink.manifests().all(|m| m.incremental));
}
