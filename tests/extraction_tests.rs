//! End-to-end extraction tests
//!
//! Static metadata and pages → engine → Parquet files, manifests and state

use arrow::array::{Array, StringArray};
use k2_extractor::decode::DataObject;
use k2_extractor::engine::{ExtractionEngine, ExtractionJob};
use k2_extractor::metadata::{EntityMetadata, StaticMetadataProvider};
use k2_extractor::output::{ParquetSink, TableManifest};
use k2_extractor::pagination::StaticPageProvider;
use k2_extractor::state::StateManager;
use k2_extractor::Error;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use std::fs::File;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

fn metadata() -> StaticMetadataProvider {
    [
        EntityMetadata::new("Invoice")
            .with_caption("Invoices")
            .with_primary_keys(["Id"])
            .with_fields(["Id", "Number", "Discount"])
            .with_child("Lines", "InvoiceLine")
            .with_child("Payments", "Payment"),
        EntityMetadata::new("InvoiceLine").with_primary_keys(["LineId"]),
        EntityMetadata::new("Payment").with_primary_keys(["PaymentId"]),
        EntityMetadata::new("Customer").with_primary_keys(["Id"]),
        EntityMetadata::new("Order")
            .with_primary_keys(["Id"])
            .with_child("Items", "OrderLine"),
        EntityMetadata::new("OrderLine")
            .with_primary_keys(["LineNo"])
            .with_child("Taxes", "Tax"),
        EntityMetadata::new("Tax").with_primary_keys(["Code"]),
    ]
    .into_iter()
    .collect()
}

fn fields(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

fn invoice(id: i64, number: &str, lines: &[i64]) -> DataObject {
    DataObject::new("Invoice")
        .scalar("Id", id)
        .scalar("Number", number)
        .collection(
            "Lines",
            lines
                .iter()
                .map(|l| DataObject::new("InvoiceLine").scalar("LineId", *l))
                .collect(),
        )
}

/// Read a Parquet table back as (columns, rows of optional text)
fn read_table(dir: &Path, table: &str) -> (Vec<String>, Vec<Vec<Option<String>>>) {
    let file = File::open(dir.join(format!("{table}.parquet"))).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();

    let mut columns = Vec::new();
    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.unwrap();
        columns = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        for i in 0..batch.num_rows() {
            let row = (0..batch.num_columns())
                .map(|c| {
                    let array = batch
                        .column(c)
                        .as_any()
                        .downcast_ref::<StringArray>()
                        .unwrap();
                    (!array.is_null(i)).then(|| array.value(i).to_string())
                })
                .collect();
            rows.push(row);
        }
    }
    (columns, rows)
}

fn read_manifest(dir: &Path, table: &str) -> TableManifest {
    let content = std::fs::read_to_string(dir.join(format!("{table}.manifest.json"))).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn text(value: &str) -> Option<String> {
    Some(value.to_string())
}

async fn run(
    pages: Vec<Vec<DataObject>>,
    job: &ExtractionJob,
    output: &Path,
    state: StateManager,
) -> k2_extractor::Result<k2_extractor::engine::RunStats> {
    let metadata = metadata();
    let data = StaticPageProvider::new(pages);
    let engine = ExtractionEngine::new(&metadata, &data, state);
    let mut sink = ParquetSink::new(output);
    engine.run(job, &mut sink).await
}

// ============================================================================
// Flattening Scenarios
// ============================================================================

#[tokio::test]
async fn test_child_collection_becomes_linked_table() {
    let out = TempDir::new().unwrap();
    let job = ExtractionJob::new("Invoice").with_fields(fields(&["Number", "Lines"]));

    let stats = run(
        vec![vec![invoice(1, "INV-1", &[10, 11])]],
        &job,
        out.path(),
        StateManager::in_memory(),
    )
    .await
    .unwrap();

    assert_eq!(stats.rows_per_table["Invoice"], 1);
    assert_eq!(stats.rows_per_table["Invoice_Lines"], 2);

    let (columns, rows) = read_table(out.path(), "Invoice");
    assert_eq!(columns, fields(&["Id", "Number"]));
    assert_eq!(rows, vec![vec![text("1"), text("INV-1")]]);

    let (columns, rows) = read_table(out.path(), "Invoice_Lines");
    assert_eq!(columns, fields(&["LineId", "Invoice_Id"]));
    assert_eq!(
        rows,
        vec![vec![text("10"), text("1")], vec![text("11"), text("1")]]
    );

    let manifest = read_manifest(out.path(), "Invoice_Lines");
    assert_eq!(manifest.primary_keys, fields(&["LineId", "Invoice_Id"]));
    assert!(!manifest.incremental);
    assert_eq!(
        read_manifest(out.path(), "Invoice").description.as_deref(),
        Some("Invoices")
    );
}

#[tokio::test]
async fn test_embedded_object_becomes_prefixed_columns() {
    let out = TempDir::new().unwrap();
    let customer = DataObject::new("Customer")
        .scalar("Id", 5)
        .object("Address", DataObject::new("Address").scalar("City", "Brno"));

    run(
        vec![vec![customer]],
        &ExtractionJob::new("Customer"),
        out.path(),
        StateManager::in_memory(),
    )
    .await
    .unwrap();

    let (columns, rows) = read_table(out.path(), "Customer");
    assert_eq!(columns, fields(&["Id", "Address_City"]));
    assert_eq!(rows, vec![vec![text("5"), text("Brno")]]);
    assert!(!out.path().join("Customer_Address.parquet").exists());
    assert!(!out.path().join("Address.parquet").exists());
}

#[tokio::test]
async fn test_dotted_path_links_each_level_to_its_parent() {
    let out = TempDir::new().unwrap();
    let order = DataObject::new("Order").scalar("Id", 1).collection(
        "Items",
        vec![DataObject::new("OrderLine").scalar("LineNo", 1).collection(
            "Taxes",
            vec![
                DataObject::new("Tax").scalar("Code", "VAT"),
                DataObject::new("Tax").scalar("Code", "ECO"),
            ],
        )],
    );

    run(
        vec![vec![order]],
        &ExtractionJob::new("Order").with_fields(fields(&["Order.Items.Taxes"])),
        out.path(),
        StateManager::in_memory(),
    )
    .await
    .unwrap();

    let (columns, rows) = read_table(out.path(), "Order_Items");
    assert_eq!(columns, fields(&["LineNo", "Order_Id"]));
    assert_eq!(rows, vec![vec![text("1"), text("1")]]);

    let (columns, rows) = read_table(out.path(), "OrderLine_Taxes");
    assert_eq!(columns, fields(&["Code", "OrderLine_LineNo"]));
    assert_eq!(
        rows,
        vec![vec![text("VAT"), text("1")], vec![text("ECO"), text("1")]]
    );
}

#[tokio::test]
async fn test_unrequested_child_collection_is_skipped() {
    let out = TempDir::new().unwrap();
    let record = invoice(1, "INV-1", &[10]).collection(
        "Payments",
        vec![DataObject::new("Payment").scalar("PaymentId", 3)],
    );

    let stats = run(
        vec![vec![record]],
        &ExtractionJob::new("Invoice").with_fields(fields(&["Number", "Lines"])),
        out.path(),
        StateManager::in_memory(),
    )
    .await
    .unwrap();

    assert!(stats.unmatched_collections.contains("Payments"));
    assert!(!out.path().join("Invoice_Payments.parquet").exists());
    assert!(!out.path().join("Invoice_Payments.manifest.json").exists());

    let (columns, _) = read_table(out.path(), "Invoice");
    assert_eq!(columns, fields(&["Id", "Number"]));
}

// ============================================================================
// Schema Evolution Across Runs
// ============================================================================

#[tokio::test]
async fn test_second_run_appends_new_column() {
    let out = TempDir::new().unwrap();
    let state_path = out.path().join("state").join("state.json");
    let job = ExtractionJob::new("Invoice").with_fields(fields(&["Number"]));

    run(
        vec![vec![invoice(1, "INV-1", &[])]],
        &job,
        &out.path().join("run1"),
        StateManager::from_file(&state_path).unwrap(),
    )
    .await
    .unwrap();

    let second_page = vec![
        DataObject::new("Invoice").scalar("Id", 2),
        DataObject::new("Invoice").scalar("Id", 3).scalar("Discount", 5),
    ];
    run(
        vec![second_page],
        &job,
        &out.path().join("run2"),
        StateManager::from_file(&state_path).unwrap(),
    )
    .await
    .unwrap();

    let (columns, rows) = read_table(&out.path().join("run2"), "Invoice");
    assert_eq!(columns, fields(&["Id", "Number", "Discount"]));
    assert_eq!(
        rows,
        vec![
            vec![text("2"), None, None],
            vec![text("3"), None, text("5")],
        ]
    );

    let saved = StateManager::from_file(&state_path).unwrap().snapshot().await;
    assert_eq!(
        saved.previous_columns("Invoice"),
        fields(&["Id", "Number", "Discount"])
    );
    assert!(saved.last_run_at().is_some());
}

#[tokio::test]
async fn test_columns_never_shrink_when_fields_disappear() {
    let out = TempDir::new().unwrap();
    let state_path = out.path().join("state.json");
    let job = ExtractionJob::new("Invoice");

    run(
        vec![vec![invoice(1, "INV-1", &[])]],
        &job,
        out.path(),
        StateManager::from_file(&state_path).unwrap(),
    )
    .await
    .unwrap();
    run(
        vec![vec![DataObject::new("Invoice").scalar("Id", 2)]],
        &job,
        out.path(),
        StateManager::from_file(&state_path).unwrap(),
    )
    .await
    .unwrap();

    let (columns, rows) = read_table(out.path(), "Invoice");
    assert_eq!(columns, fields(&["Id", "Number"]));
    assert_eq!(rows, vec![vec![text("2"), None]]);
}

// ============================================================================
// Failure Handling
// ============================================================================

#[tokio::test]
async fn test_transport_failure_publishes_nothing() {
    let out = TempDir::new().unwrap();
    let state_path = out.path().join("state.json");
    let metadata = metadata();
    let data = StaticPageProvider::new(vec![
        vec![invoice(1, "INV-1", &[10])],
        vec![invoice(2, "INV-2", &[20])],
    ])
    .failing_at(1, "connection reset by peer");
    let engine = ExtractionEngine::new(
        &metadata,
        &data,
        StateManager::from_file(&state_path).unwrap(),
    );
    let mut sink = ParquetSink::new(out.path().join("tables"));

    let err = engine
        .run(
            &ExtractionJob::new("Invoice").with_fields(fields(&["Lines"])),
            &mut sink,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(sink.written_files().is_empty());
    assert!(!out.path().join("tables").exists());
    assert!(!state_path.exists());
}

#[tokio::test]
async fn test_unknown_root_class_is_metadata_error() {
    let out = TempDir::new().unwrap();

    let err = run(
        vec![],
        &ExtractionJob::new("Ghost"),
        out.path(),
        StateManager::in_memory(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::MetadataUnavailable { ref class_name, .. } if class_name == "Ghost"));
}
