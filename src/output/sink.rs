//! Row sinks

use super::schema::rows_to_batch;
use super::types::{RowSink, TableManifest};
use super::writer::{write_batch_to_parquet, ParquetWriterConfig};
use crate::error::{Error, Result, ResultExt};
use crate::table::project_row;
use crate::types::{FlatRow, JsonValue};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Writes `<table>.parquet` and `<table>.manifest.json` per finalized table
///
/// Rows are buffered until the table is finalized, because the final column
/// list is only known then.
#[derive(Debug)]
pub struct ParquetSink {
    output_dir: PathBuf,
    config: ParquetWriterConfig,
    buffers: HashMap<String, Vec<FlatRow>>,
    written: Vec<PathBuf>,
}

impl ParquetSink {
    /// Create a sink writing into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            config: ParquetWriterConfig::default(),
            buffers: HashMap::new(),
            written: Vec::new(),
        }
    }

    /// Use a specific writer configuration
    #[must_use]
    pub fn with_config(mut self, config: ParquetWriterConfig) -> Self {
        self.config = config;
        self
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Files published so far
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    /// Path of the Parquet file for a table
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}.parquet"))
    }

    /// Path of the manifest for a table
    pub fn manifest_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}.manifest.json"))
    }

    fn write_manifest(&self, manifest: &TableManifest) -> Result<PathBuf> {
        let path = self.manifest_path(&manifest.table_name);
        let temp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(manifest)?;
        std::fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write manifest {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to publish manifest {}", path.display()))?;
        Ok(path)
    }
}

impl RowSink for ParquetSink {
    fn write(&mut self, table: &str, rows: Vec<FlatRow>) -> Result<()> {
        debug!(table = %table, rows = rows.len(), "Buffering rows");
        self.buffers.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    fn finalize(&mut self, manifest: &TableManifest) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| Error::Output {
            message: format!(
                "Failed to create output directory {}: {e}",
                self.output_dir.display()
            ),
        })?;

        let rows = self
            .buffers
            .remove(&manifest.table_name)
            .unwrap_or_default();

        // A Parquet file needs at least one column
        if !manifest.columns.is_empty() {
            let batch = rows_to_batch(&rows, &manifest.columns)?;
            let path = self.table_path(&manifest.table_name);
            write_batch_to_parquet(&path, &batch, Some(&self.config))?;
            info!(table = %manifest.table_name, rows = rows.len(), path = %path.display(), "Wrote Parquet file");
            self.written.push(path);
        }

        let manifest_path = self.write_manifest(manifest)?;
        self.written.push(manifest_path);
        Ok(())
    }
}

/// Keeps rows and manifests in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    tables: IndexMap<String, Vec<FlatRow>>,
    manifests: IndexMap<String, TableManifest>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows received for a table
    pub fn rows(&self, table: &str) -> &[FlatRow] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Manifest of a finalized table
    pub fn manifest(&self, table: &str) -> Option<&TableManifest> {
        self.manifests.get(table)
    }

    /// All manifests, in finalization order
    pub fn manifests(&self) -> impl Iterator<Item = &TableManifest> {
        self.manifests.values()
    }

    /// Tables that received rows or were finalized
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        for name in self.manifests.keys() {
            if !self.tables.contains_key(name) {
                names.push(name);
            }
        }
        names
    }

    /// Whether a table was finalized
    pub fn is_finalized(&self, table: &str) -> bool {
        self.manifests.contains_key(table)
    }

    /// Rows of a finalized table projected onto its final columns
    pub fn rectangular(&self, table: &str) -> Option<Vec<Vec<JsonValue>>> {
        let manifest = self.manifests.get(table)?;
        Some(
            self.rows(table)
                .iter()
                .map(|row| project_row(row, &manifest.columns))
                .collect(),
        )
    }
}

impl RowSink for MemorySink {
    fn write(&mut self, table: &str, rows: Vec<FlatRow>) -> Result<()> {
        self.tables.entry(table.to_string()).or_default().extend(rows);
        Ok(())
    }

    fn finalize(&mut self, manifest: &TableManifest) -> Result<()> {
        self.manifests
            .insert(manifest.table_name.clone(), manifest.clone());
        Ok(())
    }
}
