//! Parquet file writer
//!
//! Files are written under a temporary name and renamed into place on
//! close, so a reader never sees a half-written table.

use crate::error::{Error, Result};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Use ZSTD compression
    #[must_use]
    pub fn zstd(self) -> Self {
        self.with_compression(Compression::ZSTD(ZstdLevel::default()))
    }

    /// Get row group size
    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Parquet file writer publishing on close
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    rows_written: usize,
}

impl ParquetWriter {
    /// Create a writer for `path`
    pub fn new(
        path: impl AsRef<Path>,
        schema: &Schema,
        config: &ParquetWriterConfig,
    ) -> Result<Self> {
        let final_path = path.as_ref().to_path_buf();
        let temp_path = final_path.with_extension("parquet.tmp");

        let file = File::create(&temp_path).map_err(|e| Error::Output {
            message: format!("Failed to create file {}: {e}", temp_path.display()),
        })?;

        let writer = ArrowWriter::try_new(
            file,
            Arc::new(schema.clone()),
            Some(config.build_properties()),
        )
        .map_err(|e| Error::Output {
            message: format!("Failed to create Parquet writer: {e}"),
        })?;

        Ok(Self {
            writer,
            temp_path,
            final_path,
            rows_written: 0,
        })
    }

    /// Write a RecordBatch
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer.write(batch).map_err(|e| Error::Output {
            message: format!("Failed to write batch: {e}"),
        })?;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Rows written so far
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Finish the file and move it to its final name
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer.close().map_err(|e| Error::Output {
            message: format!("Failed to close Parquet writer: {e}"),
        })?;
        std::fs::rename(&self.temp_path, &self.final_path)?;
        Ok(rows)
    }
}

/// Write a single RecordBatch to a Parquet file
pub fn write_batch_to_parquet(
    path: impl AsRef<Path>,
    batch: &RecordBatch,
    config: Option<&ParquetWriterConfig>,
) -> Result<usize> {
    let default_config = ParquetWriterConfig::default();
    let config = config.unwrap_or(&default_config);

    let mut writer = ParquetWriter::new(path, batch.schema().as_ref(), config)?;
    writer.write(batch)?;
    writer.close()
}
