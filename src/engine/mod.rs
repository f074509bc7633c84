//! Execution engine module
//!
//! Drives one extraction from metadata to persisted state.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ExtractionEngine` - resolves the routing table, streams pages through
//!   the flattener into table handlers, then finalizes tables and state
//! - `ExtractionJob` / `ExtractionPlan` - what to fetch and where rows go
//! - `RunStats` - counters returned to callers
//!
//! A run either completes (every table finalized, state saved) or aborts on
//! the first error with nothing finalized and the previous state untouched.

mod types;

pub use types::{EngineConfig, ExtractionJob, ExtractionPlan, RunStats, TablePlan};

use crate::error::Result;
use crate::flatten::{FlattenReport, Flattener};
use crate::metadata::{ChildRelationResolver, MetadataProvider};
use crate::output::RowSink;
use crate::pagination::{pages, PageProvider};
use crate::state::{RunState, StateManager};
use chrono::Local;
use futures::TryStreamExt;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Orchestrates extractions against a metadata and a page provider
pub struct ExtractionEngine<'a> {
    metadata: &'a dyn MetadataProvider,
    pages: &'a dyn PageProvider,
    state: StateManager,
    config: EngineConfig,
}

impl<'a> ExtractionEngine<'a> {
    /// Create a new engine
    pub fn new(
        metadata: &'a dyn MetadataProvider,
        pages: &'a dyn PageProvider,
        state: StateManager,
    ) -> Self {
        Self {
            metadata,
            pages,
            state,
            config: EngineConfig::default(),
        }
    }

    /// Set engine configuration
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Resolve metadata into the routing table for `job`
    pub async fn plan(&self, job: &ExtractionJob) -> Result<ExtractionPlan> {
        let mut resolver = ChildRelationResolver::new(self.metadata).with_policy(job.policy.clone());

        let root = resolver.metadata(&job.class_name).await?.clone();
        let root_primary_keys = resolver.primary_keys(&job.class_name).await?;
        info!(
            class = %job.class_name,
            primary_keys = ?root_primary_keys,
            "Resolved root object"
        );

        let relations = resolver.resolve(&job.class_name, &job.fields).await?;

        let mut child_metadata = HashMap::new();
        for relation in &relations {
            if !child_metadata.contains_key(&relation.child_class_name) {
                let metadata = resolver.metadata(&relation.child_class_name).await?.clone();
                child_metadata.insert(relation.child_class_name.clone(), metadata);
            }
            debug!(
                table = %relation.table_name(),
                path = %relation.path,
                foreign_keys = ?relation.foreign_key_columns(),
                "Child table"
            );
        }

        Ok(ExtractionPlan::new(
            &root,
            root_primary_keys,
            relations,
            &child_metadata,
        ))
    }

    /// Run one extraction, writing rows to `sink`.
    ///
    /// Tables are finalized and the new state saved only after the last
    /// page; any error before that returns with neither done.
    pub async fn run(&self, job: &ExtractionJob, sink: &mut dyn RowSink) -> Result<RunStats> {
        let start = Instant::now();
        let started_at = Local::now().naive_local();
        let mut stats = RunStats::new();

        let plan = self.plan(job).await?;
        let previous = self.state.snapshot().await;
        let mut router = plan.build_router(&previous, job.incremental);
        let relations = plan.relation_map();
        let flattener = Flattener::new(&relations, &plan.root_class);

        info!(
            class = %plan.root_class,
            tables = router.len(),
            "Starting extraction"
        );

        let query = job.query();
        let mut report = FlattenReport::default();
        let mut stream = Box::pin(pages(self.pages, &query));

        while let Some(page) = stream.try_next().await? {
            stats.add_page(page.items.len());

            let output = flattener.flatten_all(&page.items);
            report.merge(output.report);
            let routed = router.route(output.tables)?;
            router.flush(sink)?;

            debug!(
                page = stats.pages,
                records = page.items.len(),
                rows = routed,
                "Processed page"
            );
            if self.config.progress_interval > 0 && stats.pages % self.config.progress_interval == 0
            {
                info!(
                    pages = stats.pages,
                    records = stats.records,
                    "Extraction progress"
                );
            }
        }

        for table in router.table_names() {
            let rows = router.get(table).map_or(0, |h| h.rows_appended());
            stats.rows_per_table.insert(table.to_string(), rows);
        }

        let manifests = router.close_all(sink)?;

        let mut next = RunState::new();
        next.set_last_run(started_at);
        for manifest in manifests {
            next.set_columns(manifest.table_name, manifest.columns);
        }
        self.state.commit(previous.merged_with(next)).await?;

        for field in &report.unmatched_collections {
            warn!(
                field = %field,
                "Child collection has no resolved relation; request it in `fields` or check the metadata"
            );
        }
        if report.missing_parent_keys > 0 {
            warn!(
                count = report.missing_parent_keys,
                "Child rows written with empty foreign keys because the parent key was missing"
            );
        }

        stats.missing_parent_keys = report.missing_parent_keys;
        stats.unmatched_collections = report.unmatched_collections;
        #[allow(clippy::cast_possible_truncation)]
        stats.set_duration(start.elapsed().as_millis() as u64);

        info!(
            class = %plan.root_class,
            pages = stats.pages,
            records = stats.records,
            rows = stats.total_rows(),
            duration_ms = stats.duration_ms,
            "Extraction completed"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests;
