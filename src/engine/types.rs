//! Engine types
//!
//! Job description, resolved plan, and run statistics.

use crate::flatten::RelationMap;
use crate::metadata::{ChildRelation, EntityMetadata, PrimaryKeyPolicy};
use crate::pagination::DataQuery;
use crate::state::RunState;
use crate::table::{TableHandler, TableRouter};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One extraction: which object to fetch and how to key it
#[derive(Debug, Clone, Default)]
pub struct ExtractionJob {
    /// Root object class
    pub class_name: String,
    /// Requested fields, dotted paths allowed
    pub fields: Vec<String>,
    /// Condition string passed to the data API
    pub conditions: Option<String>,
    /// Records per page
    pub page_size: Option<u32>,
    /// Whether output tables load incrementally
    pub incremental: bool,
    /// Primary key policy
    pub policy: PrimaryKeyPolicy,
}

impl ExtractionJob {
    /// Job fetching every record of a class
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    /// Set requested fields
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Set the condition string
    #[must_use]
    pub fn with_conditions(mut self, conditions: Option<String>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Mark output tables as incrementally loaded
    #[must_use]
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Set the primary key policy
    #[must_use]
    pub fn with_policy(mut self, policy: PrimaryKeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Data API query for this job
    pub fn query(&self) -> DataQuery {
        DataQuery::new(&self.class_name)
            .with_fields(self.fields.clone())
            .with_conditions(self.conditions.clone())
            .with_page_size(self.page_size)
    }
}

/// One destination table of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePlan {
    /// Table name
    pub table_name: String,
    /// Class whose records land in the table
    pub class_name: String,
    /// Primary key columns
    pub primary_keys: Vec<String>,
    /// Foreign key columns pointing at the parent table
    pub foreign_keys: Vec<String>,
    /// Parent table, for child tables
    pub parent_table: Option<String>,
    /// Table description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Column descriptions
    #[serde(skip)]
    pub column_descriptions: BTreeMap<String, String>,
}

/// Routing table resolved before data flows
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    /// Root class
    pub root_class: String,
    /// Resolved child relations
    pub relations: Vec<ChildRelation>,
    /// Destination tables, root first
    pub tables: Vec<TablePlan>,
}

impl ExtractionPlan {
    /// Build the plan from resolved metadata
    pub fn new(
        root: &EntityMetadata,
        root_primary_keys: Vec<String>,
        relations: Vec<ChildRelation>,
        child_metadata: &HashMap<String, EntityMetadata>,
    ) -> Self {
        let mut tables = vec![TablePlan {
            table_name: root.class_name.clone(),
            class_name: root.class_name.clone(),
            primary_keys: root_primary_keys,
            foreign_keys: Vec::new(),
            parent_table: None,
            description: root.caption.clone(),
            column_descriptions: root.column_descriptions(),
        }];

        for relation in &relations {
            let child = child_metadata.get(&relation.child_class_name);
            let parent_table = if relation.parent_class_name == root.class_name {
                root.class_name.clone()
            } else {
                relations
                    .iter()
                    .find(|r| r.child_class_name == relation.parent_class_name)
                    .map_or_else(|| relation.parent_class_name.clone(), ChildRelation::table_name)
            };

            tables.push(TablePlan {
                table_name: relation.table_name(),
                class_name: relation.child_class_name.clone(),
                primary_keys: relation.table_primary_keys(),
                foreign_keys: relation.foreign_key_columns(),
                parent_table: Some(parent_table),
                description: child.and_then(|m| m.caption.clone()),
                column_descriptions: child.map(EntityMetadata::column_descriptions).unwrap_or_default(),
            });
        }

        Self {
            root_class: root.class_name.clone(),
            relations,
            tables,
        }
    }

    /// Relation lookup for the flattener
    pub fn relation_map(&self) -> RelationMap {
        RelationMap::new(self.relations.iter().cloned())
    }

    /// Table plan by name
    pub fn table(&self, table_name: &str) -> Option<&TablePlan> {
        self.tables.iter().find(|t| t.table_name == table_name)
    }

    /// One handler per table, seeded from the previous run's columns
    pub fn build_router(&self, state: &RunState, incremental: bool) -> TableRouter {
        let mut router = TableRouter::new();
        for table in &self.tables {
            router.insert(
                TableHandler::new(
                    table.table_name.clone(),
                    table.primary_keys.clone(),
                    state.previous_columns(&table.table_name),
                )
                .with_incremental(incremental)
                .with_descriptions(table.description.clone(), table.column_descriptions.clone()),
            );
        }
        router
    }
}

/// Configuration for the engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Log progress every this many pages
    pub progress_interval: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100,
        }
    }
}

impl EngineConfig {
    /// Create a new engine config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress logging interval; zero disables it
    #[must_use]
    pub fn with_progress_interval(mut self, pages: usize) -> Self {
        self.progress_interval = pages;
        self
    }
}

/// Statistics from one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Pages fetched
    pub pages: usize,
    /// Root records processed
    pub records: usize,
    /// Rows appended per table, in table creation order
    pub rows_per_table: IndexMap<String, usize>,
    /// Foreign key values left empty because the parent key was absent
    pub missing_parent_keys: usize,
    /// Child collections skipped for lack of a relation
    pub unmatched_collections: BTreeSet<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a page and its records
    pub fn add_page(&mut self, records: usize) {
        self.pages += 1;
        self.records += records;
    }

    /// Total rows across all tables
    pub fn total_rows(&self) -> usize {
        self.rows_per_table.values().sum()
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
