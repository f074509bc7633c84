//! Pagination types and traits

use crate::decode::Page;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// What to fetch from the data API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataQuery {
    /// Class of the root object
    pub class_name: String,
    /// Requested fields, dotted paths allowed
    pub fields: Vec<String>,
    /// Condition string in the API's `field;OP;value` syntax
    pub conditions: Option<String>,
    /// Records per page
    pub page_size: Option<u32>,
}

impl DataQuery {
    /// Query for every record of a class
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

    /// Set the condition string; blank strings clear it
    #[must_use]
    pub fn with_conditions(mut self, conditions: Option<String>) -> Self {
        self.conditions = conditions.filter(|c| !c.trim().is_empty());
        self
    }

    /// Set the page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fields joined the way the API expects them
    pub fn fields_param(&self) -> String {
        self.fields.join(",")
    }
}

/// Source of data pages
#[async_trait]
pub trait PageProvider: Send + Sync {
    /// Fetch the page following `token`, or the first page when `None`
    async fn fetch_page(&self, query: &DataQuery, token: Option<&str>) -> Result<Page>;
}

#[async_trait]
impl<P: PageProvider + ?Sized> PageProvider for Arc<P> {
    async fn fetch_page(&self, query: &DataQuery, token: Option<&str>) -> Result<Page> {
        (**self).fetch_page(query, token).await
    }
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Pages fetched so far
    pub pages_fetched: usize,
    /// Records fetched so far
    pub records_fetched: u64,
    /// Token for the next page
    pub next_token: Option<String>,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fetched page and its continuation
    pub fn advance(&mut self, page: &Page) {
        self.pages_fetched += 1;
        self.records_fetched += page.items.len() as u64;
        self.next_token.clone_from(&page.next_token);
        self.done = page.next_token.is_none();
    }
}
