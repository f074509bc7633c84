//! Lazy page stream and a scripted provider

use super::types::{DataQuery, PageProvider, PaginationState};
use crate::decode::{DataObject, Page};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, Stream};
use std::sync::Mutex;
use tracing::debug;

/// Stream the pages of `query`, fetching each one only when polled.
///
/// Stops after the first page without a continuation token and fails if the
/// API hands back the token it was just given.
pub fn pages<'a>(
    provider: &'a dyn PageProvider,
    query: &'a DataQuery,
) -> impl Stream<Item = Result<Page>> + 'a {
    stream::try_unfold(PaginationState::new(), move |mut state| async move {
        if state.done {
            return Ok(None);
        }

        let requested = state.next_token.take();
        let page = provider.fetch_page(query, requested.as_deref()).await?;

        if page.next_token.is_some() && page.next_token == requested {
            return Err(Error::decode(format!(
                "Pagination for '{}' did not advance past token {:?}",
                query.class_name, requested
            )));
        }

        state.advance(&page);
        debug!(
            class = %query.class_name,
            page = state.pages_fetched,
            records = page.items.len(),
            "Fetched page"
        );
        Ok::<_, Error>(Some((page, state)))
    })
}

/// Provider serving pre-built pages, for tests and dry runs
///
/// Tokens are `page-<n>`. A failure can be scripted for a given page index.
#[derive(Debug, Default)]
pub struct StaticPageProvider {
    pages: Vec<Vec<DataObject>>,
    fail_at: Option<(usize, String)>,
    requests: Mutex<Vec<Option<String>>>,
}

impl StaticPageProvider {
    /// Create a provider serving `pages` in order
    pub fn new(pages: Vec<Vec<DataObject>>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Fail with a connection error when page `index` is requested
    #[must_use]
    pub fn failing_at(mut self, index: usize, message: impl Into<String>) -> Self {
        self.fail_at = Some((index, message.into()));
        self
    }

    /// Tokens requested so far, in order
    pub fn requested_tokens(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn page_index(token: Option<&str>) -> Result<usize> {
        match token {
            None => Ok(0),
            Some(t) => t
                .strip_prefix("page-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| Error::decode(format!("Unknown page token: {t}"))),
        }
    }
}

#[async_trait]
impl PageProvider for StaticPageProvider {
    async fn fetch_page(&self, _query: &DataQuery, token: Option<&str>) -> Result<Page> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(token.map(ToString::to_string));
        }

        let index = Self::page_index(token)?;
        if let Some((fail_index, message)) = &self.fail_at {
            if *fail_index == index {
                return Err(Error::ConnectionFailed {
                    message: message.clone(),
                });
            }
        }

        let items = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| format!("page-{}", index + 1));
        Ok(Page::new(items, next_token))
    }
}
