//! Pagination module
//!
//! The data API returns one object's records in pages linked by an opaque
//! continuation token. A `PageProvider` fetches one page at a time; `pages`
//! turns a provider into a lazy stream that follows the tokens until the
//! API reports no further page.

mod stream;
mod types;

pub use stream::{pages, StaticPageProvider};
pub use types::{DataQuery, PageProvider, PaginationState};
