//! K2 REST client
//!
//! Implements both provider traits against the K2 REST API:
//! - `GET {source_url}/{service}/Meta/{class}` for class descriptions
//! - `GET {source_url}/{service}/Data/{class}` for paged records
//!
//! Each request is signed with the caller's credentials. Low-level HTTP
//! failures are mapped onto the transport error kinds the rest of the crate
//! reports.

mod auth;
mod k2;

pub use auth::{sign_request, RequestSigner};
pub use k2::{classify_transport_error, K2Client, K2ClientConfig};
