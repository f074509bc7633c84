//! HTTP client module
//!
//! Provides the HTTP client used to talk to the K2 REST API.
//!
//! # Features
//!
//! - **Automatic Retries**: retries on 429/5xx, timeouts and connect errors
//! - **Rate Limiting**: token bucket rate limiter using governor
//! - **Backoff Strategies**: constant, linear, and exponential backoff
//! - **Default Headers**: headers sent with every request, merged per request

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
