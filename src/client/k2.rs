//! K2 client implementation

use super::auth::RequestSigner;
use crate::decode::{K2JsonDecoder, Page, PageDecoder};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RequestConfig};
use crate::metadata::{EntityMetadata, MetadataProvider};
use crate::pagination::{DataQuery, PageProvider};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Connection settings for the K2 API
#[derive(Debug, Clone)]
pub struct K2ClientConfig {
    /// Base URL of the API, e.g. `https://erp.example.com/K2API`
    pub source_url: String,
    /// Service name, the first path segment after the base URL
    pub service_name: String,
    /// User name
    pub username: String,
    /// Password
    pub password: String,
    /// Request timeout
    pub timeout: Duration,
    /// Retries for transient failures
    pub max_retries: u32,
    /// Client-side request rate; `None` disables limiting
    pub requests_per_second: Option<u32>,
}

impl K2ClientConfig {
    /// Settings with default HTTP tuning
    pub fn new(
        source_url: impl Into<String>,
        service_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            service_name: service_name.into(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            requests_per_second: None,
        }
    }
}

/// Client for the K2 REST API
#[derive(Debug)]
pub struct K2Client {
    http: HttpClient,
    service_name: String,
    signer: RequestSigner,
    decoder: K2JsonDecoder,
}

impl K2Client {
    /// Create a client
    pub fn new(config: &K2ClientConfig) -> Result<Self> {
        let mut builder = HttpClientConfig::builder()
            .base_url(config.source_url.clone())
            .timeout(config.timeout)
            .max_retries(config.max_retries)
            .header("Accept", "application/json");

        builder = match config.requests_per_second {
            Some(rps) => builder.rate_limit(RateLimiterConfig::per_second(rps)),
            None => builder.no_rate_limit(),
        };

        Ok(Self {
            http: HttpClient::with_config(builder.build())?,
            service_name: config.service_name.trim_matches('/').to_string(),
            signer: RequestSigner::new(config.username.as_str(), config.password.as_str()),
            decoder: K2JsonDecoder::new(),
        })
    }

    /// Path of a class description
    pub fn meta_path(&self, class_name: &str) -> String {
        format!("{}/Meta/{class_name}", self.service_name)
    }

    /// Path of a class's data
    pub fn data_path(&self, class_name: &str) -> String {
        format!("{}/Data/{class_name}", self.service_name)
    }

    /// Full data URL for the first page of `query`
    pub fn data_url(&self, query: &DataQuery) -> Result<Url> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if !query.fields.is_empty() {
            params.push(("fields", query.fields_param()));
        }
        if let Some(conditions) = &query.conditions {
            params.push(("conditions", conditions.clone()));
        }
        if let Some(page_size) = query.page_size {
            params.push(("pageSize", page_size.to_string()));
        }

        let mut url = self.http.build_url(&self.data_path(&query.class_name))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(&params);
        }
        Ok(url)
    }

    /// Request config carrying the signature of `url`
    fn signed(&self, url: &Url) -> Result<RequestConfig> {
        Ok(RequestConfig::new().header("Authorization", self.signer.sign(url.as_str())?))
    }

    async fn get_signed_text(&self, url: &Url) -> Result<String> {
        let request = self.signed(url)?;
        self.http
            .get_text_with_config(url.as_str(), request)
            .await
            .map_err(classify_transport_error)
    }
}

#[async_trait]
impl MetadataProvider for K2Client {
    async fn get_metadata(&self, class_name: &str) -> Result<EntityMetadata> {
        debug!(class = %class_name, "Fetching metadata");
        let fetch = async {
            let url = self.http.build_url(&self.meta_path(class_name))?;
            let request = self.signed(&url)?;
            self.http
                .get_json_with_config::<EntityMetadata>(url.as_str(), request)
                .await
        };
        fetch
            .await
            .map_err(|e| Error::metadata(class_name, classify_transport_error(e).to_string()))
    }
}

#[async_trait]
impl PageProvider for K2Client {
    async fn fetch_page(&self, query: &DataQuery, token: Option<&str>) -> Result<Page> {
        // The continuation token is the next-page URL, followed as given
        let url = match token {
            Some(next_url) => self.http.build_url(next_url)?,
            None => self.data_url(query)?,
        };
        let body = self.get_signed_text(&url).await?;
        self.decoder.decode(&body)
    }
}

/// Map a low-level HTTP failure onto a transport error kind.
///
/// 401/403 become `AuthorizationFailed`, other 4xx `MalformedQuery`,
/// connect failures and timeouts `ConnectionFailed`, and any other HTTP
/// failure `UnknownServerError`. Non-HTTP errors pass through.
pub fn classify_transport_error(err: Error) -> Error {
    match err {
        Error::HttpStatus { status, body } if status == 401 || status == 403 => {
            Error::AuthorizationFailed {
                message: format!("HTTP {status}: {body}"),
            }
        }
        Error::HttpStatus { status, body } if (400..500).contains(&status) && status != 429 => {
            Error::MalformedQuery {
                message: format!("HTTP {status}: {body}"),
            }
        }
        Error::Timeout { .. } => Error::ConnectionFailed {
            message: err.to_string(),
        },
        Error::Http(e) if e.is_connect() || e.is_timeout() => Error::ConnectionFailed {
            message: e.to_string(),
        },
        Error::Http(e) if e.is_decode() => Error::decode(e.to_string()),
        Error::HttpStatus { .. }
        | Error::Http(_)
        | Error::RateLimited { .. }
        | Error::MaxRetriesExceeded { .. } => Error::UnknownServerError {
            message: err.to_string(),
        },
        other => other,
    }
}
