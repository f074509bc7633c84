//! Extractor configuration
//!
//! Loaded from a JSON or YAML file, optionally wrapped in a
//! `{"parameters": {...}}` envelope. Validation runs before any request is
//! made, so configuration mistakes never cost a round trip.

use crate::client::K2ClientConfig;
use crate::engine::ExtractionJob;
use crate::error::{Error, Result};
use crate::metadata::PrimaryKeyPolicy;
use crate::state::STATE_TIMESTAMP_FORMAT;
use crate::types::{LoadType, OptionStringExt};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration as StdDuration;

/// Lower bound used for `last run` when no run has completed yet
const EPOCH_FALLBACK: &str = "1990-01-01 00:00:00";

/// Relative dates such as `3 days ago`
static RELATIVE_DATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+)\s+(minute|hour|day|week|month|year)s?\s+ago$").unwrap()
});

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete extractor configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// K2 user name
    #[serde(default)]
    pub username: String,

    /// K2 password
    #[serde(rename = "#password", default)]
    pub password: String,

    /// Root object class
    #[serde(default)]
    pub data_object: String,

    /// Comma separated field list, dotted paths allowed
    #[serde(default)]
    pub fields: Option<String>,

    /// Condition string in the API's `field;OP;value` syntax
    #[serde(default)]
    pub conditions: Option<String>,

    /// Base URL of the K2 API
    #[serde(default)]
    pub source_url: String,

    /// K2 service name
    #[serde(default)]
    pub service_name: String,

    /// Load mode and incremental window
    #[serde(default)]
    pub loading_options: LoadingOptions,

    /// Primary keys of the root object, overriding metadata
    #[serde(default)]
    pub primary_keys: Option<Vec<String>>,

    /// Guess missing primary keys from field names
    #[serde(default)]
    pub infer_primary_key: bool,

    /// Records per page
    #[serde(default)]
    pub page_size: Option<u32>,

    /// HTTP tuning
    #[serde(default)]
    pub http: HttpSettings,
}

impl std::fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("data_object", &self.data_object)
            .field("fields", &self.fields)
            .field("conditions", &self.conditions)
            .field("source_url", &self.source_url)
            .field("service_name", &self.service_name)
            .field("loading_options", &self.loading_options)
            .field("primary_keys", &self.primary_keys)
            .field("infer_primary_key", &self.infer_primary_key)
            .field("page_size", &self.page_size)
            .field("http", &self.http)
            .finish()
    }
}

/// Load mode and incremental window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadingOptions {
    /// Full or incremental load
    #[serde(default)]
    pub load_type: LoadType,

    /// Date field filtered on in incremental mode
    #[serde(default)]
    pub incremental_field: Option<String>,

    /// Window start: a date, `last run`, `now`, or `N units ago`
    #[serde(default)]
    pub date_from: Option<String>,

    /// Window end, same syntax as `date_from`
    #[serde(default)]
    pub date_to: Option<String>,
}

/// HTTP tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request rate limit
    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            requests_per_second: None,
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

// ============================================================================
// Loading
// ============================================================================

impl ExtractorConfig {
    /// Load configuration from a JSON or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from JSON or YAML text
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let mut value: serde_yaml::Value = serde_yaml::from_str(content)?;
        if let Some(parameters) = value.get("parameters") {
            value = parameters.clone();
        }
        Ok(serde_yaml::from_value(value)?)
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check required values and the incremental window shape
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("username", &self.username),
            ("#password", &self.password),
            ("data_object", &self.data_object),
            ("source_url", &self.source_url),
            ("service_name", &self.service_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::missing_field(field));
            }
        }

        url::Url::parse(&self.source_url)
            .map_err(|e| Error::invalid_value("source_url", e.to_string()))?;

        if self.page_size == Some(0) {
            return Err(Error::invalid_value("page_size", "must be positive"));
        }

        if self.is_incremental() {
            let options = &self.loading_options;
            for (field, value) in [
                ("loading_options.incremental_field", &options.incremental_field),
                ("loading_options.date_from", &options.date_from),
                ("loading_options.date_to", &options.date_to),
            ] {
                if value.clone().none_if_empty().is_none() {
                    return Err(Error::invalid_value(
                        field,
                        "required for incremental load; set the incremental field, date from and date to",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Whether this is an incremental load
    pub fn is_incremental(&self) -> bool {
        self.loading_options.load_type.is_incremental()
    }

    // ========================================================================
    // Derived settings
    // ========================================================================

    /// Requested fields, spaces removed
    pub fn field_list(&self) -> Vec<String> {
        parse_field_list(self.fields.as_deref().unwrap_or_default())
    }

    /// Condition string with the incremental window folded in
    pub fn effective_conditions(
        &self,
        last_run: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Option<String>> {
        let user = self.conditions.clone().none_if_empty();
        if !self.is_incremental() {
            return Ok(user);
        }

        let options = &self.loading_options;
        let field = options
            .incremental_field
            .clone()
            .none_if_empty()
            .ok_or_else(|| Error::missing_field("loading_options.incremental_field"))?;

        let from = parse_window_bound("loading_options.date_from", options.date_from.as_deref(), last_run, now)?;
        let to = parse_window_bound("loading_options.date_to", options.date_to.as_deref(), last_run, now)?;
        if from > to {
            return Err(Error::invalid_value(
                "loading_options.date_from",
                format!(
                    "window start {} is after window end {}",
                    format_timestamp(from),
                    format_timestamp(to)
                ),
            ));
        }

        Ok(Some(fold_incremental_condition(
            user.as_deref(),
            field.trim(),
            &format_timestamp(from),
            &format_timestamp(to),
        )))
    }

    /// Primary key policy for this configuration
    pub fn primary_key_policy(&self) -> PrimaryKeyPolicy {
        let mut policy = PrimaryKeyPolicy::declared().with_name_heuristic(self.infer_primary_key);
        if let Some(keys) = &self.primary_keys {
            let keys: Vec<String> = keys
                .iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            if !keys.is_empty() {
                policy = policy.with_override(self.data_object.trim(), keys);
            }
        }
        policy
    }

    /// Extraction job for this configuration
    pub fn job(&self, last_run: Option<&str>, now: NaiveDateTime) -> Result<ExtractionJob> {
        Ok(ExtractionJob::new(self.data_object.trim())
            .with_fields(self.field_list())
            .with_conditions(self.effective_conditions(last_run, now)?)
            .with_page_size(self.page_size)
            .with_incremental(self.is_incremental())
            .with_policy(self.primary_key_policy()))
    }

    /// Client settings for this configuration
    pub fn client_config(&self) -> K2ClientConfig {
        let mut config = K2ClientConfig::new(
            self.source_url.trim(),
            self.service_name.trim(),
            self.username.as_str(),
            self.password.as_str(),
        );
        config.timeout = StdDuration::from_secs(self.http.timeout_secs);
        config.max_retries = self.http.max_retries;
        config.requests_per_second = self.http.requests_per_second;
        config
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Split a comma separated field list, removing all spaces
pub fn parse_field_list(fields: &str) -> Vec<String> {
    fields
        .replace(' ', "")
        .split(',')
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// Append the incremental window to a user condition
pub fn fold_incremental_condition(
    conditions: Option<&str>,
    field: &str,
    from: &str,
    to: &str,
) -> String {
    let window = format!("{field};GE;{from},{field};LE;{to}");
    match conditions.map(str::trim).filter(|c| !c.is_empty()) {
        Some(existing) => format!("{existing},{window}"),
        None => window,
    }
}

/// Render a timestamp the way the API and the state file expect
pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(STATE_TIMESTAMP_FORMAT).to_string()
}

/// Parse a window bound.
///
/// `last`/`last run` resolve to the previous run (or 1990-01-01 when there
/// is none) and `now`/`today` to `now`, both keeping the time of day.
/// Explicit and relative dates are truncated to midnight. Returns `None`
/// for blank input.
pub fn parse_date(
    input: &str,
    last_run: Option<&str>,
    now: NaiveDateTime,
) -> Result<Option<NaiveDateTime>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let lowered = input.to_lowercase();
    match lowered.as_str() {
        "last" | "last run" => {
            let raw = last_run.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(EPOCH_FALLBACK);
            return parse_absolute(raw)
                .map(Some)
                .ok_or_else(|| Error::invalid_value("last_run", format!("Cannot parse stored timestamp {raw}")));
        }
        "now" | "today" => return Ok(Some(now)),
        "yesterday" => return Ok(Some(midnight(now - Duration::days(1)))),
        _ => {}
    }

    if let Some(relative) = parse_relative(&lowered, now) {
        return Ok(Some(midnight(relative)));
    }

    parse_absolute(input)
        .map(|at| Some(midnight(at)))
        .ok_or_else(|| Error::config(format!("Cannot parse date input {input}")))
}

fn parse_window_bound(
    field: &str,
    input: Option<&str>,
    last_run: Option<&str>,
    now: NaiveDateTime,
) -> Result<NaiveDateTime> {
    parse_date(input.unwrap_or_default(), last_run, now)?
        .ok_or_else(|| Error::missing_field(field))
}

fn parse_relative(input: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let captures = RELATIVE_DATE_REGEX.captures(input)?;
    let amount: i64 = captures[1].parse().ok()?;
    let months = |n: i64| u32::try_from(n).ok().map(Months::new);

    match &captures[2] {
        "minute" => now.checked_sub_signed(Duration::try_minutes(amount)?),
        "hour" => now.checked_sub_signed(Duration::try_hours(amount)?),
        "day" => now.checked_sub_signed(Duration::try_days(amount)?),
        "week" => now.checked_sub_signed(Duration::try_weeks(amount)?),
        "month" => now.checked_sub_months(months(amount)?),
        "year" => now.checked_sub_months(months(amount.checked_mul(12)?)?),
        _ => None,
    }
}

fn parse_absolute(input: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Some(at.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(at) = NaiveDateTime::parse_from_str(input, format) {
            return Some(at);
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn midnight(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_hms_opt(0, 0, 0).unwrap_or(at)
}
