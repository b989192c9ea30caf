//! Configuration Module
//!
//! Process-wide defaults loaded from environment variables, the per-call
//! `FetchOptions` overrides, and the resolution step that merges the two.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::warn;

/// Cache written to when neither the call nor the defaults name one
pub const DEFAULT_CACHE_NAME: &str = "fetch-cache";

// == Cache Policy ==
/// Target cache and retention limits.
///
/// Limits that are zero or non-positive are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePolicy {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "max_entries")]
    pub max_entries: Option<usize>,
    #[serde(default, alias = "max_age_seconds")]
    pub max_age_seconds: Option<f64>,
}

impl CachePolicy {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_max_age_seconds(mut self, max_age_seconds: f64) -> Self {
        self.max_age_seconds = Some(max_age_seconds);
        self
    }

    /// Builds the eviction policy, if this policy asks for one.
    ///
    /// Requires a non-empty name and at least one positive limit. An age
    /// too large for a `Duration` never expires anything and counts as unset.
    pub fn expiration(&self) -> Option<ExpirationPolicy> {
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        let max_entries = self.max_entries.filter(|&n| n > 0);
        let max_age = self
            .max_age_seconds
            .filter(|s| s.is_finite() && *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok());

        if max_entries.is_none() && max_age.is_none() {
            return None;
        }

        Some(ExpirationPolicy {
            cache_name: name.to_string(),
            max_entries,
            max_age,
        })
    }
}

/// Validated limits for one named cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpirationPolicy {
    pub cache_name: String,
    pub max_entries: Option<usize>,
    pub max_age: Option<Duration>,
}

// == Success Responses ==
/// Status codes considered cacheable, as a set of inclusive ranges.
///
/// Parses from strings such as `"200-299"` or `"200-299,304"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessResponses {
    ranges: Vec<RangeInclusive<u16>>,
}

impl SuccessResponses {
    pub fn new(ranges: Vec<RangeInclusive<u16>>) -> Self {
        Self { ranges }
    }

    pub fn matches(&self, status: u16) -> bool {
        self.ranges.iter().any(|r| r.contains(&status))
    }
}

impl Default for SuccessResponses {
    fn default() -> Self {
        Self::new(vec![200..=299])
    }
}

impl FromStr for SuccessResponses {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let range = match part.split_once('-') {
                Some((lo, hi)) => parse_status(lo)?..=parse_status(hi)?,
                None => {
                    let code = parse_status(part)?;
                    code..=code
                }
            };
            if range.is_empty() {
                return Err(format!("Empty status range '{}'", part));
            }
            ranges.push(range);
        }

        if ranges.is_empty() {
            return Err("No status ranges given".to_string());
        }
        Ok(Self::new(ranges))
    }
}

fn parse_status(raw: &str) -> Result<u16, String> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|code| (100..=599).contains(code))
        .ok_or_else(|| format!("Invalid status code '{}'", raw.trim()))
}

impl fmt::Display for SuccessResponses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|r| format!("{}-{}", r.start(), r.end()))
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

impl<'de> Deserialize<'de> for SuccessResponses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// == Fetch Options ==
/// Per-call overrides. Any field left out falls back to `Config`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    #[serde(default)]
    pub cache: Option<CachePolicy>,
    #[serde(default, alias = "success_responses")]
    pub success_responses: Option<SuccessResponses>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub debug: Option<bool>,
}

/// Options after merging a call's overrides with the process defaults.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    /// Content cache the response is written to
    pub cache_name: String,
    /// Eviction limits; `None` means the metadata index is never touched
    pub expiration: Option<ExpirationPolicy>,
    pub success_responses: SuccessResponses,
    pub headers: Option<BTreeMap<String, String>>,
    pub debug: bool,
}

// == Config ==
/// Process-wide configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default cache policy applied when a call supplies none
    pub cache: CachePolicy,
    /// Default cacheable status ranges
    pub success_responses: SuccessResponses,
    /// Headers added to every outgoing request, if any
    pub headers: Option<BTreeMap<String, String>>,
    /// Enables the debug log hook
    pub debug: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Directory holding the durable timestamp indexes
    pub metadata_dir: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FETCH_CACHE_NAME` - Default cache name (default: fetch-cache)
    /// - `FETCH_CACHE_MAX_ENTRIES` - Default entry limit (default: unset)
    /// - `FETCH_CACHE_MAX_AGE_SECONDS` - Default age limit (default: unset)
    /// - `FETCH_SUCCESS_RESPONSES` - Cacheable statuses (default: 200-299)
    /// - `FETCH_CUSTOM_HEADERS` - JSON object of extra headers (default: unset)
    /// - `FETCH_DEBUG` - Enables debug logging (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `METADATA_DIR` - Timestamp index directory (default: ./data/metadata)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            cache: CachePolicy {
                name: Some(env::var("FETCH_CACHE_NAME").unwrap_or_else(|_| DEFAULT_CACHE_NAME.into())),
                max_entries: parse_env("FETCH_CACHE_MAX_ENTRIES"),
                max_age_seconds: parse_env("FETCH_CACHE_MAX_AGE_SECONDS"),
            },
            success_responses: parse_env("FETCH_SUCCESS_RESPONSES")
                .unwrap_or(defaults.success_responses),
            headers: env::var("FETCH_CUSTOM_HEADERS")
                .ok()
                .and_then(|raw| match serde_json::from_str(&raw) {
                    Ok(headers) => Some(headers),
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed FETCH_CUSTOM_HEADERS");
                        None
                    }
                }),
            debug: parse_env("FETCH_DEBUG").unwrap_or(defaults.debug),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            metadata_dir: env::var("METADATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.metadata_dir),
        }
    }

    // == Resolve ==
    /// Merges per-call options over these defaults.
    ///
    /// # Precedence
    /// - cache name: `options.cache.name`, then `self.cache.name`, then
    ///   [`DEFAULT_CACHE_NAME`]
    /// - expiration: taken from `options.cache` as a whole when present,
    ///   otherwise from `self.cache`; limits never mix between the two
    /// - success responses, headers: the option when set, else the default
    /// - debug: enabled if either side enables it
    pub fn resolve(&self, options: &FetchOptions) -> ResolvedOptions {
        let cache_name = options
            .cache
            .as_ref()
            .and_then(|c| c.name.clone())
            .filter(|n| !n.is_empty())
            .or_else(|| self.cache.name.clone().filter(|n| !n.is_empty()))
            .unwrap_or_else(|| DEFAULT_CACHE_NAME.to_string());

        let expiration = options.cache.as_ref().unwrap_or(&self.cache).expiration();

        ResolvedOptions {
            cache_name,
            expiration,
            success_responses: options
                .success_responses
                .clone()
                .unwrap_or_else(|| self.success_responses.clone()),
            headers: options.headers.clone().or_else(|| self.headers.clone()),
            debug: options.debug.unwrap_or(false) || self.debug,
        }
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CachePolicy::named(DEFAULT_CACHE_NAME),
            success_responses: SuccessResponses::default(),
            headers: None,
            debug: false,
            server_port: 3000,
            metadata_dir: PathBuf::from("./data/metadata"),
        }
    }
}
