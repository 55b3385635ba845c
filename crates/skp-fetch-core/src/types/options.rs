//! Request options and builder

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How a call site treats cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Serve fresh data, revalidate stale data
    #[default]
    Default,
    /// Always go to the transport
    NoStore,
    /// Serve any cached data regardless of age
    ForceCache,
}

impl CacheMode {
    /// Get mode as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Default => "default",
            CacheMode::NoStore => "no-store",
            CacheMode::ForceCache => "force-cache",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown cache mode
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cache mode: {0}")]
pub struct ParseCacheModeError(String);

impl FromStr for CacheMode {
    type Err = ParseCacheModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(CacheMode::Default),
            "no-store" => Ok(CacheMode::NoStore),
            "force-cache" => Ok(CacheMode::ForceCache),
            other => Err(ParseCacheModeError(other.to_string())),
        }
    }
}

/// Per-call configuration.
///
/// Deserializes from the JSON shape used by front-end call sites:
/// `{ "cache": "no-store", "ttlMs": 1000, "debounceMs": 300 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    /// Cache mode
    pub cache: CacheMode,
    /// Freshness window; falls back to the cache's default TTL
    #[serde(rename = "ttlMs", with = "duration_ms")]
    pub ttl: Option<Duration>,
    /// Debounce window for shaped call sites
    #[serde(rename = "debounceMs", with = "duration_ms")]
    pub debounce: Option<Duration>,
    /// Throttle interval for shaped call sites
    #[serde(rename = "throttleMs", with = "duration_ms")]
    pub throttle: Option<Duration>,
    /// Deadline for this caller only
    #[serde(rename = "timeoutMs", with = "duration_ms")]
    pub timeout: Option<Duration>,
    /// Serve expired data while refreshing in the background
    pub stale_while_revalidate: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            cache: CacheMode::Default,
            ttl: None,
            debounce: None,
            throttle: None,
            timeout: None,
            stale_while_revalidate: true,
        }
    }
}

/// Builder for RequestOptions with fluent API
#[derive(Debug, Clone, Default)]
pub struct RequestOpts(RequestOptions);

impl RequestOpts {
    /// Create new options builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cache mode
    pub fn cache(mut self, mode: CacheMode) -> Self {
        self.0.cache = mode;
        self
    }

    /// Shorthand for `cache(CacheMode::NoStore)`
    pub fn no_store(self) -> Self {
        self.cache(CacheMode::NoStore)
    }

    /// Shorthand for `cache(CacheMode::ForceCache)`
    pub fn force_cache(self) -> Self {
        self.cache(CacheMode::ForceCache)
    }

    /// Set TTL
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.0.ttl = Some(duration);
        self
    }

    /// Set TTL in milliseconds
    pub fn ttl_ms(self, millis: u64) -> Self {
        self.ttl(Duration::from_millis(millis))
    }

    /// Set TTL in seconds
    pub fn ttl_secs(self, seconds: u64) -> Self {
        self.ttl(Duration::from_secs(seconds))
    }

    /// Set debounce window
    pub fn debounce(mut self, duration: Duration) -> Self {
        self.0.debounce = Some(duration);
        self
    }

    /// Set debounce window in milliseconds
    pub fn debounce_ms(self, millis: u64) -> Self {
        self.debounce(Duration::from_millis(millis))
    }

    /// Set throttle interval
    pub fn throttle(mut self, duration: Duration) -> Self {
        self.0.throttle = Some(duration);
        self
    }

    /// Set throttle interval in milliseconds
    pub fn throttle_ms(self, millis: u64) -> Self {
        self.throttle(Duration::from_millis(millis))
    }

    /// Set a per-caller deadline
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.0.timeout = Some(duration);
        self
    }

    /// Set a per-caller deadline in milliseconds
    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    /// Block on a refetch instead of serving expired data
    pub fn no_stale(mut self) -> Self {
        self.0.stale_while_revalidate = false;
        self
    }

    /// Build the options
    pub fn build(self) -> RequestOptions {
        self.0
    }
}

impl From<RequestOpts> for RequestOptions {
    fn from(opts: RequestOpts) -> Self {
        opts.0
    }
}

impl From<CacheMode> for RequestOptions {
    fn from(cache: CacheMode) -> Self {
        RequestOptions {
            cache,
            ..Default::default()
        }
    }
}

impl From<Duration> for RequestOptions {
    fn from(ttl: Duration) -> Self {
        RequestOptions {
            ttl: Some(ttl),
            ..Default::default()
        }
    }
}

/// Serde adapter for `Option<Duration>` as integer milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
