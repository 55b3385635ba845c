use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use skp_fetch_core::{duration_ms, KeyCodec, RequestOptions};

use crate::CacheControl;

/// How HTTP requests are keyed and cached
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpFetchPolicy {
    /// Header names that contribute to the key; empty means all of them
    pub vary_headers: Vec<String>,
    /// TTL when the request does not carry `max-age`
    #[serde(rename = "defaultTtlMs", with = "duration_ms")]
    pub default_ttl: Option<Duration>,
    /// Let request `Cache-Control` directives pick the cache mode and TTL
    pub honor_request_cache_control: bool,
}

impl Default for HttpFetchPolicy {
    fn default() -> Self {
        Self {
            vary_headers: Vec::new(),
            default_ttl: None,
            honor_request_cache_control: true,
        }
    }
}

impl HttpFetchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    pub fn vary_by(mut self, headers: &[&str]) -> Self {
        self.vary_headers.extend(headers.iter().map(|s| s.to_string()));
        self
    }

    /// Ignore `Cache-Control` sent by callers
    pub fn ignore_request_cache_control(mut self) -> Self {
        self.honor_request_cache_control = false;
        self
    }

    /// Key codec honouring the vary list
    pub fn key_codec(&self) -> KeyCodec {
        if self.vary_headers.is_empty() {
            KeyCodec::new()
        } else {
            KeyCodec::new().vary_by(&self.vary_headers)
        }
    }

    /// Options for a request carrying `headers`.
    ///
    /// Priority for the TTL: request `s-maxage` > `max-age` > policy default.
    pub fn options_for(&self, headers: &HeaderMap) -> RequestOptions {
        let mut options = if self.honor_request_cache_control {
            CacheControl::from_headers(headers).request_options()
        } else {
            RequestOptions::default()
        };
        if options.ttl.is_none() {
            options.ttl = self.default_ttl;
        }
        options
    }
}
