use http::header::CACHE_CONTROL;
use http::HeaderMap;
use std::time::Duration;

use skp_fetch_core::{CacheMode, RequestOptions};

/// Parsed Cache-Control header directives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    /// Max age in seconds
    pub max_age: Option<Duration>,
    /// S-Maxage (shared cache max age)
    pub s_maxage: Option<Duration>,
    /// No-cache directive
    pub no_cache: bool,
    /// No-store directive
    pub no_store: bool,
    /// Must-revalidate directive
    pub must_revalidate: bool,
    /// Only-if-cached directive
    pub only_if_cached: bool,
    /// Stale-while-revalidate window
    pub stale_while_revalidate: Option<Duration>,
}

fn seconds(directive: &str, name: &str) -> Option<Option<Duration>> {
    let (key, value) = directive.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case(name) {
        return None;
    }
    Some(
        value
            .trim()
            .trim_matches('"')
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs),
    )
}

impl CacheControl {
    /// Parse from header string value
    pub fn parse(header: &str) -> Self {
        let mut cc = Self::default();
        for directive in header.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            if directive.eq_ignore_ascii_case("no-cache") {
                cc.no_cache = true;
            } else if directive.eq_ignore_ascii_case("no-store") {
                cc.no_store = true;
            } else if directive.eq_ignore_ascii_case("must-revalidate") {
                cc.must_revalidate = true;
            } else if directive.eq_ignore_ascii_case("only-if-cached") {
                cc.only_if_cached = true;
            } else if let Some(value) = seconds(directive, "max-age") {
                cc.max_age = value;
            } else if let Some(value) = seconds(directive, "s-maxage") {
                cc.s_maxage = value;
            } else if let Some(value) = seconds(directive, "stale-while-revalidate") {
                cc.stale_while_revalidate = value;
            }
        }
        cc
    }

    /// Parse every `Cache-Control` header of a request
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let joined = headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        Self::parse(&joined)
    }

    /// Check if no directive was present
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Map request directives onto per-call options.
    ///
    /// `no-store` and `no-cache` bypass cached data, `only-if-cached` forces
    /// it, `max-age` (or `s-maxage`) becomes the TTL and `must-revalidate`
    /// turns off serving stale data.
    pub fn request_options(&self) -> RequestOptions {
        let mut options = RequestOptions::default();

        if self.no_store || self.no_cache {
            options.cache = CacheMode::NoStore;
        } else if self.only_if_cached {
            options.cache = CacheMode::ForceCache;
        }

        options.ttl = self.s_maxage.or(self.max_age);
        if self.must_revalidate {
            options.stale_while_revalidate = false;
        }
        options
    }
}
