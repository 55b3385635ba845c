//! Cache key derivation

use std::collections::BTreeSet;
use std::fmt::{self, Write};
use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{Body, RequestDescriptor};

/// Canonical identifier for a logical request.
///
/// Two keys are equal iff their SHA-256 digests are equal. The human readable
/// metadata the digest was computed from is kept for debugging.
#[derive(Debug, Clone, Eq)]
pub struct CacheKey {
    metadata: Arc<str>,
    hash: [u8; 32],
}

impl CacheKey {
    /// Returns the human-readable metadata that forms the basis of the [`CacheKey`].
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    /// Raw digest bytes
    pub fn digest(&self) -> &[u8; 32] {
        &self.hash
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl std::hash::Hash for CacheKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.hash {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Derives [`CacheKey`]s from [`RequestDescriptor`]s.
///
/// The codec is pure and total: it never fails and always maps semantically
/// identical requests to the same key. Header names and JSON object keys are
/// ordered before hashing.
#[derive(Debug, Clone, Default)]
pub struct KeyCodec {
    namespace: Option<String>,
    vary_headers: Option<BTreeSet<String>>,
}

impl KeyCodec {
    /// Create a codec where every header contributes to the key
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix every key with a namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Only let the named headers contribute to the key
    pub fn vary_by<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let vary = self.vary_headers.get_or_insert_with(BTreeSet::new);
        vary.extend(
            headers
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase()),
        );
        self
    }

    /// Get the namespace
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Compute the key for a request
    pub fn compute(&self, descriptor: &RequestDescriptor) -> CacheKey {
        let mut metadata = String::new();
        let mut hasher = Sha256::new();

        // Every variable field is length-prefixed so no value can spell out
        // the fields that follow it.
        if let Some(ns) = &self.namespace {
            let _ = writeln!(metadata, "namespace: {}:{ns}", ns.len());
        }
        let method = descriptor.method.to_ascii_uppercase();
        let _ = writeln!(metadata, "method: {}:{method}", method.len());
        let url = descriptor.url.trim();
        let _ = writeln!(metadata, "url: {}:{url}", url.len());

        // Names may not be lowercased if the descriptor was deserialized
        let headers: BTreeSet<(String, &str)> = descriptor
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
            .filter(|(name, _)| match &self.vary_headers {
                Some(vary) => vary.contains(name),
                None => true,
            })
            .collect();
        for (name, value) in &headers {
            // writing into a String cannot fail
            let _ = writeln!(
                metadata,
                "header: {}:{name}={}:{value}",
                name.len(),
                value.len()
            );
        }

        match &descriptor.body {
            None => {}
            Some(Body::Json(value)) => {
                let mut json = String::new();
                write_canonical(value, &mut json);
                let _ = writeln!(metadata, "body.json: {}:{json}", json.len());
            }
            Some(Body::Text(text)) => {
                let _ = writeln!(metadata, "body.text: {}", text.len());
                hasher.update(text.as_bytes());
            }
            Some(Body::Bytes(bytes)) => {
                let _ = writeln!(metadata, "body.bytes: {}", bytes.len());
                hasher.update(bytes);
            }
        }

        hasher.update(metadata.as_bytes());
        CacheKey {
            metadata: metadata.into(),
            hash: hasher.finalize().into(),
        }
    }
}

/// Writes `value` as JSON with object keys sorted at every level.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_requests_collide() {
        let codec = KeyCodec::new();
        let a = RequestDescriptor::get("/users").header("Accept", "application/json");
        let b = RequestDescriptor::new("get", "/users").header("accept", "application/json ");
        assert_eq!(codec.compute(&a), codec.compute(&b));
    }

    #[test]
    fn test_json_key_order_is_insignificant() {
        let codec = KeyCodec::new();
        let a = RequestDescriptor::post("/search")
            .json(json!({"q": "rust", "page": {"size": 10, "index": 2}}));
        let b = RequestDescriptor::post("/search")
            .json(json!({"page": {"index": 2, "size": 10}, "q": "rust"}));
        assert_eq!(codec.compute(&a), codec.compute(&b));
    }

    #[test]
    fn test_distinct_requests_differ() {
        let codec = KeyCodec::new();
        let get = codec.compute(&RequestDescriptor::get("/users"));
        let post = codec.compute(&RequestDescriptor::post("/users"));
        let other = codec.compute(&RequestDescriptor::get("/users?page=2"));
        let body = codec.compute(&RequestDescriptor::post("/users").text("a"));
        assert_ne!(get, post);
        assert_ne!(get, other);
        assert_ne!(post, body);
    }

    #[test]
    fn test_array_order_is_significant() {
        let codec = KeyCodec::new();
        let a = codec.compute(&RequestDescriptor::post("/ids").json(json!([1, 2])));
        let b = codec.compute(&RequestDescriptor::post("/ids").json(json!([2, 1])));
        assert_ne!(a, b);
    }

    #[test]
    fn test_vary_headers_subset() {
        let codec = KeyCodec::new().vary_by(["Accept-Language"]);
        let a = RequestDescriptor::get("/home")
            .header("accept-language", "en")
            .header("x-request-id", "1");
        let b = RequestDescriptor::get("/home")
            .header("accept-language", "en")
            .header("x-request-id", "2");
        let c = RequestDescriptor::get("/home").header("accept-language", "de");

        assert_eq!(codec.compute(&a), codec.compute(&b));
        assert_ne!(codec.compute(&a), codec.compute(&c));
    }

    #[test]
    fn test_namespace_separates_keys() {
        let req = RequestDescriptor::get("/users");
        let plain = KeyCodec::new().compute(&req);
        let scoped = KeyCodec::new().with_namespace("admin").compute(&req);
        assert_ne!(plain, scoped);
        assert!(scoped.metadata().starts_with("namespace: 5:admin\n"));
    }

    #[test]
    fn test_newline_in_url_cannot_forge_header() {
        let codec = KeyCodec::new();
        let forged = codec.compute(&RequestDescriptor::get("/a\nheader.x-user: alice"));
        let real = codec.compute(&RequestDescriptor::get("/a").header("x-user", "alice"));
        assert_ne!(forged, real);
        assert_ne!(forged.metadata(), real.metadata());
    }

    #[test]
    fn test_newline_in_header_value_cannot_forge_header() {
        let codec = KeyCodec::new();
        let forged = codec.compute(&RequestDescriptor::get("/a").header("a", "1\nheader.b: 2"));
        let real = codec.compute(
            &RequestDescriptor::get("/a")
                .header("a", "1")
                .header("b", "2"),
        );
        assert_ne!(forged, real);

        let forged = codec.compute(&RequestDescriptor::get("/a").header("a", "1\nheader: 1:b=1:2"));
        assert_ne!(forged, real);
    }

    #[test]
    fn test_namespace_cannot_forge_url() {
        let req = RequestDescriptor::get("/users");
        let forged = KeyCodec::new()
            .with_namespace("x\nmethod: 3:GET\nurl: 6:/users")
            .compute(&RequestDescriptor::get("/other"));
        let real = KeyCodec::new().with_namespace("x").compute(&req);
        assert_ne!(forged, real);
    }

    #[test]
    fn test_display_is_hex_digest() {
        let key = KeyCodec::new().compute(&RequestDescriptor::get("/"));
        let hex = key.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_canonical_json() {
        let mut out = String::new();
        write_canonical(&json!({"b": [1, {"d": null, "c": "x"}], "a": true}), &mut out);
        assert_eq!(out, r#"{"a":true,"b":[1,{"c":"x","d":null}]}"#);
    }
}
