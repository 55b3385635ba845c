//! Request descriptor

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request body as seen by the key codec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Body {
    /// Structured JSON; object key order is insignificant
    Json(serde_json::Value),
    /// Plain text
    Text(String),
    /// Opaque bytes
    Bytes(Vec<u8>),
}

/// Everything that identifies a logical request.
///
/// Method names are stored uppercased and header names lowercased, so two
/// descriptors built with different casing describe the same request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// HTTP-style method
    pub method: String,
    /// Target URL
    pub url: String,
    /// Request headers, names lowercased
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Optional request body
    #[serde(default)]
    pub body: Option<Body>,
}

impl RequestDescriptor {
    /// Create a descriptor for the given method and URL
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// `GET` request
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// `POST` request
    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    /// Add a header (name is lowercased)
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Add multiple headers
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// Set a JSON body
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    /// Set a text body
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(Body::Text(text.into()));
        self
    }

    /// Set a raw byte body
    pub fn bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Bytes(bytes.into()));
        self
    }
}

impl From<&str> for RequestDescriptor {
    fn from(url: &str) -> Self {
        Self::get(url)
    }
}

impl From<String> for RequestDescriptor {
    fn from(url: String) -> Self {
        Self::get(url)
    }
}

impl From<&RequestDescriptor> for RequestDescriptor {
    fn from(descriptor: &RequestDescriptor) -> Self {
        descriptor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalizes_casing() {
        let req = RequestDescriptor::new("post", "/api/items").header("Content-Type", "application/json");
        assert_eq!(req.method, "POST");
        assert_eq!(
            req.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_from_str_is_get() {
        let req: RequestDescriptor = "/api/users".into();
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "/api/users");
        assert!(req.body.is_none());
    }

    #[test]
    fn test_body_builders() {
        let req = RequestDescriptor::post("/search").json(json!({"q": "rust"}));
        assert_eq!(req.body, Some(Body::Json(json!({"q": "rust"}))));

        let req = RequestDescriptor::post("/upload").bytes(vec![1u8, 2, 3]);
        assert_eq!(req.body, Some(Body::Bytes(vec![1, 2, 3])));
    }

    #[test]
    fn test_deserialize_minimal() {
        let req: RequestDescriptor =
            serde_json::from_str(r#"{"method":"GET","url":"/todos"}"#).unwrap();
        assert_eq!(req, RequestDescriptor::get("/todos"));
    }
}
