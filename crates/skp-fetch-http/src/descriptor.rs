//! Building request descriptors from `http` types

use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Request, Uri};
use std::collections::BTreeMap;

use skp_fetch_core::RequestDescriptor;

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Describe a request from its parts.
///
/// Repeated headers are joined with `", "`; headers that are not valid UTF-8
/// are skipped. A JSON body (by `Content-Type`) is parsed so that key order
/// does not matter for caching; other bodies are kept as text when they are
/// UTF-8 and as bytes otherwise.
pub fn descriptor_from_parts(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> RequestDescriptor {
    let mut joined: BTreeMap<&str, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        joined
            .entry(name.as_str())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    let descriptor = RequestDescriptor::new(method.as_str(), uri.to_string()).headers(joined);
    if body.is_empty() {
        return descriptor;
    }

    if is_json(headers) {
        if let Ok(value) = serde_json::from_slice(body) {
            return descriptor.json(value);
        }
    }
    match std::str::from_utf8(body) {
        Ok(text) => descriptor.text(text),
        Err(_) => descriptor.bytes(body),
    }
}

/// Describe an `http::Request`
pub fn descriptor_from_request<B: AsRef<[u8]>>(request: &Request<B>) -> RequestDescriptor {
    descriptor_from_parts(
        request.method(),
        request.uri(),
        request.headers(),
        request.body().as_ref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;
    use skp_fetch_core::{Body, KeyCodec};

    #[test]
    fn test_get_without_body() {
        let request = Request::get("https://api.example.com/users?page=2")
            .header("Accept", "application/json")
            .body(Vec::new())
            .unwrap();

        let descriptor = descriptor_from_request(&request);
        assert_eq!(descriptor.method, "GET");
        assert_eq!(descriptor.url, "https://api.example.com/users?page=2");
        assert_eq!(descriptor.headers.get("accept").map(String::as_str), Some("application/json"));
        assert!(descriptor.body.is_none());
    }

    #[test]
    fn test_json_body_is_parsed() {
        let a = Request::post("/search")
            .header("content-type", "application/json; charset=utf-8")
            .body(r#"{"q": "rust", "page": 1}"#)
            .unwrap();
        let b = Request::post("/search")
            .header("content-type", "application/json")
            .body(r#"{"page":1,"q":"rust"}"#)
            .unwrap();

        let da = descriptor_from_request(&a);
        assert_eq!(da.body, Some(Body::Json(json!({"q": "rust", "page": 1}))));

        let codec = KeyCodec::new().vary_by(["accept"]);
        assert_eq!(codec.compute(&da), codec.compute(&descriptor_from_request(&b)));
    }

    #[test]
    fn test_non_json_bodies() {
        let text = Request::put("/notes/1").body("hello").unwrap();
        assert_eq!(
            descriptor_from_request(&text).body,
            Some(Body::Text("hello".to_string()))
        );

        let binary = Request::put("/blobs/1").body(vec![0xff, 0xfe, 0x00]).unwrap();
        assert_eq!(
            descriptor_from_request(&binary).body,
            Some(Body::Bytes(vec![0xff, 0xfe, 0x00]))
        );

        let broken = Request::post("/x")
            .header("content-type", "application/json")
            .body("{not json")
            .unwrap();
        assert_eq!(
            descriptor_from_request(&broken).body,
            Some(Body::Text("{not json".to_string()))
        );
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));

        let descriptor =
            descriptor_from_parts(&Method::GET, &Uri::from_static("/tags"), &headers, &[]);
        assert_eq!(descriptor.headers.get("x-tag").map(String::as_str), Some("a, b"));
    }
}
