//! Per-request context
//!
//! Carries the request (method, URI, path segments relative to the matched
//! rule, captured params) and accumulates the response that the host
//! writes back once dispatch finishes.

use crate::logger;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use std::collections::HashMap;

/// Response under construction
#[derive(Debug, Default)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    sent: bool,
}

impl ResponseParts {
    pub const fn is_sent(&self) -> bool {
        self.sent
    }
}

/// State for one request, owned by the request-handling flow
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Bytes,
    segments: Vec<String>,
    params: HashMap<String, String>,
    /// Free-form values middleware hands to handlers
    pub locals: HashMap<String, serde_json::Value>,
    response: ResponseParts,
}

impl RequestContext {
    /// Build a context for a request matched by the rule with `prefix`
    pub fn new(method: Method, uri: impl Into<String>, prefix: &str) -> Self {
        let uri = uri.into();
        let segments = split_segments(path_of(&uri), prefix);
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            segments,
            params: HashMap::new(),
            locals: HashMap::new(),
            response: ResponseParts::default(),
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Raw query string, without the leading `?`
    pub fn query(&self) -> Option<&str> {
        self.uri.split_once('?').map(|(_, q)| q)
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Path segments relative to the rule prefix; never empty strings
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub const fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    // ---- response emission ----

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.response.status = status;
        self
    }

    /// Set (replace) a response header; invalid names or values are dropped with a warning
    pub fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.response.headers.insert(name, value);
            }
            _ => logger::log_warning(&format!("Dropping invalid response header '{name}'")),
        }
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.response.headers.remove(name);
        self
    }

    /// Append to the response body without ending the request
    pub fn write(&mut self, bytes: &[u8]) -> &mut Self {
        self.response.body.extend_from_slice(bytes);
        self
    }

    /// Write the body and end the request
    pub fn send(&mut self, bytes: impl AsRef<[u8]>) {
        self.response.body.extend_from_slice(bytes.as_ref());
        self.response.sent = true;
    }

    /// Serialize `value` as the JSON body and end the request
    pub fn send_json<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_vec(value) {
            Ok(json) => {
                self.response
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.response.body = json;
            }
            Err(e) => {
                logger::log_error(&format!("Failed to serialize response: {e}"));
                self.response.status = StatusCode::INTERNAL_SERVER_ERROR;
                self.response.body.clear();
            }
        }
        self.response.sent = true;
    }

    pub const fn is_sent(&self) -> bool {
        self.response.sent
    }

    /// Drop body bytes written after `len`
    pub(crate) fn truncate_body(&mut self, len: usize) {
        self.response.body.truncate(len);
    }

    pub const fn response(&self) -> &ResponseParts {
        &self.response
    }

    pub fn into_response(self) -> ResponseParts {
        self.response
    }
}

fn path_of(uri: &str) -> &str {
    let path = uri.split(['?', '#']).next().unwrap_or_default();
    // absolute-form URIs carry scheme and authority
    match path.find("://") {
        Some(idx) => path[idx + 3..].find('/').map_or("/", |p| &path[idx + 3 + p..]),
        None => path,
    }
}

/// Split `path` into non-empty segments after removing `prefix`
pub fn split_segments(path: &str, prefix: &str) -> Vec<String> {
    let prefix = prefix.trim_matches('/');
    let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();

    for expected in prefix.split('/').filter(|s| !s.is_empty()) {
        if segments.peek() == Some(&expected) {
            segments.next();
        } else {
            break;
        }
    }

    segments.map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_strip_prefix() {
        let ctx = RequestContext::new(Method::GET, "/api/users/42", "/api");
        assert_eq!(ctx.segments(), ["users", "42"]);
    }

    #[test]
    fn test_segments_discard_empty() {
        let ctx = RequestContext::new(Method::GET, "//api///users//", "/api");
        assert_eq!(ctx.segments(), ["users"]);

        let ctx = RequestContext::new(Method::GET, "/api", "/api");
        assert!(ctx.segments().is_empty());
    }

    #[test]
    fn test_segments_root_prefix() {
        let ctx = RequestContext::new(Method::GET, "/css/site.css?v=3", "/");
        assert_eq!(ctx.segments(), ["css", "site.css"]);
        assert_eq!(ctx.query(), Some("v=3"));
    }

    #[test]
    fn test_segments_nested_prefix() {
        assert_eq!(split_segments("/v1/api/items", "/v1/api"), ["items"]);
        assert_eq!(split_segments("/v1/other", "/v1/api"), ["other"]);
        assert_eq!(
            split_segments(path_of("http://example.com/v1/api/items?x=1"), "/v1/api"),
            ["items"]
        );
    }

    #[test]
    fn test_send_json_sets_content_type() {
        let mut ctx = RequestContext::new(Method::GET, "/api", "/api");
        ctx.status(StatusCode::CREATED)
            .send_json(&serde_json::json!({"ok": true}));

        let res = ctx.response();
        assert!(res.is_sent());
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(res.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(res.body, br#"{"ok":true}"#);
    }

    #[test]
    fn test_write_does_not_end_request() {
        let mut ctx = RequestContext::new(Method::GET, "/", "/");
        ctx.write(b"hello ").write(b"world");
        assert!(!ctx.is_sent());
        assert_eq!(ctx.response().body, b"hello world");
    }

    #[test]
    fn test_invalid_header_dropped() {
        let mut ctx = RequestContext::new(Method::GET, "/", "/");
        ctx.set_header("bad header", "x").set_header("X-Ok", "yes");
        assert_eq!(ctx.response().headers.len(), 1);
        assert_eq!(ctx.response().headers.get("x-ok").unwrap(), "yes");
    }
}
