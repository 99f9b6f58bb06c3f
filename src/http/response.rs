//! HTTP response building module
//!
//! Turns dispatch results into hyper responses and builds the few responses
//! the host answers on its own, before any rule is involved.

use crate::context::ResponseParts;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_LENGTH;
use hyper::Response;

/// Build the hyper response for a finished request context
pub fn build_from_parts(parts: ResponseParts) -> Response<Full<Bytes>> {
    let content_length = parts.body.len();
    let mut response = Response::new(Full::new(Bytes::from(parts.body)));
    *response.status_mut() = parts.status;
    *response.headers_mut() = parts.headers;
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, content_length.into());
    response
}

/// Build 400 Bad Request response (unreadable request body)
pub fn build_400_response() -> Response<Full<Bytes>> {
    build_plain_response(400, "400 Bad Request")
}

/// Build 404 Not Found response (no rule claims the path)
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_plain_response(404, "404 Not Found")
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_plain_response(413, "413 Payload Too Large")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    build_plain_response(500, "500 Internal Server Error")
}

fn build_plain_response(status: u16, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Content-Length", body.len())
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

/// Log response build error
fn log_build_error(status: u16, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use hyper::{Method, StatusCode};

    #[test]
    fn test_build_from_parts() {
        let mut ctx = RequestContext::new(Method::GET, "/api/x", "/api");
        ctx.status(StatusCode::CREATED)
            .set_header("X-Trace", "abc")
            .send("done");

        let response = build_from_parts(ctx.into_response());
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-trace"], "abc");
        assert_eq!(response.headers()["content-length"], "4");
    }

    #[test]
    fn test_plain_responses() {
        assert_eq!(build_404_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(build_413_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
        let response = build_500_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["content-type"], "text/plain");
    }
}
