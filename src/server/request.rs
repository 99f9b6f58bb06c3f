//! Request handling
//!
//! Entry point for every HTTP request: size checks, rule lookup, body
//! collection, then the synchronous dispatcher on the blocking pool. The
//! resulting context is turned into the hyper response and access-logged.

use super::AppState;
use crate::context::RequestContext;
use crate::dispatch::Outcome;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, REFERER, USER_AGENT};
use hyper::{HeaderMap, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let start = Instant::now();
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header_string(req.headers(), REFERER);
    entry.user_agent = header_string(req.headers(), USER_AGENT);

    let response = route_request(req, &state, &mut entry).await;

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = header_string(response.headers(), CONTENT_LENGTH)
            .and_then(|len| len.parse().ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn route_request<B>(
    req: Request<B>,
    state: &Arc<AppState>,
    entry: &mut AccessLogEntry,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(req.headers(), max_body_size) {
        return resp;
    }

    let Some((route, segments)) = state.routes.find(req.uri().path()) else {
        logger::log_debug(&format!("No rule claims {}", req.uri().path()));
        entry.outcome = Some(Outcome::NotFound.as_str());
        return http::build_404_response();
    };
    let route = Arc::clone(route);
    entry.rule = Some(route.rule.prefix().to_string());
    logger::log_debug(&format!(
        "[{}] {} {} -> {segments:?}",
        route.rule.prefix(),
        req.method(),
        req.uri().path()
    ));

    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_error(&format!("Request body too large (max: {max_body_size})"));
            return http::build_413_response();
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return http::build_400_response();
        }
    };

    let mut ctx = RequestContext::new(parts.method, parts.uri.to_string(), route.rule.prefix())
        .with_headers(parts.headers)
        .with_body(body);

    let worker_state = Arc::clone(state);
    let joined = tokio::task::spawn_blocking(move || {
        let outcome = worker_state.dispatcher.dispatch(&route, &mut ctx);
        (outcome, ctx.into_response())
    })
    .await;

    match joined {
        Ok((outcome, parts)) => {
            entry.outcome = Some(outcome.as_str());
            http::build_from_parts(parts)
        }
        Err(e) => {
            logger::log_error(&format!("Dispatch task failed: {e}"));
            entry.outcome = Some(Outcome::Failed.as_str());
            http::build_500_response()
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn header_string(headers: &HeaderMap, name: hyper::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatch::Dispatcher;
    use crate::fs::MemoryFileSystem;
    use crate::handler::{HandlerRegistry, HandlerSet};
    use crate::resolver::Conventions;
    use crate::routing::{Route, RouteTable};
    use crate::rule::{Rule, RuleType};
    use hyper::StatusCode;

    fn state(max_body_size: u64) -> Arc<AppState> {
        let mut config = Config::load_from("/nonexistent/fsroute-config").unwrap();
        config.logging.access_log = false;
        config.http.max_body_size = max_body_size;

        let fs = MemoryFileSystem::new().with_file("routes/echo.rs", "");
        let registry = HandlerRegistry::new().route(
            "echo.rs",
            HandlerSet::new().post(|ctx| {
                let body = ctx.body().clone();
                ctx.send(body);
            }),
        );

        let mut routes = RouteTable::new();
        let api = Rule::new("/api")
            .rule_type(RuleType::Api)
            .target("routes")
            .build()
            .unwrap();
        routes.add(Route::new(api, registry)).unwrap();
        let old = Rule::new("/old")
            .rule_type(RuleType::Redirect)
            .target("/new")
            .build()
            .unwrap();
        routes.add(Route::new(old, HandlerRegistry::new())).unwrap();

        let dispatcher = Dispatcher::new(Arc::new(fs), Conventions::default());
        Arc::new(AppState::new(config, routes, dispatcher))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_handler_receives_body() {
        let req = Request::post("/api/echo")
            .body(Full::new(Bytes::from("hello")))
            .unwrap();
        let response = handle_request(req, state(1024), peer()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(body_bytes(response).await, "hello");
    }

    #[tokio::test]
    async fn test_unclaimed_path_is_plain_404() {
        let req = Request::get("/elsewhere").body(Full::new(Bytes::new())).unwrap();
        let response = handle_request(req, state(1024), peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(response).await, "404 Not Found");
    }

    #[tokio::test]
    async fn test_redirect() {
        let req = Request::get("/old/page").body(Full::new(Bytes::new())).unwrap();
        let response = handle_request(req, state(1024), peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["location"], "/new");
    }

    #[tokio::test]
    async fn test_body_limits() {
        let req = Request::post("/api/echo")
            .header("content-length", "10")
            .body(Full::new(Bytes::from("0123456789")))
            .unwrap();
        let response = handle_request(req, state(4), peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // no Content-Length: the collected body is still capped
        let req = Request::post("/api/echo")
            .body(Full::new(Bytes::from("0123456789")))
            .unwrap();
        let response = handle_request(req, state(4), peer()).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(Version::HTTP_11), "1.1");
        assert_eq!(version_label(Version::HTTP_2), "2");
    }
}
