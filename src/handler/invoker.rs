//! Handler invoker
//!
//! Picks exactly one handler for the request method: the method-specific one
//! first, then the catch-all. Anything else is answered with 405.

use super::HandlerSet;
use crate::context::RequestContext;
use crate::logger;
use hyper::{Method, StatusCode};
use serde_json::json;

/// Result of invoking a handler file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// A method-specific handler ran
    Method,
    /// The catch-all ran
    CatchAll,
    /// No handler applied; a 405 was emitted
    NotAllowed,
}

/// Methods that can reach a handler
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
];

/// Invoke the handler for the request's method
pub fn invoke(handlers: Option<&HandlerSet>, ctx: &mut RequestContext) -> Invocation {
    if !SUPPORTED_METHODS.contains(ctx.method()) {
        logger::log_warning(&format!("Method not allowed: {}", ctx.method()));
        respond_method_not_allowed(ctx);
        return Invocation::NotAllowed;
    }

    let Some(set) = handlers else {
        logger::log_warning(&format!("No handlers registered for {}", ctx.uri()));
        respond_method_not_allowed(ctx);
        return Invocation::NotAllowed;
    };

    if let Some(handler) = set.for_method(ctx.method()) {
        handler(ctx);
        Invocation::Method
    } else if let Some(handler) = set.catch_all() {
        handler(ctx);
        Invocation::CatchAll
    } else {
        logger::log_warning(&format!("No {} handler for {}", ctx.method(), ctx.uri()));
        respond_method_not_allowed(ctx);
        Invocation::NotAllowed
    }
}

/// Emit the fixed 405 body
pub fn respond_method_not_allowed(ctx: &mut RequestContext) {
    ctx.status(StatusCode::METHOD_NOT_ALLOWED).send_json(&json!({
        "ok": false,
        "message": "method not allowed",
        "code": 405,
    }));
}
