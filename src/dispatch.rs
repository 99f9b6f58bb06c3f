//! Rule-type dispatch
//!
//! One serving strategy per rule type, fixed at registration:
//! - REDIRECT answers 301 without touching the filesystem
//! - STICKY serves one fixed file whatever the path
//! - STATIC resolves and serves files, rendering handler files as pages
//! - API resolves with the exact-match guard, then runs middleware and the
//!   method handler
//!
//! Every request ends with a definite response in the context; filesystem
//! faults become 500s here and never propagate further.

use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::fs::FileSystem;
use crate::handler::{invoker, middleware};
use crate::http::mime;
use crate::logger;
use crate::resolver::{self, Conventions, ResourceDescriptor};
use crate::routing::Route;
use crate::rule::{Rule, RuleType};
use hyper::StatusCode;
use serde_json::json;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// How a request ended, for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Served,
    Redirected,
    NotFound,
    MethodNotAllowed,
    Failed,
}

impl Outcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Served => "served",
            Self::Redirected => "redirected",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Failed => "failed",
        }
    }
}

/// Serves requests for registered routes against one filesystem view
pub struct Dispatcher {
    fs: Arc<dyn FileSystem>,
    conventions: Conventions,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("conventions", &self.conventions)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(fs: Arc<dyn FileSystem>, conventions: Conventions) -> Self {
        Self { fs, conventions }
    }

    /// Serve `ctx` according to `route`'s rule type
    pub fn dispatch(&self, route: &Route, ctx: &mut RequestContext) -> Outcome {
        let rule = &route.rule;
        let result = match rule.rule_type() {
            RuleType::Redirect => Ok(redirect(rule, ctx)),
            RuleType::Sticky => {
                set_common_headers(rule, ctx);
                self.serve_sticky(route, ctx)
            }
            RuleType::Static => {
                set_common_headers(rule, ctx);
                self.serve_static(route, ctx)
            }
            RuleType::Api => {
                set_common_headers(rule, ctx);
                self.serve_api(route, ctx)
            }
        };

        result.unwrap_or_else(|e| {
            logger::log_error(&format!("[{}] {} {}: {e}", rule.prefix(), ctx.method(), ctx.uri()));
            internal_error(rule, ctx);
            Outcome::Failed
        })
    }

    fn serve_sticky(&self, route: &Route, ctx: &mut RequestContext) -> Result<Outcome, ResolveError> {
        let target = route.rule.target();
        let dir = target.parent().unwrap_or_else(|| Path::new(""));

        let Some(file) = target.file_name().and_then(|f| f.to_str()) else {
            return self.page_not_found(dir, ctx);
        };
        if !self.is_file(target)? {
            return self.page_not_found(dir, ctx);
        }

        if self.conventions.is_handler_file(file) {
            ctx.set_header("Content-Type", mime::HANDLER_PAGE_CONTENT_TYPE);
            return Ok(render_handler(route, Path::new(file), ctx));
        }
        match self.serve_file(target, RuleType::Sticky, ctx)? {
            Some(outcome) => Ok(outcome),
            None => self.page_not_found(dir, ctx),
        }
    }

    fn serve_static(&self, route: &Route, ctx: &mut RequestContext) -> Result<Outcome, ResolveError> {
        let rule = &route.rule;
        let Some(found) = resolver::resolve(&*self.fs, rule, ctx.segments(), &self.conventions)?
        else {
            logger::log_debug(&format!("[{}] no match for {}", rule.prefix(), ctx.uri()));
            return self.page_not_found(rule.target(), ctx);
        };

        if self.run_folder_middleware(route, &found, ctx)? {
            return Ok(Outcome::Served);
        }

        if self.conventions.is_handler_file(&found.file) {
            ctx.set_header("Content-Type", mime::HANDLER_PAGE_CONTENT_TYPE);
            let relative = found.relative_dir(rule.target()).join(&found.file);
            return Ok(render_handler(route, &relative, ctx));
        }

        match self.serve_file(&found.path(), RuleType::Static, ctx)? {
            Some(outcome) => Ok(outcome),
            None => self.page_not_found(rule.target(), ctx),
        }
    }

    fn serve_api(&self, route: &Route, ctx: &mut RequestContext) -> Result<Outcome, ResolveError> {
        let rule = &route.rule;
        let Some(found) = resolver::resolve(&*self.fs, rule, ctx.segments(), &self.conventions)?
        else {
            logger::log_debug(&format!("[{}] no match for {}", rule.prefix(), ctx.uri()));
            return self.api_not_found(rule, ctx);
        };

        if self.run_folder_middleware(route, &found, ctx)? {
            return Ok(Outcome::Served);
        }

        if self.conventions.is_handler_file(&found.file) {
            let relative = found.relative_dir(rule.target()).join(&found.file);
            return Ok(render_handler(route, &relative, ctx));
        }

        // plain files under an API tree are served as they are
        match self.serve_file(&found.path(), RuleType::Api, ctx)? {
            Some(outcome) => Ok(outcome),
            None => self.api_not_found(rule, ctx),
        }
    }

    /// Bind params and run the folder hook; `true` when the hook ended the request
    fn run_folder_middleware(
        &self,
        route: &Route,
        found: &ResourceDescriptor,
        ctx: &mut RequestContext,
    ) -> Result<bool, ResolveError> {
        ctx.set_params(found.params.clone());
        middleware::run_folder_scoped(
            &*self.fs,
            &route.handlers,
            route.rule.target(),
            found,
            &self.conventions,
            ctx,
        )?;
        Ok(ctx.is_sent())
    }

    /// Stream a file; `Ok(None)` when it vanished since resolution
    ///
    /// Handler files are never streamed.
    fn serve_file(
        &self,
        path: &Path,
        rule_type: RuleType,
        ctx: &mut RequestContext,
    ) -> Result<Option<Outcome>, ResolveError> {
        let file_name = path.file_name().and_then(|f| f.to_str()).unwrap_or_default();
        if self.conventions.is_handler_file(file_name) {
            logger::log_warning(&format!("Refusing to stream handler file '{}'", path.display()));
            return Ok(None);
        }

        let Some(bytes) = self.read_optional(path)? else {
            return Ok(None);
        };
        let content_type = mime::content_type_for(path, rule_type, &self.conventions.handler_ext);
        if !content_type.is_empty() {
            ctx.set_header("Content-Type", content_type);
        }
        ctx.status(StatusCode::OK).send(bytes);
        Ok(Some(Outcome::Served))
    }

    /// 404 with `<dir>/404.html` as the body when present
    fn page_not_found(&self, dir: &Path, ctx: &mut RequestContext) -> Result<Outcome, ResolveError> {
        let page = dir.join(&self.conventions.not_found_page);
        ctx.status(StatusCode::NOT_FOUND);
        match self.read_optional(&page)? {
            Some(bytes) => {
                ctx.set_header("Content-Type", "text/html; charset=utf-8");
                ctx.send(bytes);
            }
            None => {
                ctx.set_header("Content-Type", "text/plain");
                ctx.send("404 Not Found");
            }
        }
        Ok(Outcome::NotFound)
    }

    /// JSON 404, from `<target>/404.json` when present
    fn api_not_found(&self, rule: &Rule, ctx: &mut RequestContext) -> Result<Outcome, ResolveError> {
        let custom = rule.target().join(&self.conventions.not_found_json);
        ctx.status(StatusCode::NOT_FOUND);
        match self.read_optional(&custom)? {
            Some(bytes) => {
                ctx.set_header("Content-Type", "application/json");
                ctx.send(bytes);
            }
            None => {
                let message = format!("Cannot {} {}", ctx.method(), ctx.uri());
                ctx.send_json(&json!({
                    "ok": false,
                    "message": message,
                    "code": 404,
                }));
            }
        }
        Ok(Outcome::NotFound)
    }

    fn is_file(&self, path: &Path) -> Result<bool, ResolveError> {
        self.fs.is_file(path).map_err(|e| ResolveError::io(path, e))
    }

    fn read_optional(&self, path: &Path) -> Result<Option<Vec<u8>>, ResolveError> {
        if !self.is_file(path)? {
            return Ok(None);
        }
        match self.fs.read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ResolveError::io(path, e)),
        }
    }
}

/// Run the file's init hook and method handler
fn render_handler(route: &Route, relative: &Path, ctx: &mut RequestContext) -> Outcome {
    let handlers = route.handlers.handlers(relative);
    middleware::run_file_scoped(handlers, ctx);
    if ctx.is_sent() {
        return Outcome::Served;
    }
    match invoker::invoke(handlers, ctx) {
        invoker::Invocation::NotAllowed => Outcome::MethodNotAllowed,
        invoker::Invocation::Method | invoker::Invocation::CatchAll => Outcome::Served,
    }
}

fn redirect(rule: &Rule, ctx: &mut RequestContext) -> Outcome {
    let location = rule.target().to_string_lossy();
    ctx.status(StatusCode::MOVED_PERMANENTLY)
        .set_header("Location", &location)
        .send(b"");
    Outcome::Redirected
}

/// Permissive CORS plus the rule's accepted types
fn set_common_headers(rule: &Rule, ctx: &mut RequestContext) {
    ctx.remove_header("X-Powered-By")
        .set_header("Access-Control-Allow-Origin", "*")
        .set_header("Access-Control-Allow-Methods", "GET, POST")
        .set_header("Access-Control-Allow-Headers", "*")
        .set_header("Accept", &rule.accept_header());
}

fn internal_error(rule: &Rule, ctx: &mut RequestContext) {
    ctx.truncate_body(0);
    ctx.status(StatusCode::INTERNAL_SERVER_ERROR);
    if rule.rule_type() == RuleType::Api {
        ctx.send_json(&json!({
            "ok": false,
            "message": "internal server error",
            "code": 500,
        }));
    } else {
        ctx.set_header("Content-Type", "text/plain");
        ctx.send("500 Internal Server Error");
    }
}
