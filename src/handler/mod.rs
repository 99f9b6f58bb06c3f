//! Request handler module
//!
//! Handlers are plain Rust closures registered against the handler files of
//! a route tree. A [`HandlerSet`] holds the per-method handlers of one file,
//! a [`HandlerRegistry`] maps the files and folders of one rule to them.

pub mod invoker;
pub mod middleware;
mod registry;

pub use registry::{HandlerRegistry, Verification};

use crate::context::RequestContext;
use hyper::Method;
use std::fmt;
use std::sync::Arc;

/// A handler or hook capability
pub type Handler = Arc<dyn Fn(&mut RequestContext) + Send + Sync>;

/// Handlers exposed by one handler file
#[derive(Clone, Default)]
pub struct HandlerSet {
    get: Option<Handler>,
    post: Option<Handler>,
    put: Option<Handler>,
    delete: Option<Handler>,
    patch: Option<Handler>,
    any: Option<Handler>,
    init: Option<Handler>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(mut self, f: impl Fn(&mut RequestContext) + Send + Sync + 'static) -> Self {
        self.get = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn post(mut self, f: impl Fn(&mut RequestContext) + Send + Sync + 'static) -> Self {
        self.post = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn put(mut self, f: impl Fn(&mut RequestContext) + Send + Sync + 'static) -> Self {
        self.put = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn delete(mut self, f: impl Fn(&mut RequestContext) + Send + Sync + 'static) -> Self {
        self.delete = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn patch(mut self, f: impl Fn(&mut RequestContext) + Send + Sync + 'static) -> Self {
        self.patch = Some(Arc::new(f));
        self
    }

    /// Catch-all used when no method-specific handler exists
    #[must_use]
    pub fn any(mut self, f: impl Fn(&mut RequestContext) + Send + Sync + 'static) -> Self {
        self.any = Some(Arc::new(f));
        self
    }

    /// File-scoped init hook, runs before the method handler
    #[must_use]
    pub fn init(mut self, f: impl Fn(&mut RequestContext) + Send + Sync + 'static) -> Self {
        self.init = Some(Arc::new(f));
        self
    }

    pub const fn init_hook(&self) -> Option<&Handler> {
        self.init.as_ref()
    }

    /// Handler for `method`, ignoring the catch-all
    ///
    /// `None` for methods outside GET/POST/PUT/DELETE/PATCH.
    pub fn for_method(&self, method: &Method) -> Option<&Handler> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::PUT => self.put.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            _ => None,
        }
    }

    pub const fn catch_all(&self) -> Option<&Handler> {
        self.any.as_ref()
    }

    /// Names of the exposed capabilities, for diagnostics
    pub fn capabilities(&self) -> Vec<&'static str> {
        [
            ("GET", self.get.is_some()),
            ("POST", self.post.is_some()),
            ("PUT", self.put.is_some()),
            ("DELETE", self.delete.is_some()),
            ("PATCH", self.patch.is_some()),
            ("ANY", self.any.is_some()),
            ("INIT", self.init.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
