//! Filesystem-shaped request routing
//!
//! Requests are matched to a rule by URL prefix, then resolved against the
//! rule's directory tree and served by one of four strategies: dynamic
//! handlers (API), static files (STATIC), a fixed redirect (REDIRECT) or a
//! single fixed file (STICKY). Handler files are bound to Rust closures
//! through a [`handler::HandlerRegistry`].

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod fs;
pub mod handler;
pub mod http;
pub mod logger;
pub mod resolver;
pub mod routing;
pub mod rule;
pub mod server;

pub use context::RequestContext;
pub use dispatch::{Dispatcher, Outcome};
pub use error::{ConfigError, ResolveError};
pub use handler::{HandlerRegistry, HandlerSet};
pub use rule::{ContentType, Rule, RuleType};
