//! Middleware executor
//!
//! Two optional phases run before the method handler: the folder hook of the
//! resolved directory (only when its `_middleware` file exists), then the
//! init hook of the handler file. Body output from the folder hook is
//! discarded unless it ends the request; only context changes survive.

use super::{HandlerRegistry, HandlerSet};
use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::fs::FileSystem;
use crate::resolver::{Conventions, ResourceDescriptor};
use std::path::Path;

/// Run the folder-scoped hook for the descriptor's directory
///
/// Returns `Ok(false)` when nothing ran.
pub fn run_folder_scoped(
    fs: &dyn FileSystem,
    registry: &HandlerRegistry,
    root: &Path,
    descriptor: &ResourceDescriptor,
    conventions: &Conventions,
    ctx: &mut RequestContext,
) -> Result<bool, ResolveError> {
    let middleware_file = descriptor.directory.join(conventions.middleware_file());
    let present = fs
        .is_file(&middleware_file)
        .map_err(|e| ResolveError::io(&middleware_file, e))?;
    if !present {
        return Ok(false);
    }

    let Some(hook) = registry.folder_hook(&descriptor.relative_dir(root)) else {
        return Ok(false);
    };

    let body_len = ctx.response().body.len();
    hook(ctx);
    if !ctx.is_sent() {
        ctx.truncate_body(body_len);
    }
    Ok(true)
}

/// Run the handler file's own init hook, if it has one
pub fn run_file_scoped(handlers: Option<&HandlerSet>, ctx: &mut RequestContext) -> bool {
    match handlers.and_then(HandlerSet::init_hook) {
        Some(hook) => {
            hook(ctx);
            true
        }
        None => false,
    }
}
