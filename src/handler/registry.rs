//! Handler registration
//!
//! Registrations are keyed by paths relative to the rule target, exactly as
//! the files appear in the tree: `users/[id].rs` for a handler file, `users`
//! for the folder whose `_middleware` file carries a folder hook.

use super::{Handler, HandlerSet};
use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::fs::{EntryKind, FileSystem};
use crate::logger;
use crate::resolver::Conventions;
use crate::rule::Rule;
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Handlers and folder hooks for one rule
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    routes: HashMap<PathBuf, HandlerSet>,
    middleware: HashMap<PathBuf, FolderHook>,
}

#[derive(Clone)]
struct FolderHook(Handler);

impl std::fmt::Debug for FolderHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FolderHook")
    }
}

/// Mismatches between registrations and the files on disk
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Verification {
    /// Handler files with no registration (they answer 405)
    pub unregistered: Vec<PathBuf>,
    /// Registrations whose handler file does not exist
    pub missing_files: Vec<PathBuf>,
    /// Folder hooks whose folder has no middleware file
    pub orphan_hooks: Vec<PathBuf>,
}

impl Verification {
    pub fn is_clean(&self) -> bool {
        self.unregistered.is_empty() && self.missing_files.is_empty() && self.orphan_hooks.is_empty()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handlers of the file at `path` (relative to the target)
    #[must_use]
    pub fn route(mut self, path: impl AsRef<Path>, handlers: HandlerSet) -> Self {
        self.routes.insert(normalize(path.as_ref()), handlers);
        self
    }

    /// Register the folder-scoped init hook of `dir` (relative; `""` is the root)
    #[must_use]
    pub fn middleware(
        mut self,
        dir: impl AsRef<Path>,
        hook: impl Fn(&mut RequestContext) + Send + Sync + 'static,
    ) -> Self {
        self.middleware
            .insert(normalize(dir.as_ref()), FolderHook(Arc::new(hook)));
        self
    }

    pub fn handlers(&self, relative_file: &Path) -> Option<&HandlerSet> {
        self.routes.get(&normalize(relative_file))
    }

    pub fn folder_hook(&self, relative_dir: &Path) -> Option<&Handler> {
        self.middleware
            .get(&normalize(relative_dir))
            .map(|hook| &hook.0)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.middleware.is_empty()
    }

    /// Compare the registrations with the handler files under `rule`'s target
    ///
    /// Runs once at startup; every finding is also logged as a warning.
    pub fn verify(
        &self,
        fs: &dyn FileSystem,
        rule: &Rule,
        conventions: &Conventions,
    ) -> Result<Verification, ResolveError> {
        let root = rule.target();
        let mut handler_files = BTreeSet::new();
        let mut middleware_dirs = BTreeSet::new();

        if fs
            .is_dir(root)
            .map_err(|e| ResolveError::io(root, e))?
        {
            let middleware_file = conventions.middleware_file();
            crate::fs::walk(fs, root, |dir, entries| {
                let rel = dir
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                for entry in entries.iter().filter(|e| e.kind == EntryKind::File) {
                    if entry.name == middleware_file {
                        middleware_dirs.insert(rel.clone());
                    } else if conventions.is_handler_file(&entry.name) {
                        handler_files.insert(rel.join(&entry.name));
                    }
                }
            })?;
        }

        let mut report = Verification {
            unregistered: handler_files
                .iter()
                .filter(|f| !self.routes.contains_key(*f))
                .cloned()
                .collect(),
            missing_files: self
                .routes
                .keys()
                .filter(|f| !handler_files.contains(*f))
                .cloned()
                .collect(),
            orphan_hooks: self
                .middleware
                .keys()
                .filter(|d| !middleware_dirs.contains(*d))
                .cloned()
                .collect(),
        };
        report.missing_files.sort();
        report.orphan_hooks.sort();

        for file in &report.unregistered {
            logger::log_warning(&format!(
                "[{}] handler file '{}' has no registered handlers",
                rule.prefix(),
                file.display()
            ));
        }
        for file in &report.missing_files {
            logger::log_warning(&format!(
                "[{}] handlers registered for '{}' but the file does not exist",
                rule.prefix(),
                file.display()
            ));
        }
        for dir in &report.orphan_hooks {
            logger::log_warning(&format!(
                "[{}] folder hook for '{}' has no {} file and will never run",
                rule.prefix(),
                dir.display(),
                conventions.middleware_file()
            ));
        }

        Ok(report)
    }
}

/// Drop `.` and leading `/` so `./users`, `/users` and `users` share a key
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use crate::rule::RuleType;

    fn api_rule() -> Rule {
        Rule::new("/api")
            .rule_type(RuleType::Api)
            .target("routes")
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookup_normalizes_paths() {
        let registry = HandlerRegistry::new()
            .route("./users/[id].rs", HandlerSet::new().get(|_| {}))
            .middleware("", |_| {});

        assert!(registry.handlers(Path::new("users/[id].rs")).is_some());
        assert!(registry.handlers(Path::new("/users/[id].rs")).is_some());
        assert!(registry.handlers(Path::new("users/index.rs")).is_none());
        assert!(registry.folder_hook(Path::new("")).is_some());
        assert!(registry.folder_hook(Path::new(".")).is_some());
        assert!(registry.folder_hook(Path::new("users")).is_none());
    }

    #[test]
    fn test_verify_clean() {
        let fs = MemoryFileSystem::new()
            .with_file("routes/index.rs", "")
            .with_file("routes/_middleware.rs", "")
            .with_file("routes/users/[id].rs", "")
            .with_file("routes/users/readme.txt", "");
        let registry = HandlerRegistry::new()
            .route("index.rs", HandlerSet::new().get(|_| {}))
            .route("users/[id].rs", HandlerSet::new().get(|_| {}))
            .middleware("", |_| {});

        let report = registry
            .verify(&fs, &api_rule(), &Conventions::default())
            .unwrap();
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn test_verify_reports_mismatches() {
        let fs = MemoryFileSystem::new()
            .with_file("routes/index.rs", "")
            .with_file("routes/users/[id].rs", "");
        let registry = HandlerRegistry::new()
            .route("index.rs", HandlerSet::new().get(|_| {}))
            .route("posts.rs", HandlerSet::new().get(|_| {}))
            .middleware("users", |_| {});

        let report = registry
            .verify(&fs, &api_rule(), &Conventions::default())
            .unwrap();
        assert_eq!(report.unregistered, [PathBuf::from("users/[id].rs")]);
        assert_eq!(report.missing_files, [PathBuf::from("posts.rs")]);
        assert_eq!(report.orphan_hooks, [PathBuf::from("users")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_verify_survives_symlink_loop() {
        let dir = tempfile::tempdir().unwrap();
        let routes = dir.path().join("routes");
        std::fs::create_dir_all(routes.join("users")).unwrap();
        std::fs::write(routes.join("users/[id].rs"), "").unwrap();
        std::os::unix::fs::symlink("..", routes.join("users/back")).unwrap();

        let rule = Rule::new("/api")
            .rule_type(RuleType::Api)
            .target(&routes)
            .build()
            .unwrap();
        let registry =
            HandlerRegistry::new().route("users/[id].rs", HandlerSet::new().get(|_| {}));
        let report = registry
            .verify(&crate::fs::OsFileSystem, &rule, &Conventions::default())
            .unwrap();
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn test_verify_missing_target() {
        let fs = MemoryFileSystem::new();
        let registry = HandlerRegistry::new().route("index.rs", HandlerSet::new());
        let report = registry
            .verify(&fs, &api_rule(), &Conventions::default())
            .unwrap();
        assert_eq!(report.missing_files, [PathBuf::from("index.rs")]);
    }
}
