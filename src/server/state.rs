// Application state module
// Everything a request needs, built once at startup and shared read-only

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::ConfigError;
use crate::fs::{FileSystem, OsFileSystem, TreeIndex};
use crate::handler::HandlerRegistry;
use crate::logger;
use crate::resolver::Conventions;
use crate::routing::{Route, RouteTable};
use crate::rule::{normalize_prefix, RuleType};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub routes: RouteTable,
    pub dispatcher: Dispatcher,
    /// Currently open connections
    pub active_connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: Config, routes: RouteTable, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            routes,
            dispatcher,
            active_connections: AtomicUsize::new(0),
        }
    }

    /// Build rules from `config`, attach `registries` (keyed by rule prefix)
    /// and prepare the filesystem view
    ///
    /// With `routing.snapshot` the route trees are indexed here; registrations
    /// are then checked against the trees and mismatches logged.
    pub fn from_config(
        config: Config,
        registries: HashMap<String, HandlerRegistry>,
    ) -> Result<Self, ConfigError> {
        let conventions = Conventions::with_handler_ext(&config.routing.handler_extension);
        let mut registries: HashMap<String, HandlerRegistry> = registries
            .into_iter()
            .map(|(prefix, registry)| (normalize_prefix(&prefix), registry))
            .collect();

        let mut routes = RouteTable::new();
        for rule in config.build_rules()? {
            let handlers = registries.remove(rule.prefix()).unwrap_or_default();
            logger::log_rule_registered(&rule);
            routes.add(Route::new(rule, handlers))?;
        }
        for prefix in registries.keys() {
            logger::log_warning(&format!("Handlers registered for '{prefix}' but no rule has that prefix"));
        }

        let source: Arc<dyn FileSystem> = Arc::new(OsFileSystem);
        let fs: Arc<dyn FileSystem> = if config.routing.snapshot {
            let roots = snapshot_roots(&routes, &*source, &conventions);
            let index = TreeIndex::scan(Arc::clone(&source), roots, &conventions.handler_ext)?;
            logger::log_info(&format!(
                "Indexed {} route directories, {} files",
                index.dir_count(),
                index.files().count()
            ));
            Arc::new(index)
        } else {
            source
        };

        for route in routes.iter() {
            if route.rule.rule_type() == RuleType::Api && route.handlers.is_empty() {
                logger::log_warning(&format!(
                    "[{}] no handlers registered, its handler files answer 405",
                    route.rule.prefix()
                ));
            }
            if matches!(route.rule.rule_type(), RuleType::Api | RuleType::Static) {
                route.handlers.verify(&*fs, &route.rule, &conventions)?;
            }
        }

        let dispatcher = Dispatcher::new(fs, conventions);
        Ok(Self::new(config, routes, dispatcher))
    }

    /// Number of routes that carry handler registrations
    pub fn registered_routes(&self) -> usize {
        self.routes.iter().filter(|r| !r.handlers.is_empty()).count()
    }
}

/// Paths the startup snapshot has to cover
fn snapshot_roots(routes: &RouteTable, fs: &dyn FileSystem, conventions: &Conventions) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    for route in routes.iter() {
        let target = route.rule.target();
        match route.rule.rule_type() {
            RuleType::Api | RuleType::Static => roots.push(target.to_path_buf()),
            RuleType::Sticky => {
                roots.push(target.to_path_buf());
                let page = target
                    .parent()
                    .map(|dir| dir.join(&conventions.not_found_page));
                if let Some(page) = page.filter(|p| fs.is_file(p).unwrap_or(false)) {
                    roots.push(page);
                }
            }
            RuleType::Redirect => {}
        }
    }
    roots
}
