//! Rule table
//!
//! Maps a request path to the rule whose prefix claims it. Prefixes match
//! on segment boundaries only, and the longest one wins.

use crate::context::split_segments;
use crate::error::ConfigError;
use crate::handler::HandlerRegistry;
use crate::rule::Rule;
use std::sync::Arc;

/// A rule together with the handlers registered for its tree
#[derive(Debug, Clone)]
pub struct Route {
    pub rule: Rule,
    pub handlers: HandlerRegistry,
}

impl Route {
    pub fn new(rule: Rule, handlers: HandlerRegistry) -> Self {
        Self { rule, handlers }
    }
}

/// Registered routes, immutable once the server starts
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route; each prefix may appear only once
    pub fn add(&mut self, route: Route) -> Result<(), ConfigError> {
        let prefix = route.rule.prefix();
        if self.routes.iter().any(|r| r.rule.prefix() == prefix) {
            return Err(ConfigError::DuplicatePrefix(prefix.to_string()));
        }
        self.routes.push(Arc::new(route));
        Ok(())
    }

    /// Route claiming `path`, plus the path segments left after its prefix
    pub fn find(&self, path: &str) -> Option<(&Arc<Route>, Vec<String>)> {
        self.routes
            .iter()
            .filter(|r| prefix_matches(r.rule.prefix(), path))
            .max_by_key(|r| r.rule.prefix().len())
            .map(|r| (r, split_segments(path, r.rule.prefix())))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// `/api` matches `/api` and `/api/x`, never `/apix`
fn prefix_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleType;

    fn route(prefix: &str) -> Route {
        let rule = Rule::new(prefix)
            .rule_type(RuleType::Static)
            .target("site")
            .build()
            .unwrap();
        Route::new(rule, HandlerRegistry::new())
    }

    fn table(prefixes: &[&str]) -> RouteTable {
        let mut table = RouteTable::new();
        for prefix in prefixes {
            table.add(route(prefix)).unwrap();
        }
        table
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = table(&["/", "/api", "/api/v2"]);

        let (route, segments) = table.find("/api/v2/users").unwrap();
        assert_eq!(route.rule.prefix(), "/api/v2");
        assert_eq!(segments, ["users"]);

        let (route, segments) = table.find("/api/v1/users").unwrap();
        assert_eq!(route.rule.prefix(), "/api");
        assert_eq!(segments, ["v1", "users"]);

        let (route, _) = table.find("/about").unwrap();
        assert_eq!(route.rule.prefix(), "/");
    }

    #[test]
    fn test_segment_boundary() {
        let table = table(&["/api"]);
        assert!(table.find("/apix").is_none());
        assert!(table.find("/api").is_some());
        assert!(table.find("/api/").is_some());
    }

    #[test]
    fn test_duplicate_prefix_rejected() {
        let mut table = table(&["/api"]);
        let err = table.add(route("api/")).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePrefix(p) if p == "/api"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_table() {
        let table = RouteTable::new();
        assert!(table.is_empty());
        assert!(table.find("/").is_none());
    }
}
