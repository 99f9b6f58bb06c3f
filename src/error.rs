//! Error types
//!
//! Configuration problems surface once, while rules are being registered.
//! Resolution only fails for filesystem faults; a missing resource is an
//! outcome, not an error.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Raised while building rules or loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rule '{prefix}' has no rule type")]
    MissingRuleType { prefix: String },

    #[error("rule '{prefix}' has no target")]
    MissingTarget { prefix: String },

    #[error("unknown rule type '{0}' (expected api, static, redirect or sticky)")]
    UnknownRuleType(String),

    #[error("unknown content type '{0}'")]
    UnknownContentType(String),

    #[error("prefix '{0}' is registered twice")]
    DuplicatePrefix(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to index route trees: {0}")]
    Index(#[from] ResolveError),
}

/// Filesystem fault hit while walking a route tree
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("I/O error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::MissingRuleType {
            prefix: "/api".to_string(),
        };
        assert_eq!(err.to_string(), "rule '/api' has no rule type");

        let err = ConfigError::UnknownRuleType("proxy".to_string());
        assert!(err.to_string().contains("proxy"));
    }

    #[test]
    fn test_resolve_error_keeps_path() {
        let err = ResolveError::io(
            "/srv/api",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/srv/api"));
        assert!(msg.contains("denied"));
    }
}
