// Configuration module entry point
// Loads the server settings and the rule declarations

mod types;

use crate::error::ConfigError;
use crate::rule::{ContentType, Rule, RuleType};
use std::net::SocketAddr;

pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, RoutingConfig, RuleConfig, ServerConfig,
};

/// Used when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Load configuration from the given file, the `SERVER_*` environment and defaults
    ///
    /// A missing file is not an error: defaults and the environment still apply.
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("routing.handler_extension", "rs")?
            .set_default("routing.snapshot", true)?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Turn the `[[rules]]` entries into validated rules
    pub fn build_rules(&self) -> Result<Vec<Rule>, ConfigError> {
        self.rules.iter().map(RuleConfig::build).collect()
    }
}

impl RuleConfig {
    pub fn build(&self) -> Result<Rule, ConfigError> {
        let rule_type = self
            .rule_type
            .as_deref()
            .map(str::parse::<RuleType>)
            .transpose()?;

        let mut builder = Rule::new(self.prefix.as_str()).try_rule_type(rule_type)?;
        if let Some(types) = &self.accepted_content_types {
            let parsed = types
                .iter()
                .map(|t| t.parse::<ContentType>())
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.accepted_content_types(parsed);
        }
        if let Some(target) = &self.target {
            builder = builder.target(target);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fsroute.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let path = path.to_str().unwrap().to_string();
        (dir, path)
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load_from("/nonexistent/fsroute-config").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.routing.handler_extension, "rs");
        assert!(config.routing.snapshot);
        assert_eq!(config.http.max_body_size, 10_485_760);
        assert_eq!(config.logging.access_log_format, "combined");
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_rules_from_file() {
        let (_dir, path) = write_config(
            r#"
[server]
port = 9000

[[rules]]
prefix = "/api"
target = "routes/api"
type = "api"
accepted_content_types = ["json", "application/json", "html"]

[[rules]]
prefix = "/old"
target = "https://example.com/new"
type = "REDIRECT"
"#,
        );
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");

        let rules = config.build_rules().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].rule_type(), RuleType::Api);
        assert_eq!(rules[0].accept_header(), "application/json,text/html");
        assert_eq!(rules[1].rule_type(), RuleType::Redirect);
        assert_eq!(rules[1].accepted_content_types(), [ContentType::Json]);
    }

    #[test]
    fn test_rule_without_type() {
        let entry = RuleConfig {
            prefix: "/x".into(),
            target: Some("x".into()),
            rule_type: None,
            accepted_content_types: None,
        };
        assert!(matches!(
            entry.build(),
            Err(ConfigError::MissingRuleType { prefix }) if prefix == "/x"
        ));
    }

    #[test]
    fn test_rule_with_bad_values() {
        let mut entry = RuleConfig {
            prefix: "/x".into(),
            target: Some("x".into()),
            rule_type: Some("proxy".into()),
            accepted_content_types: None,
        };
        assert!(matches!(entry.build(), Err(ConfigError::UnknownRuleType(_))));

        entry.rule_type = Some("static".into());
        entry.accepted_content_types = Some(vec!["image/gif".into()]);
        assert!(matches!(entry.build(), Err(ConfigError::UnknownContentType(_))));

        entry.accepted_content_types = None;
        entry.target = None;
        assert!(matches!(entry.build(), Err(ConfigError::MissingTarget { .. })));
    }

    #[test]
    fn test_socket_addr() {
        let mut config = Config::load_from("/nonexistent/fsroute-config").unwrap();
        assert_eq!(config.get_socket_addr().unwrap().port(), 8080);
        config.server.host = "not a host".into();
        assert!(config.get_socket_addr().is_err());
    }
}
