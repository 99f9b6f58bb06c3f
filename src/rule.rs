//! Route rule declarations
//!
//! A [`Rule`] maps a URL prefix to a filesystem target and a serving
//! strategy. Rules are assembled with [`RuleBuilder`] and never change
//! after registration.

use crate::error::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Serving strategy selected for a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Dynamic handler dispatch
    Api,
    /// Assets served out of a directory tree
    Static,
    /// Fixed 301 to the target
    Redirect,
    /// A single fixed file for every path
    Sticky,
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "API"),
            Self::Static => write!(f, "STATIC"),
            Self::Redirect => write!(f, "REDIRECT"),
            Self::Sticky => write!(f, "STICKY"),
        }
    }
}

impl FromStr for RuleType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "static" => Ok(Self::Static),
            "redirect" => Ok(Self::Redirect),
            "sticky" => Ok(Self::Sticky),
            _ => Err(ConfigError::UnknownRuleType(s.to_string())),
        }
    }
}

/// Content types a rule advertises through the `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Json,
    Html,
    PlainText,
    Xml,
    FormUrlEncoded,
    MultipartFormData,
    OctetStream,
    Css,
    Javascript,
    Csv,
    Pdf,
}

impl ContentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Html => "text/html",
            Self::PlainText => "text/plain",
            Self::Xml => "application/xml",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::MultipartFormData => "multipart/form-data",
            Self::OctetStream => "application/octet-stream",
            Self::Css => "text/css",
            Self::Javascript => "text/javascript",
            Self::Csv => "text/csv",
            Self::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ContentType {
    type Err = ConfigError;

    /// Accepts either the full MIME string or a short alias
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "application/json" => Ok(Self::Json),
            "html" | "text/html" => Ok(Self::Html),
            "text" | "txt" | "text/plain" => Ok(Self::PlainText),
            "xml" | "application/xml" | "text/xml" => Ok(Self::Xml),
            "form" | "application/x-www-form-urlencoded" => Ok(Self::FormUrlEncoded),
            "multipart" | "multipart/form-data" => Ok(Self::MultipartFormData),
            "binary" | "application/octet-stream" => Ok(Self::OctetStream),
            "css" | "text/css" => Ok(Self::Css),
            "js" | "javascript" | "text/javascript" | "application/javascript" => {
                Ok(Self::Javascript)
            }
            "csv" | "text/csv" => Ok(Self::Csv),
            "pdf" | "application/pdf" => Ok(Self::Pdf),
            _ => Err(ConfigError::UnknownContentType(s.to_string())),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered route declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    prefix: String,
    target: PathBuf,
    rule_type: RuleType,
    accepted_content_types: Vec<ContentType>,
}

impl Rule {
    /// Start building a rule for the given URL prefix
    #[allow(clippy::new_ret_no_self)]
    pub fn new(prefix: impl Into<String>) -> RuleBuilder {
        RuleBuilder {
            prefix: normalize_prefix(&prefix.into()),
            target: None,
            rule_type: None,
            accepted_content_types: vec![ContentType::Json],
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Root directory (API/STATIC), file (STICKY) or URL (REDIRECT)
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub const fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn accepted_content_types(&self) -> &[ContentType] {
        &self.accepted_content_types
    }

    /// Value of the `Accept` response header: deduplicated, in declaration order
    pub fn accept_header(&self) -> String {
        let mut seen: Vec<&'static str> = Vec::with_capacity(self.accepted_content_types.len());
        for ct in &self.accepted_content_types {
            let value = ct.as_str();
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        seen.join(",")
    }
}

/// Fluent builder for [`Rule`]
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    prefix: String,
    target: Option<PathBuf>,
    rule_type: Option<RuleType>,
    accepted_content_types: Vec<ContentType>,
}

impl RuleBuilder {
    pub fn accepted_content_types(mut self, types: impl IntoIterator<Item = ContentType>) -> Self {
        self.accepted_content_types = types.into_iter().collect();
        self
    }

    pub const fn rule_type(mut self, rule_type: RuleType) -> Self {
        self.rule_type = Some(rule_type);
        self
    }

    /// Set the rule type from an optional value, failing when it is absent
    pub fn try_rule_type(self, rule_type: Option<RuleType>) -> Result<Self, ConfigError> {
        match rule_type {
            Some(rt) => Ok(self.rule_type(rt)),
            None => Err(ConfigError::MissingRuleType {
                prefix: self.prefix,
            }),
        }
    }

    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn build(self) -> Result<Rule, ConfigError> {
        let Some(rule_type) = self.rule_type else {
            return Err(ConfigError::MissingRuleType {
                prefix: self.prefix,
            });
        };
        let Some(target) = self.target else {
            return Err(ConfigError::MissingTarget {
                prefix: self.prefix,
            });
        };

        Ok(Rule {
            prefix: self.prefix,
            target,
            rule_type,
            accepted_content_types: self.accepted_content_types,
        })
    }
}

/// Leading slash, no trailing slash; the root prefix is "/"
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    format!("/{trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rule() {
        let rule = Rule::new("/api")
            .rule_type(RuleType::Api)
            .target("routes/api")
            .accepted_content_types([ContentType::Json, ContentType::FormUrlEncoded])
            .build()
            .unwrap();

        assert_eq!(rule.prefix(), "/api");
        assert_eq!(rule.target(), Path::new("routes/api"));
        assert_eq!(rule.rule_type(), RuleType::Api);
        assert_eq!(rule.accepted_content_types().len(), 2);
    }

    #[test]
    fn test_missing_rule_type_fails() {
        let result = Rule::new("/api").target("routes/api").build();
        assert!(matches!(result, Err(ConfigError::MissingRuleType { prefix }) if prefix == "/api"));
    }

    #[test]
    fn test_try_rule_type_none_fails() {
        let result = Rule::new("/docs").try_rule_type(None);
        assert!(matches!(result, Err(ConfigError::MissingRuleType { .. })));

        let rule = Rule::new("/docs")
            .try_rule_type(Some(RuleType::Static))
            .unwrap()
            .target("public")
            .build()
            .unwrap();
        assert_eq!(rule.rule_type(), RuleType::Static);
    }

    #[test]
    fn test_missing_target_fails() {
        let result = Rule::new("/old").rule_type(RuleType::Redirect).build();
        assert!(matches!(result, Err(ConfigError::MissingTarget { .. })));
    }

    #[test]
    fn test_prefix_normalized() {
        let build = |p: &str| {
            Rule::new(p)
                .rule_type(RuleType::Static)
                .target("public")
                .build()
                .unwrap()
        };
        assert_eq!(build("api/").prefix(), "/api");
        assert_eq!(build("/v1/users/").prefix(), "/v1/users");
        assert_eq!(build("").prefix(), "/");
        assert_eq!(build("/").prefix(), "/");
    }

    #[test]
    fn test_default_accepts_json() {
        let rule = Rule::new("/api")
            .rule_type(RuleType::Api)
            .target("routes")
            .build()
            .unwrap();
        assert_eq!(rule.accept_header(), "application/json");
    }

    #[test]
    fn test_accept_header_deduplicated() {
        let rule = Rule::new("/api")
            .rule_type(RuleType::Api)
            .target("routes")
            .accepted_content_types([
                ContentType::Json,
                ContentType::Html,
                ContentType::Json,
            ])
            .build()
            .unwrap();
        assert_eq!(rule.accept_header(), "application/json,text/html");
    }

    #[test]
    fn test_parse_rule_type() {
        assert_eq!("api".parse::<RuleType>().unwrap(), RuleType::Api);
        assert_eq!("STATIC".parse::<RuleType>().unwrap(), RuleType::Static);
        assert_eq!("Sticky".parse::<RuleType>().unwrap(), RuleType::Sticky);
        assert!("proxy".parse::<RuleType>().is_err());
    }

    #[test]
    fn test_parse_content_type() {
        assert_eq!("json".parse::<ContentType>().unwrap(), ContentType::Json);
        assert_eq!(
            "application/x-www-form-urlencoded".parse::<ContentType>().unwrap(),
            ContentType::FormUrlEncoded
        );
        assert!("image/x-unknown".parse::<ContentType>().is_err());
    }
}
