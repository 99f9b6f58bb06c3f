//! Path resolution
//!
//! Walks the request's path segments against a rule's directory tree and
//! picks the file that serves the request, capturing `[param]` segments on
//! the way.

use crate::error::ResolveError;
use crate::fs::FileSystem;
use crate::logger;
use crate::rule::{Rule, RuleType};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Segments longer than this never match (keeps OS name limits out of play)
const MAX_SEGMENT_LEN: usize = 200;

/// File naming conventions of a route tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    /// Extension marking a dynamic handler file
    pub handler_ext: String,
    /// Extension of static pages reachable without their extension
    pub page_ext: String,
    pub index_stem: String,
    pub middleware_stem: String,
    /// Served with 404 by STATIC and STICKY rules
    pub not_found_page: String,
    /// Served with 404 by API rules
    pub not_found_json: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self::with_handler_ext("rs")
    }
}

impl Conventions {
    pub fn with_handler_ext(handler_ext: &str) -> Self {
        Self {
            handler_ext: handler_ext.trim_start_matches('.').to_string(),
            page_ext: "html".to_string(),
            index_stem: "index".to_string(),
            middleware_stem: "_middleware".to_string(),
            not_found_page: "404.html".to_string(),
            not_found_json: "404.json".to_string(),
        }
    }

    pub fn handler_file(&self, stem: &str) -> String {
        format!("{stem}.{}", self.handler_ext)
    }

    pub fn page_file(&self, stem: &str) -> String {
        format!("{stem}.{}", self.page_ext)
    }

    pub fn index_handler(&self) -> String {
        self.handler_file(&self.index_stem)
    }

    pub fn index_page(&self) -> String {
        self.page_file(&self.index_stem)
    }

    pub fn middleware_file(&self) -> String {
        self.handler_file(&self.middleware_stem)
    }

    /// Extension compared case-insensitively, like MIME lookup
    pub fn is_handler_file(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.handler_ext))
    }

    pub fn is_index_file(&self, name: &str) -> bool {
        name == self.index_handler() || name == self.index_page()
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Directory holding the file, including the rule target
    pub directory: PathBuf,
    /// File name inside `directory`
    pub file: String,
    /// Values captured by `[param]` entries
    pub params: HashMap<String, String>,
}

impl ResourceDescriptor {
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file)
    }

    /// `directory` relative to `root`
    pub fn relative_dir(&self, root: &Path) -> PathBuf {
        self.directory
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Path segments this resource stands for beneath `root`
    ///
    /// Each descended directory counts once; the file counts once unless it
    /// is an index file, which stands for its directory.
    pub fn consumed_segments(&self, root: &Path, conventions: &Conventions) -> usize {
        let dirs = self.relative_dir(root).components().count();
        if conventions.is_index_file(&self.file) {
            dirs
        } else {
            dirs + 1
        }
    }
}

/// Resolve `segments` against `rule`'s target
///
/// `Ok(None)` means not found. API rules additionally require the resource
/// to account for every segment (exact-match guard).
pub fn resolve(
    fs: &dyn FileSystem,
    rule: &Rule,
    segments: &[String],
    conventions: &Conventions,
) -> Result<Option<ResourceDescriptor>, ResolveError> {
    if let Some(bad) = segments.iter().find(|s| !is_safe_segment(s)) {
        logger::log_debug(&format!("Rejecting unsafe path segment '{bad}'"));
        return Ok(None);
    }

    let root = rule.target();
    let is_api = rule.rule_type() == RuleType::Api;
    let mut cursor = root.to_path_buf();
    let mut file: Option<String> = None;
    let mut params = HashMap::new();

    for (idx, segment) in segments.iter().enumerate() {
        let is_last = idx + 1 == segments.len();
        let candidate = cursor.join(segment);

        if is_dir(fs, &candidate)? {
            cursor = candidate;
            continue;
        }

        let handler = conventions.handler_file(segment);
        if is_file(fs, &cursor.join(&handler))? {
            file = Some(handler);
            break;
        }
        let page = conventions.page_file(segment);
        if is_file(fs, &cursor.join(&page))? {
            file = Some(page);
            break;
        }

        // An index absorbing a segment could never pass the API guard, so
        // API rules let literal and dynamic entries match first.
        let index = conventions.index_handler();
        if !is_api && is_file(fs, &cursor.join(&index))? {
            file = Some(index);
            break;
        }

        if is_file(fs, &candidate)? {
            file = Some(segment.clone());
            break;
        }

        let dynamic = fs
            .dynamic_entries(&cursor, &conventions.handler_ext)
            .map_err(|e| ResolveError::io(&cursor, e))?;

        // a dynamic file is terminal: it only binds the last segment
        if is_last {
            if let Some(dyn_file) = dynamic.file {
                params.insert(dyn_file.param, segment.clone());
                file = Some(dyn_file.entry);
                break;
            }
        }
        if let Some(dyn_dir) = dynamic.dir {
            params.insert(dyn_dir.param, segment.clone());
            cursor = cursor.join(dyn_dir.entry);
            continue;
        }

        // nothing under the cursor answers to this segment
        return Ok(None);
    }

    if file.is_none() {
        for index in [conventions.index_page(), conventions.index_handler()] {
            if is_file(fs, &cursor.join(&index))? {
                file = Some(index);
                break;
            }
        }
    }

    let Some(file) = file else {
        return Ok(None);
    };

    let descriptor = ResourceDescriptor {
        directory: cursor,
        file,
        params,
    };

    if is_api {
        let consumed = descriptor.consumed_segments(root, conventions);
        if consumed != segments.len() {
            logger::log_debug(&format!(
                "Exact-match guard rejected '{}': {consumed} of {} segments consumed",
                descriptor.path().display(),
                segments.len()
            ));
            return Ok(None);
        }
    }

    Ok(Some(descriptor))
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment.len() <= MAX_SEGMENT_LEN
        && !segment.contains(['/', '\\', '\0'])
}

fn is_dir(fs: &dyn FileSystem, path: &Path) -> Result<bool, ResolveError> {
    fs.is_dir(path).map_err(|e| ResolveError::io(path, e))
}

fn is_file(fs: &dyn FileSystem, path: &Path) -> Result<bool, ResolveError> {
    fs.is_file(path).map_err(|e| ResolveError::io(path, e))
}
