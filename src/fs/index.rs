//! Startup snapshot of the route trees
//!
//! Walks every rule target once and keeps, per directory, its literal
//! children plus the dynamic file/directory patterns, so resolving a
//! segment never lists a directory at request time. File contents are
//! still read through the source filesystem.

use super::{DirEntry, DynamicEntries, EntryKind, FileSystem};
use crate::error::ResolveError;
use crate::logger;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
struct DirIndex {
    entries: Vec<DirEntry>,
    files: HashSet<String>,
    dynamic: DynamicEntries,
}

/// Immutable directory structure captured at startup
pub struct TreeIndex {
    source: Arc<dyn FileSystem>,
    handler_ext: String,
    dirs: HashMap<PathBuf, DirIndex>,
    root_files: HashSet<PathBuf>,
}

impl std::fmt::Debug for TreeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeIndex")
            .field("handler_ext", &self.handler_ext)
            .field("dirs", &self.dirs.len())
            .field("root_files", &self.root_files.len())
            .finish_non_exhaustive()
    }
}

impl TreeIndex {
    /// Scan each root (directory or single file) through `source`
    ///
    /// Missing roots are logged and skipped; any other I/O fault aborts.
    pub fn scan<I, P>(
        source: Arc<dyn FileSystem>,
        roots: I,
        handler_ext: &str,
    ) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut index = Self {
            source,
            handler_ext: handler_ext.to_string(),
            dirs: HashMap::new(),
            root_files: HashSet::new(),
        };

        for root in roots {
            let root = root.as_ref();
            let kind = index
                .source
                .entry_kind(root)
                .map_err(|e| ResolveError::io(root, e))?;
            match kind {
                Some(EntryKind::Dir) if index.dirs.contains_key(root) => {}
                Some(EntryKind::Dir) => index.scan_dir(root)?,
                Some(EntryKind::File) => {
                    index.root_files.insert(root.to_path_buf());
                }
                None => logger::log_warning(&format!(
                    "Route target '{}' does not exist",
                    root.display()
                )),
            }
        }

        Ok(index)
    }

    fn scan_dir(&mut self, root: &Path) -> Result<(), ResolveError> {
        let source = Arc::clone(&self.source);
        let handler_ext = self.handler_ext.clone();

        super::walk(&*source, root, |dir, entries| {
            let dynamic = DynamicEntries::from_entries(entries, &handler_ext);
            for shadowed in &dynamic.shadowed {
                logger::log_warning(&format!(
                    "'{}' is shadowed by another dynamic entry in '{}'",
                    shadowed,
                    dir.display()
                ));
            }

            let node = DirIndex {
                entries: entries.to_vec(),
                files: entries
                    .iter()
                    .filter(|e| e.kind == EntryKind::File)
                    .map(|e| e.name.clone())
                    .collect(),
                dynamic,
            };
            self.dirs.insert(dir.to_path_buf(), node);
        })
    }

    /// Number of indexed directories
    pub fn dir_count(&self) -> usize {
        self.dirs.len()
    }

    /// Every indexed file, as full paths
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.dirs
            .iter()
            .flat_map(|(dir, node)| node.files.iter().map(move |f| dir.join(f)))
            .chain(self.root_files.iter().cloned())
    }
}

impl FileSystem for TreeIndex {
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        if self.dirs.contains_key(path) {
            return Ok(Some(EntryKind::Dir));
        }
        if self.root_files.contains(path) {
            return Ok(Some(EntryKind::File));
        }

        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return Ok(None);
        };
        let Some(name) = name.to_str() else {
            return Ok(None);
        };

        Ok(self
            .dirs
            .get(parent)
            .filter(|node| node.files.contains(name))
            .map(|_| EntryKind::File))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.dirs
            .get(path)
            .map(|node| node.entries.clone())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} is not an indexed directory", path.display()),
                )
            })
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.source.read(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.source.canonicalize(path)
    }

    fn dynamic_entries(&self, dir: &Path, handler_ext: &str) -> io::Result<DynamicEntries> {
        let Some(node) = self.dirs.get(dir) else {
            return Ok(DynamicEntries::default());
        };
        if handler_ext == self.handler_ext {
            Ok(node.dynamic.clone())
        } else {
            Ok(DynamicEntries::from_entries(&node.entries, handler_ext))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn source() -> Arc<MemoryFileSystem> {
        Arc::new(
            MemoryFileSystem::new()
                .with_file("api/index.rs", "")
                .with_file("api/users/[id].rs", "")
                .with_file("api/orgs/[org]/members.rs", "")
                .with_file("public/app.html", "<html></html>")
                .with_file("other/unrelated.txt", ""),
        )
    }

    #[test]
    fn test_scan_indexes_roots_only() {
        let index = TreeIndex::scan(source(), ["api", "public/app.html"], "rs").unwrap();

        assert!(index.is_dir(Path::new("api/orgs/[org]")).unwrap());
        assert!(index.is_file(Path::new("api/users/[id].rs")).unwrap());
        assert!(index.is_file(Path::new("public/app.html")).unwrap());
        assert!(!index.is_file(Path::new("other/unrelated.txt")).unwrap());
        assert_eq!(index.dir_count(), 4);
    }

    #[test]
    fn test_no_listing_after_scan() {
        let fs = source();
        let index = TreeIndex::scan(fs.clone(), ["api"], "rs").unwrap();
        let calls = fs.calls();

        let dynamic = index
            .dynamic_entries(Path::new("api/users"), "rs")
            .unwrap();
        assert_eq!(dynamic.file.unwrap().param, "id");
        assert!(index.is_dir(Path::new("api/orgs")).unwrap());
        assert_eq!(fs.calls(), calls);
    }

    #[test]
    fn test_read_goes_to_source() {
        let index = TreeIndex::scan(source(), ["public/app.html"], "rs").unwrap();
        assert_eq!(
            index.read(Path::new("public/app.html")).unwrap(),
            b"<html></html>"
        );
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let index = TreeIndex::scan(source(), ["nowhere", "api"], "rs").unwrap();
        assert!(index.is_dir(Path::new("api")).unwrap());
        assert!(!index.is_dir(Path::new("nowhere")).unwrap());
    }

    #[test]
    fn test_scan_fault_propagates() {
        let fs = Arc::new(
            MemoryFileSystem::new()
                .with_file("api/private/a.rs", "")
                .with_denied("api/private"),
        );
        let result = TreeIndex::scan(fs, ["api"], "rs");
        assert!(matches!(result, Err(ResolveError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_does_not_abort_scan() {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path().join("site");
        std::fs::create_dir_all(&site).unwrap();
        std::fs::write(site.join("index.html"), "home").unwrap();
        std::os::unix::fs::symlink(".", site.join("a")).unwrap();
        std::os::unix::fs::symlink(".", site.join("b")).unwrap();

        let index = TreeIndex::scan(Arc::new(crate::fs::OsFileSystem), [&site], "rs").unwrap();
        assert_eq!(index.dir_count(), 1);
        assert!(index.is_file(&site.join("index.html")).unwrap());
        assert!(!index.is_dir(&site.join("a")).unwrap());
    }

    #[test]
    fn test_files_listing() {
        let index = TreeIndex::scan(source(), ["api"], "rs").unwrap();
        let mut files: Vec<PathBuf> = index.files().collect();
        files.sort();
        assert_eq!(
            files,
            vec![
                PathBuf::from("api/index.rs"),
                PathBuf::from("api/orgs/[org]/members.rs"),
                PathBuf::from("api/users/[id].rs"),
            ]
        );
    }
}
