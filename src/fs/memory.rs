//! In-memory route tree, for tests and embedded trees

use super::{DirEntry, EntryKind, FileSystem};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// A mutable-at-setup, read-only-at-use tree of files
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<PathBuf, Node>,
    denied: BTreeSet<PathBuf>,
    calls: AtomicUsize,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, creating its parent directories
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.insert_dirs(parent);
        }
        self.nodes
            .insert(path.to_path_buf(), Node::File(contents.into()));
        self
    }

    /// Add an (empty) directory and its parents
    #[must_use]
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert_dirs(path.as_ref());
        self
    }

    /// Make every access to `path` fail with `PermissionDenied`
    #[must_use]
    pub fn with_denied(mut self, path: impl AsRef<Path>) -> Self {
        self.denied.insert(path.as_ref().to_path_buf());
        self
    }

    /// Number of filesystem calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn insert_dirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Dir);
        }
    }

    fn check(&self, path: &Path) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("access to {} denied", path.display()),
            ));
        }
        Ok(())
    }
}

impl FileSystem for MemoryFileSystem {
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        self.check(path)?;
        Ok(self.nodes.get(path).map(|node| match node {
            Node::File(_) => EntryKind::File,
            Node::Dir => EntryKind::Dir,
        }))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.check(path)?;
        match self.nodes.get(path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is not a directory", path.display()),
                ))
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} not found", path.display()),
                ))
            }
        }

        Ok(self
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_str()?.to_string();
                let kind = match node {
                    Node::File(_) => EntryKind::File,
                    Node::Dir => EntryKind::Dir,
                };
                Some(DirEntry { name, kind })
            })
            .collect())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.check(path)?;
        match self.nodes.get(path) {
            Some(Node::File(data)) => Ok(data.clone()),
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }
}
