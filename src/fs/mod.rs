//! Filesystem capability
//!
//! The resolver only ever asks three questions: what kind of entry lives at
//! a path, what a directory contains, and what a file holds. Keeping them
//! behind [`FileSystem`] lets the same resolution run against the live disk,
//! a startup snapshot ([`TreeIndex`]) or an in-memory tree in tests.

mod index;
mod memory;
mod os;

pub use index::TreeIndex;
pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

use crate::error::ResolveError;
use crate::logger;
use std::io;
use std::path::{Path, PathBuf};

/// Deepest directory nesting followed by [`walk`]
pub const MAX_DEPTH: usize = 64;

/// Kind of a filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One child of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A bracket-named entry and the parameter it binds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicName {
    /// Entry name on disk, e.g. `[id].rs` or `[slug]`
    pub entry: String,
    /// Parameter name, e.g. `id`
    pub param: String,
}

/// Dynamic children of a single directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicEntries {
    /// `[name].<handler-ext>` file
    pub file: Option<DynamicName>,
    /// `[name]` directory
    pub dir: Option<DynamicName>,
    /// Extra bracket entries that lost to the first one in lexical order
    pub shadowed: Vec<String>,
}

impl DynamicEntries {
    /// Classify the bracket-named entries of a directory listing
    ///
    /// Entries are considered in lexical order; the first dynamic file and
    /// the first dynamic directory win.
    pub fn from_entries(entries: &[DirEntry], handler_ext: &str) -> Self {
        let mut sorted: Vec<&DirEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));

        let mut dynamic = Self::default();
        for entry in sorted {
            match entry.kind {
                EntryKind::File => {
                    if let Some(param) = dynamic_file_param(&entry.name, handler_ext) {
                        if dynamic.file.is_none() {
                            dynamic.file = Some(DynamicName {
                                entry: entry.name.clone(),
                                param: param.to_string(),
                            });
                        } else {
                            dynamic.shadowed.push(entry.name.clone());
                        }
                    }
                }
                EntryKind::Dir => {
                    if let Some(param) = dynamic_dir_param(&entry.name) {
                        if dynamic.dir.is_none() {
                            dynamic.dir = Some(DynamicName {
                                entry: entry.name.clone(),
                                param: param.to_string(),
                            });
                        } else {
                            dynamic.shadowed.push(entry.name.clone());
                        }
                    }
                }
            }
        }
        dynamic
    }
}

/// Read-only view of a route tree
pub trait FileSystem: Send + Sync {
    /// Kind of the entry at `path`, `Ok(None)` when nothing is there
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Children of the directory at `path`
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Contents of the file at `path`
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Bracket-named children of `dir`
    ///
    /// The default scans the listing on every call; snapshots override it
    /// with a precomputed lookup.
    fn dynamic_entries(&self, dir: &Path, handler_ext: &str) -> io::Result<DynamicEntries> {
        let entries = self.list_dir(dir)?;
        Ok(DynamicEntries::from_entries(&entries, handler_ext))
    }

    /// Path with symlinks resolved, used to detect directory loops
    ///
    /// Trees without links return `path` unchanged.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    fn is_file(&self, path: &Path) -> io::Result<bool> {
        Ok(self.entry_kind(path)? == Some(EntryKind::File))
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(self.entry_kind(path)? == Some(EntryKind::Dir))
    }
}

/// Visit every directory under `root` together with its listing
///
/// A directory whose canonical path is one of its own ancestors (a symlink
/// loop) is skipped with a warning, as is anything nested deeper than
/// [`MAX_DEPTH`]. Directories that vanish mid-walk are skipped silently.
pub fn walk(
    fs: &dyn FileSystem,
    root: &Path,
    mut visit: impl FnMut(&Path, &[DirEntry]),
) -> Result<(), ResolveError> {
    let mut pending: Vec<(PathBuf, Vec<PathBuf>)> = vec![(root.to_path_buf(), Vec::new())];

    while let Some((dir, mut ancestors)) = pending.pop() {
        if ancestors.len() > MAX_DEPTH {
            logger::log_warning(&format!(
                "Not following '{}': nested deeper than {MAX_DEPTH} levels",
                dir.display()
            ));
            continue;
        }

        let canonical = match fs.canonicalize(&dir) {
            Ok(path) => path,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(ResolveError::io(&dir, e)),
        };
        if ancestors.contains(&canonical) {
            logger::log_warning(&format!(
                "Not following '{}': it loops back to '{}'",
                dir.display(),
                canonical.display()
            ));
            continue;
        }

        let entries = match fs.list_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(ResolveError::io(&dir, e)),
        };
        visit(&dir, &entries);

        ancestors.push(canonical);
        for entry in entries.iter().filter(|e| e.kind == EntryKind::Dir) {
            pending.push((dir.join(&entry.name), ancestors.clone()));
        }
    }

    Ok(())
}

/// `[name].<ext>` -> `name`
pub fn dynamic_file_param<'a>(file_name: &'a str, handler_ext: &str) -> Option<&'a str> {
    let stem = file_name
        .strip_suffix(handler_ext)?
        .strip_suffix('.')?;
    let param = stem.strip_prefix('[')?.strip_suffix(']')?;
    is_param_name(param).then_some(param)
}

/// `[name]` -> `name`
pub fn dynamic_dir_param(dir_name: &str) -> Option<&str> {
    let param = dir_name.strip_prefix('[')?.strip_suffix(']')?;
    is_param_name(param).then_some(param)
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['[', ']', '.', '/'])
}
