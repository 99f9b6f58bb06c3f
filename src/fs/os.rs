//! Live filesystem access through `std::fs`

use super::{DirEntry, EntryKind, FileSystem};
use crate::logger;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads the real disk on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Dir)),
            Ok(meta) if meta.is_file() => Ok(Some(EntryKind::File)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                // names that are not UTF-8 can never match a request segment
                continue;
            };
            // follow symlinks, like metadata() above
            let kind = match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_dir() => EntryKind::Dir,
                Ok(meta) if meta.is_file() => EntryKind::File,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                // a link that cannot be followed (e.g. it points at itself)
                Err(e) if entry.file_type().is_ok_and(|t| t.is_symlink()) => {
                    logger::log_warning(&format!(
                        "Skipping symlink '{}': {e}",
                        entry.path().display()
                    ));
                    continue;
                }
                Err(e) => return Err(e),
            };
            entries.push(DirEntry { name, kind });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("users/[id]")).unwrap();
        fs::write(dir.path().join("index.rs"), "").unwrap();
        fs::write(dir.path().join("users/[id].rs"), "").unwrap();
        fs::write(dir.path().join("robots.txt"), "User-agent: *").unwrap();
        dir
    }

    #[test]
    fn test_entry_kind() {
        let dir = create_test_dir();
        let fs = OsFileSystem;

        assert_eq!(fs.entry_kind(dir.path()).unwrap(), Some(EntryKind::Dir));
        assert_eq!(
            fs.entry_kind(&dir.path().join("index.rs")).unwrap(),
            Some(EntryKind::File)
        );
        assert_eq!(fs.entry_kind(&dir.path().join("missing")).unwrap(), None);
    }

    #[test]
    fn test_list_dir() {
        let dir = create_test_dir();
        let mut entries = OsFileSystem.list_dir(&dir.path().join("users")).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                DirEntry::new("[id]", EntryKind::Dir),
                DirEntry::new("[id].rs", EntryKind::File),
            ]
        );
    }

    #[test]
    fn test_read() {
        let dir = create_test_dir();
        let data = OsFileSystem.read(&dir.path().join("robots.txt")).unwrap();
        assert_eq!(data, b"User-agent: *");
    }

    #[cfg(unix)]
    #[test]
    fn test_list_dir_skips_unfollowable_links() {
        let dir = create_test_dir();
        std::os::unix::fs::symlink("self", dir.path().join("self")).unwrap();
        std::os::unix::fs::symlink("missing", dir.path().join("dangling")).unwrap();

        let mut names: Vec<String> = OsFileSystem
            .list_dir(dir.path())
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        assert_eq!(names, ["index.rs", "robots.txt", "users"]);
    }

    #[test]
    fn test_list_missing_dir_is_error() {
        let dir = create_test_dir();
        assert!(OsFileSystem.list_dir(&dir.path().join("nope")).is_err());
    }
}
