//! Non-recursive directory listing.
//!
//! Lists the immediate children of one directory together with the metadata
//! the snapshotter needs (kind, mtime, size, symlink target). Symlinks are
//! reported as symlinks and never followed. FIFOs, sockets and device nodes
//! are reported as [`FsEntry::Special`] so nobody tries to read them.
//! Recursion is the caller's job.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum DirListError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Entry name is not valid UTF-8: {0}")]
    NonUtf8Name(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsEntry {
    File { mtime: SystemTime, size: u64 },
    Dir { mtime: SystemTime },
    Symlink { mtime: SystemTime, target: PathBuf },
    /// Anything that is neither a regular file, a directory nor a symlink.
    Special { mtime: SystemTime },
}

impl FsEntry {
    pub fn mtime(&self) -> SystemTime {
        match self {
            FsEntry::File { mtime, .. }
            | FsEntry::Dir { mtime }
            | FsEntry::Symlink { mtime, .. }
            | FsEntry::Special { mtime } => *mtime,
        }
    }
}

fn map_error(path: &Path, e: std::io::Error) -> DirListError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        DirListError::PermissionDenied(path.to_path_buf())
    } else {
        DirListError::Io(e)
    }
}

/// Lists the immediate children of `dir`, keyed by file name.
///
/// The map is ordered by name so repeated listings of an unchanged directory
/// compare equal.
pub fn list_directory(dir: &Path) -> Result<BTreeMap<String, FsEntry>, DirListError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| map_error(dir, e))?;

    let mut entries = BTreeMap::new();

    for entry in read_dir {
        let entry = entry.map_err(DirListError::Io)?;
        let path = entry.path();

        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| DirListError::NonUtf8Name(path.clone()))?;

        let metadata = std::fs::symlink_metadata(&path).map_err(|e| map_error(&path, e))?;
        let mtime = metadata.modified().map_err(DirListError::Io)?;
        let file_type = metadata.file_type();

        let fs_entry = if file_type.is_symlink() {
            let target = std::fs::read_link(&path).map_err(|e| map_error(&path, e))?;
            FsEntry::Symlink { mtime, target }
        } else if file_type.is_dir() {
            FsEntry::Dir { mtime }
        } else if file_type.is_file() {
            FsEntry::File {
                mtime,
                size: metadata.len(),
            }
        } else {
            FsEntry::Special { mtime }
        };

        entries.insert(name, fs_entry);
    }

    Ok(entries)
}
