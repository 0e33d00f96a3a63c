//! Point-in-time view of a directory tree.
//!
//! A [`Snapshot`] maps every path under a root (relative, `/`-separated) to
//! its kind, content fingerprint and modification time. Directories are
//! recorded as entries so the differencer can tell them apart from leaf files
//! later. Symlinks are never followed: a symlink is a leaf whose fingerprint is
//! derived from its target path. Only regular files are opened and hashed.
//! FIFOs, sockets and device nodes are leaves with a fixed fingerprint, so
//! they show up as added, removed or touched but never as modified.

use crate::dir_list::{DirListError, FsEntry, list_directory};
use crate::fingerprint::{Fingerprint, FingerprintError, fingerprint_file};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot root does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("Snapshot root is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("Directory listing error: {0}")]
    DirList(#[from] DirListError),
    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    /// FIFO, socket or device node.
    Special,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub kind: EntryKind,
    pub fingerprint: Fingerprint,
    pub mtime: SystemTime,
    /// Size in bytes for files, zero otherwise.
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, SnapshotEntry>,
}

impl Snapshot {
    /// Builds a snapshot directly from entries. Mostly useful for tests and for
    /// callers that already know the state they want to compare against.
    pub fn from_entries(entries: BTreeMap<String, SnapshotEntry>) -> Self {
        Snapshot { entries }
    }

    pub fn entries(&self) -> &BTreeMap<String, SnapshotEntry> {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&SnapshotEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths of every directory entry in this snapshot.
    pub fn directories(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.kind == EntryKind::Dir)
            .map(|(path, _)| path.as_str())
    }

    /// Newest modification time among non-directory entries.
    ///
    /// This is the timestamp the clock synchronizer must get past before a
    /// rewritten file is guaranteed to look newer than anything this
    /// snapshot saw.
    pub fn latest_mtime(&self) -> Option<SystemTime> {
        self.entries
            .values()
            .filter(|entry| entry.kind != EntryKind::Dir)
            .map(|entry| entry.mtime)
            .max()
    }
}

/// Recursively records every entry under `root`.
///
/// Returns the snapshot together with its representative timestamp (see
/// [`Snapshot::latest_mtime`]).
///
/// # Errors
///
/// * `MissingRoot` / `NotADirectory` if `root` cannot be walked at all
/// * `DirList` if any directory below `root` cannot be listed
/// * `Fingerprint` if a file cannot be read, or changed while being read
pub fn snapshot(root: &Path) -> Result<(Snapshot, Option<SystemTime>), SnapshotError> {
    match std::fs::metadata(root) {
        Ok(metadata) if !metadata.is_dir() => {
            return Err(SnapshotError::NotADirectory(root.to_path_buf()));
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SnapshotError::MissingRoot(root.to_path_buf()));
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(SnapshotError::DirList(DirListError::PermissionDenied(
                root.to_path_buf(),
            )));
        }
        Err(e) => return Err(SnapshotError::DirList(DirListError::Io(e))),
    }

    let mut entries = BTreeMap::new();
    walk_directory(root, "", &mut entries)?;

    let snapshot = Snapshot { entries };
    let latest = snapshot.latest_mtime();

    debug!(
        "Snapshot of {} holds {} entries",
        root.display(),
        snapshot.len()
    );

    Ok((snapshot, latest))
}

fn walk_directory(
    current_dir: &Path,
    prefix: &str,
    entries: &mut BTreeMap<String, SnapshotEntry>,
) -> Result<(), SnapshotError> {
    for (name, fs_entry) in list_directory(current_dir)? {
        let relative = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let absolute = current_dir.join(&name);

        match fs_entry {
            FsEntry::File { .. } => {
                let file = fingerprint_file(&absolute)?;
                entries.insert(
                    relative,
                    SnapshotEntry {
                        kind: EntryKind::File,
                        fingerprint: file.fingerprint,
                        mtime: file.mtime,
                        size: file.size,
                    },
                );
            }
            FsEntry::Dir { mtime } => {
                entries.insert(
                    relative.clone(),
                    SnapshotEntry {
                        kind: EntryKind::Dir,
                        fingerprint: Fingerprint::directory(),
                        mtime,
                        size: 0,
                    },
                );
                walk_directory(&absolute, &relative, entries)?;
            }
            FsEntry::Special { mtime } => {
                entries.insert(
                    relative,
                    SnapshotEntry {
                        kind: EntryKind::Special,
                        fingerprint: Fingerprint::special(),
                        mtime,
                        size: 0,
                    },
                );
            }
            FsEntry::Symlink { mtime, target } => {
                entries.insert(
                    relative,
                    SnapshotEntry {
                        kind: EntryKind::Symlink,
                        fingerprint: Fingerprint::symlink(&target),
                        mtime,
                        size: 0,
                    },
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_records_files_and_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::write(root.join("a.cpp"), "int main() {}").unwrap();
        fs::create_dir_all(root.join("bin/gcc/debug")).unwrap();
        fs::write(root.join("bin/gcc/debug/a.o"), "X").unwrap();

        let (snapshot, _) = snapshot(root).unwrap();

        let paths: Vec<&str> = snapshot.entries().keys().map(String::as_str).collect();
        assert_eq!(
            paths,
            vec!["a.cpp", "bin", "bin/gcc", "bin/gcc/debug", "bin/gcc/debug/a.o"]
        );
        assert_eq!(snapshot.get("bin").unwrap().kind, EntryKind::Dir);
        let object = snapshot.get("bin/gcc/debug/a.o").unwrap();
        assert_eq!(object.kind, EntryKind::File);
        assert_eq!(object.fingerprint, Fingerprint::of_bytes(b"X"));
        assert_eq!(object.size, 1);

        let dirs: Vec<&str> = snapshot.directories().collect();
        assert_eq!(dirs, vec!["bin", "bin/gcc", "bin/gcc/debug"]);
    }

    #[test]
    fn test_snapshot_keeps_empty_directories() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("empty")).unwrap();

        let (snapshot, latest) = snapshot(temp.path()).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("empty").unwrap().kind, EntryKind::Dir);
        assert_eq!(latest, None);
    }

    #[test]
    fn test_snapshot_of_empty_root() {
        let temp = TempDir::new().unwrap();

        let (snapshot, latest) = snapshot(temp.path()).unwrap();

        assert!(snapshot.is_empty());
        assert_eq!(latest, None);
    }

    #[test]
    fn test_representative_timestamp_is_newest_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::write(root.join("old.o"), "old").unwrap();
        fs::write(root.join("new.o"), "new").unwrap();
        set_file_mtime(root.join("old.o"), FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
        set_file_mtime(root.join("new.o"), FileTime::from_unix_time(1_200_000_000, 5)).unwrap();

        let (_, latest) = snapshot(root).unwrap();

        assert_eq!(
            latest,
            Some(UNIX_EPOCH + Duration::from_secs(1_200_000_000) + Duration::from_nanos(5))
        );
    }

    #[test]
    fn test_identical_content_has_identical_fingerprint() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::write(root.join("a.cpp"), "same").unwrap();
        fs::write(root.join("b.cpp"), "same").unwrap();

        let (snapshot, _) = snapshot(root).unwrap();

        assert_eq!(
            snapshot.get("a.cpp").unwrap().fingerprint,
            snapshot.get("b.cpp").unwrap().fingerprint
        );
    }

    #[test]
    fn test_snapshot_missing_root() {
        let temp = TempDir::new().unwrap();

        let result = snapshot(&temp.path().join("missing"));

        assert!(matches!(result, Err(SnapshotError::MissingRoot(_))));
    }

    #[test]
    fn test_snapshot_root_is_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("file"), "x").unwrap();

        let result = snapshot(&temp.path().join("file"));

        assert!(matches!(result, Err(SnapshotError::NotADirectory(_))));
    }

    #[test]
    #[cfg(unix)]
    fn test_snapshot_does_not_follow_symlinked_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("real")).unwrap();
        fs::write(root.join("real/a.o"), "X").unwrap();
        std::os::unix::fs::symlink("real", root.join("alias")).unwrap();

        let (snapshot, _) = snapshot(root).unwrap();

        assert_eq!(snapshot.get("alias").unwrap().kind, EntryKind::Symlink);
        assert!(snapshot.get("alias/a.o").is_none());
        assert!(snapshot.get("real/a.o").is_some());
    }

    #[test]
    #[cfg(unix)]
    fn test_snapshot_records_fifo_without_opening_it() {
        use nix::sys::stat::Mode;
        use std::sync::mpsc;

        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        nix::unistd::mkfifo(&root.join("pipe"), Mode::S_IRWXU).unwrap();
        fs::write(root.join("a.o"), "X").unwrap();

        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = sender.send(snapshot(&root).map(|(snapshot, _)| snapshot));
        });
        let snapshot = receiver
            .recv_timeout(Duration::from_secs(10))
            .expect("snapshot blocked on a FIFO")
            .unwrap();

        let pipe = snapshot.get("pipe").unwrap();
        assert_eq!(pipe.kind, EntryKind::Special);
        assert_eq!(pipe.fingerprint, Fingerprint::special());
        assert_eq!(snapshot.get("a.o").unwrap().kind, EntryKind::File);
    }
}
