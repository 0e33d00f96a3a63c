use crate::snapshot::{EntryKind, Snapshot};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeType {
    Added,
    Removed,
    /// Content fingerprint changed.
    Modified,
    /// Modification time changed, content did not.
    Touched,
}

impl ChangeType {
    pub const ALL: [ChangeType; 4] = [
        ChangeType::Added,
        ChangeType::Removed,
        ChangeType::Modified,
        ChangeType::Touched,
    ];

    /// Past-tense verb used in failure messages.
    pub fn verb(self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
            ChangeType::Touched => "touched",
        }
    }

    fn header(self) -> &'static str {
        match self {
            ChangeType::Added => "Added files:",
            ChangeType::Removed => "Removed files:",
            ChangeType::Modified => "Modified files:",
            ChangeType::Touched => "Touched files:",
        }
    }
}

/// Classified change set between two snapshots.
///
/// Every path is in at most one of the four sets, with one exception: a
/// path that switched between directory and leaf is both removed and added
/// until [`Diff::ignore_directories`] drops its directory side. Directory
/// paths of each snapshot are remembered so that filter needs no re-walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
    modified: BTreeSet<String>,
    touched: BTreeSet<String>,
    before_directories: BTreeSet<String>,
    after_directories: BTreeSet<String>,
}

/// Classifies every path in the union of both snapshots.
///
/// * only in `after` → added
/// * only in `before` → removed
/// * a directory on one side and a leaf on the other → removed and added
/// * fingerprints differ → modified
/// * fingerprints equal, mtimes differ → touched
/// * otherwise unchanged and omitted
pub fn diff(before: &Snapshot, after: &Snapshot) -> Diff {
    let mut result = Diff::default();

    for (path, old) in before.entries() {
        match after.get(path) {
            None => {
                result.removed.insert(path.clone());
            }
            Some(new) if (old.kind == EntryKind::Dir) != (new.kind == EntryKind::Dir) => {
                result.removed.insert(path.clone());
                result.added.insert(path.clone());
            }
            Some(new) if new.fingerprint != old.fingerprint => {
                result.modified.insert(path.clone());
            }
            Some(new) if new.mtime != old.mtime => {
                result.touched.insert(path.clone());
            }
            Some(_) => {}
        }
    }

    for path in after.entries().keys() {
        if before.get(path).is_none() {
            result.added.insert(path.clone());
        }
    }

    result.before_directories = before.directories().map(str::to_string).collect();
    result.after_directories = after.directories().map(str::to_string).collect();

    result
}

impl Diff {
    /// Builds a diff from explicit sets, without directory knowledge.
    pub fn from_sets<I, S>(added: I, removed: I, modified: I, touched: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Diff {
            added: added.into_iter().map(Into::into).collect(),
            removed: removed.into_iter().map(Into::into).collect(),
            modified: modified.into_iter().map(Into::into).collect(),
            touched: touched.into_iter().map(Into::into).collect(),
            before_directories: BTreeSet::new(),
            after_directories: BTreeSet::new(),
        }
    }

    pub fn added(&self) -> &BTreeSet<String> {
        &self.added
    }

    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn modified(&self) -> &BTreeSet<String> {
        &self.modified
    }

    pub fn touched(&self) -> &BTreeSet<String> {
        &self.touched
    }

    pub fn set(&self, change: ChangeType) -> &BTreeSet<String> {
        match change {
            ChangeType::Added => &self.added,
            ChangeType::Removed => &self.removed,
            ChangeType::Modified => &self.modified,
            ChangeType::Touched => &self.touched,
        }
    }

    pub(crate) fn set_mut(&mut self, change: ChangeType) -> &mut BTreeSet<String> {
        match change {
            ChangeType::Added => &mut self.added,
            ChangeType::Removed => &mut self.removed,
            ChangeType::Modified => &mut self.modified,
            ChangeType::Touched => &mut self.touched,
        }
    }

    /// Which set, if any, holds `path`.
    pub fn classify(&self, path: &str) -> Option<ChangeType> {
        ChangeType::ALL
            .into_iter()
            .find(|change| self.set(*change).contains(path))
    }

    /// Drops directory entries. Only leaf files are meaningful build
    /// artifacts.
    ///
    /// Removals are judged by the old snapshot and everything else by the new
    /// one, so a leaf that replaced a directory (or was replaced by one) stays.
    pub fn ignore_directories(&mut self) {
        let before = &self.before_directories;
        let after = &self.after_directories;
        self.removed.retain(|path| !before.contains(path));
        for set in [&mut self.added, &mut self.modified, &mut self.touched] {
            set.retain(|path| !after.contains(path));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.touched.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len() + self.touched.len()
    }

    /// Writes every set under its own header, one path per line, sorted.
    /// Nothing is ever truncated.
    pub fn pprint<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for change in ChangeType::ALL {
            writeln!(out, "{}", change.header())?;
            let set = self.set(change);
            if set.is_empty() {
                writeln!(out, "  (none)")?;
            }
            for path in set {
                writeln!(out, "  {path}")?;
            }
        }
        Ok(())
    }

    pub fn pprint_to_string(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.pprint(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Prints every snapshot entry with its kind, size, mtime and fingerprint.
pub fn print_snapshot(snapshot: &Snapshot) {
    for (path, entry) in snapshot.entries() {
        let kind = match entry.kind {
            EntryKind::File => "f",
            EntryKind::Dir => "d",
            EntryKind::Symlink => "l",
            EntryKind::Special => "s",
        };
        println!(
            "{} {:>10} {} {} {}",
            kind,
            format_size(entry.size),
            format_mtime(entry.mtime),
            entry.fingerprint.short(),
            path
        );
    }
}

pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

pub(crate) fn format_mtime(time: SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}
