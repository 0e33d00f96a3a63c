use std::io;
use std::path::Path;
use tracing::debug;

/// Recursively copies `source` into `destination`, creating it if needed.
/// Symlinks are recreated rather than followed where the platform allows.
/// FIFOs, sockets and device nodes are skipped.
pub(crate) fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    std::fs::create_dir_all(destination)?;

    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = destination.join(entry.file_name());

        if file_type.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &target)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target)?;
        } else {
            debug!("Not copying special file {}", entry.path().display());
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(std::fs::read_link(link)?, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::fs::copy(link, target).map(|_| ())
}

/// Clears the read-only bit on every file and directory under `root`, so a
/// tree copied from a read-only checkout can be modified and removed.
pub(crate) fn make_writable(root: &Path) -> io::Result<()> {
    let metadata = std::fs::symlink_metadata(root)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        std::fs::set_permissions(root, permissions)?;
    }

    if metadata.is_dir() {
        for entry in std::fs::read_dir(root)? {
            make_writable(&entry?.path())?;
        }
    }

    Ok(())
}

/// Removes everything inside `dir` but keeps `dir` itself.
pub(crate) fn clear_directory(dir: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
