use crate::util::hashing::{finish_hex, hash_path_field, hash_u64_field};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("File modified while fingerprinting: {0}")]
    ConcurrentModification(PathBuf),
}

/// Identity of a file's content.
///
/// Two files with the same bytes have the same fingerprint regardless of
/// their names or timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint shared by every directory entry. Directories carry no
    /// content of their own; their children are tracked separately.
    pub fn directory() -> Self {
        Fingerprint("dir".to_string())
    }

    /// Fingerprint shared by FIFOs, sockets and device nodes. Only their
    /// metadata is observed; opening them could block or have side effects.
    pub fn special() -> Self {
        Fingerprint("special".to_string())
    }

    /// Fingerprint of a symlink, derived from the path it points at.
    pub fn symlink(target: &Path) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"symlink");
        hash_path_field(&mut hasher, target);
        Fingerprint(finish_hex(hasher))
    }

    /// Fingerprint of an in-memory byte string, identical to what
    /// [`fingerprint_file`] yields for a file holding the same bytes.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hash_u64_field(&mut hasher, u64::try_from(bytes.len()).unwrap_or(u64::MAX));
        hasher.update(bytes);
        Fingerprint(finish_hex(hasher))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for diagnostics.
    pub fn short(&self) -> &str {
        if self.0.len() > 12 {
            &self.0[..12]
        } else {
            &self.0
        }
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct FileFingerprint {
    pub fingerprint: Fingerprint,
    /// Modification time captured after reading.
    pub mtime: SystemTime,
    /// File size in bytes.
    pub size: u64,
}

fn map_open_error(path: &Path, e: std::io::Error) -> FingerprintError {
    if e.kind() == std::io::ErrorKind::PermissionDenied {
        FingerprintError::PermissionDenied(path.to_path_buf())
    } else {
        FingerprintError::Io(e)
    }
}

/// Computes the content fingerprint of a file: SHA-256 over its size followed
/// by its bytes.
///
/// # Behavior
/// - Records the file's size and modification time before reading
/// - Streams the file through the hasher in chunks
/// - Verifies the modification time and size did not change while reading
///
/// # Errors
/// - `FingerprintError::Io`: file doesn't exist or other I/O errors
/// - `FingerprintError::PermissionDenied`: the file cannot be read
/// - `FingerprintError::ConcurrentModification`: the file changed while being
///   read. A build tool that is still running when the snapshot is taken would
///   trigger this; the absence of the error is not a guarantee that nothing
///   touched the file.
pub fn fingerprint_file(path: &Path) -> Result<FileFingerprint, FingerprintError> {
    trace!("Fingerprinting {}", path.display());

    let metadata_before = std::fs::metadata(path).map_err(|e| map_open_error(path, e))?;
    let mtime_before = metadata_before.modified().map_err(FingerprintError::Io)?;

    let mut file = File::open(path).map_err(|e| map_open_error(path, e))?;
    let mut hasher = Sha256::new();
    hash_u64_field(&mut hasher, metadata_before.len());

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(FingerprintError::Io)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let metadata_after = std::fs::metadata(path).map_err(FingerprintError::Io)?;
    let mtime_after = metadata_after.modified().map_err(FingerprintError::Io)?;

    if mtime_before != mtime_after || metadata_before.len() != metadata_after.len() {
        return Err(FingerprintError::ConcurrentModification(path.to_path_buf()));
    }

    let fingerprint = Fingerprint(finish_hex(hasher));

    debug!("Fingerprint of {} is {}", path.display(), fingerprint.short());

    Ok(FileFingerprint {
        fingerprint,
        mtime: mtime_after,
        size: metadata_after.len(),
    })
}
