//! Canonical hashing helpers for content fingerprints.
//!
//! Every field fed to a fingerprint goes through one of these helpers so the
//! byte stream handed to SHA-256 is unambiguous regardless of what the field
//! contains.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Hashes a byte field with an explicit length prefix.
///
/// Without the prefix, a file containing `ab` followed by a symlink target
/// `c` would feed the same bytes as `a` followed by `bc`.
pub(crate) fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}

/// Hashes a fixed-width integer field.
pub(crate) fn hash_u64_field(hasher: &mut Sha256, value: u64) {
    hasher.update(value.to_be_bytes());
}

/// Hashes a path while keeping distinct OS paths distinct.
///
/// On Unix the raw OS bytes are hashed. Elsewhere the string form is used.
pub(crate) fn hash_path_field(hasher: &mut Sha256, path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        hash_field(hasher, path.as_os_str().as_bytes());
    }
    #[cfg(not(unix))]
    {
        hash_field(hasher, path.to_string_lossy().as_bytes());
    }
}

/// Finishes a hasher into the lowercase hex form used throughout the crate.
pub(crate) fn finish_hex(hasher: Sha256) -> String {
    format!("{:x}", hasher.finalize())
}
