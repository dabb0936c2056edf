//! Path validation and security utilities.
//!
//! Entry paths are used as record identities, so two spellings of the same
//! location must collapse into one canonical relative path.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a storage path for security and correctness, returning its
/// canonical form. Ensures that paths don't escape the storage root (no `..`
/// traversal).
///
/// > **Note:** This does **not** normalize backslashes, non-UTF8 bytes, or
/// >           platform-specific weirdness. Null bytes are explicitly rejected.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use audiohub_storage::validate_path;
/// // Valid paths
/// assert!(validate_path("Dune/01 - Prologue.mp3").is_ok());
/// assert!(validate_path("a/../cover.jpg").is_ok()); // (never leaves library root)
/// // Invalid paths
/// assert!(validate_path("../etc/passwd").is_err());
/// assert!(validate_path("a/../../b").is_err()); // (leaves library root)
/// assert!(validate_path("a\0b").is_err());
/// // Paths get resolved
/// assert_eq!(
///     validate_path("Dune/./Part 1//../chapter.m4a").unwrap(),
///     Path::new("Dune/chapter.m4a")
/// );
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let mut components = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::Normal(s) => {
                // Null bytes pass through Path::components() on Unix but cause
                // truncation in C-based syscalls, reject them explicitly.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
                components.push(s)
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidPath(path.as_ref().to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Hidden entries are anything whose final component starts with a dot.
pub fn is_hidden(path: impl AsRef<Path>) -> bool {
    path.as_ref().file_name().map(OsStr::as_encoded_bytes).is_some_and(|name| name.starts_with(b"."))
}
