//! BRS filesystem layer.
//!
//! This crate provides the two low-level filesystem services the resource
//! management core builds on. It knows nothing about collections, metadata
//! records or configuration — it moves bytes.
//!
//! ## Content-addressed blob storage
//!
//! [`BlobStore`] persists opaque byte content under its SHA-1 hash:
//!
//! ```text
//! <root>/
//! └── blobs/
//!     ├── tmp/          # staging area for in-flight writes
//!     └── sha1/
//!         └── c8/
//!             └── 28/
//!                 └── c828d0f88ce1…   # full hash as filename
//! ```
//!
//! Properties the layers above rely on:
//!
//! - **Deduplication**: identical content is stored once; importing it again
//!   succeeds without rewriting.
//! - **Atomicity**: content is digested into a staging file and renamed into
//!   its final content-addressed location, so concurrent importers of the
//!   same bytes cannot observe a half-written blob.
//! - **Integrity**: the blob's location is derived from its digest, so a
//!   stored blob can always be verified against its own path.
//!
//! ## Publication area
//!
//! [`PublicationArea`] manages a web-servable directory: it copies streams to
//! relative paths below a root, and removes them again, pruning directories
//! that become empty. URI formation is the caller's concern.

mod publish;
mod store;

pub use publish::PublicationArea;
pub use store::{digest_file, digest_reader, BlobRecord, BlobStore};

use std::path::Path;

/// Errors that can occur during filesystem operations.
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// No blob with the given hash exists in the store
    #[error("No blob found for hash {0}")]
    BlobNotFound(String),

    /// A relative path escaped the area it must stay inside
    #[error("Invalid relative path: {0}")]
    InvalidRelativePath(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for filesystem operations.
pub type FilesResult<T> = Result<T, FilesError>;

/// Removes now-empty directories from `start` upwards, stopping at `stop`.
///
/// Used after deleting a blob or unpublishing a file so that sharded
/// directory trees do not accumulate empty shells. Failure to remove a
/// directory (for example because another writer re-populated it) simply
/// stops the pruning.
pub(crate) fn remove_empty_parents(start: &Path, stop: &Path) {
    let mut current = start;
    while current != stop && current.starts_with(stop) {
        if std::fs::remove_dir(current).is_err() {
            return;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return,
        }
    }
}

/// Rejects relative paths that are absolute or contain parent-directory
/// components, so a caller-supplied path can never escape its area root.
pub(crate) fn ensure_safe_relative_path(relative: &Path) -> FilesResult<()> {
    use std::path::Component;

    if relative.as_os_str().is_empty() {
        return Err(FilesError::InvalidRelativePath(
            "path must not be empty".to_owned(),
        ));
    }

    for component in relative.components() {
        match component {
            Component::Normal(_) => {}
            _ => {
                return Err(FilesError::InvalidRelativePath(format!(
                    "path must be relative and must not contain '..' or root components: {}",
                    relative.display()
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_remove_empty_parents_prunes_up_to_stop() {
        let temp = TempDir::new().unwrap();
        let stop = temp.path().join("area");
        let leaf = stop.join("a").join("b").join("c");
        fs::create_dir_all(&leaf).unwrap();

        remove_empty_parents(&leaf, &stop);

        assert!(!stop.join("a").exists());
        assert!(stop.exists());
    }

    #[test]
    fn test_remove_empty_parents_stops_at_populated_dir() {
        let temp = TempDir::new().unwrap();
        let stop = temp.path().join("area");
        let leaf = stop.join("a").join("b");
        fs::create_dir_all(&leaf).unwrap();
        fs::write(stop.join("a").join("keep.txt"), b"x").unwrap();

        remove_empty_parents(&leaf, &stop);

        assert!(!leaf.exists());
        assert!(stop.join("a").exists());
    }

    #[test]
    fn test_ensure_safe_relative_path() {
        assert!(ensure_safe_relative_path(Path::new("a/b/c.txt")).is_ok());
        assert!(matches!(
            ensure_safe_relative_path(Path::new("../escape")),
            Err(FilesError::InvalidRelativePath(_))
        ));
        assert!(matches!(
            ensure_safe_relative_path(Path::new("/absolute")),
            Err(FilesError::InvalidRelativePath(_))
        ));
        assert!(ensure_safe_relative_path(Path::new("")).is_err());
    }
}
