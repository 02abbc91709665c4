//! Web-servable publication directory.

use crate::{ensure_safe_relative_path, remove_empty_parents, FilesError, FilesResult};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A directory that published files are copied into.
///
/// The area owns everything below its root: callers address files by safe
/// relative paths and never see absolute paths. Publishing overwrites — the
/// same content may legitimately be published again after configuration
/// changes — and unpublishing a file that is already gone succeeds silently,
/// because unpublication runs on best-effort cleanup paths.
#[derive(Debug)]
pub struct PublicationArea {
    /// Canonicalised area root
    root: PathBuf,
}

impl PublicationArea {
    /// Opens the publication area, creating the root directory if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if the root cannot be
    /// created or is not a directory.
    pub fn open(root: &Path) -> FilesResult<Self> {
        fs::create_dir_all(root).map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot create publication directory {}: {}",
                root.display(),
                e
            ))
        })?;

        if !root.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        let root = root.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    /// Copies a stream to `relative_path` below the area root, creating any
    /// missing parent directories. An existing file at that path is
    /// overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRelativePath`] for unsafe paths and
    /// [`FilesError::Io`] for filesystem failures.
    pub fn publish_stream(
        &self,
        source: &mut dyn Read,
        relative_path: &Path,
    ) -> FilesResult<()> {
        ensure_safe_relative_path(relative_path)?;
        let target_path = self.root.join(relative_path);

        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create publication directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let mut target_file = fs::File::create(&target_path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!(
                    "Failed to create published file {}: {}",
                    target_path.display(),
                    e
                ),
            ))
        })?;

        io::copy(source, &mut target_file).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!(
                    "Failed to copy content to published file {}: {}",
                    target_path.display(),
                    e
                ),
            ))
        })?;

        Ok(())
    }

    /// Removes a published file, pruning directories it leaves empty.
    ///
    /// Succeeds silently when the file no longer exists.
    pub fn unpublish(&self, relative_path: &Path) -> FilesResult<()> {
        ensure_safe_relative_path(relative_path)?;
        let target_path = self.root.join(relative_path);

        if !target_path.exists() {
            return Ok(());
        }

        fs::remove_file(&target_path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!(
                    "Failed to remove published file {}: {}",
                    target_path.display(),
                    e
                ),
            ))
        })?;

        if let Some(parent) = target_path.parent() {
            remove_empty_parents(parent, &self.root);
        }

        Ok(())
    }

    /// Returns true if a file is published at `relative_path`.
    pub fn is_published(&self, relative_path: &Path) -> bool {
        ensure_safe_relative_path(relative_path).is_ok() && self.root.join(relative_path).is_file()
    }

    /// Returns the canonicalised area root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn open_area(temp: &TempDir) -> PublicationArea {
        PublicationArea::open(&temp.path().join("public")).expect("area must open")
    }

    #[test]
    fn test_open_creates_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("public");
        assert!(!root.exists());

        let area = PublicationArea::open(&root).unwrap();
        assert!(area.root().is_dir());
    }

    #[test]
    fn test_publish_and_read_back() {
        let temp = TempDir::new().unwrap();
        let area = open_area(&temp);

        let relative = Path::new("c/8/2/8/c828d0f8/picture.jpg");
        area.publish_stream(&mut Cursor::new(b"jpeg bytes".to_vec()), relative)
            .unwrap();

        assert!(area.is_published(relative));
        assert_eq!(
            fs::read(area.root().join(relative)).unwrap(),
            b"jpeg bytes"
        );
    }

    #[test]
    fn test_publish_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let area = open_area(&temp);
        let relative = Path::new("doc.txt");

        area.publish_stream(&mut Cursor::new(b"old".to_vec()), relative)
            .unwrap();
        area.publish_stream(&mut Cursor::new(b"new".to_vec()), relative)
            .unwrap();

        assert_eq!(fs::read(area.root().join(relative)).unwrap(), b"new");
    }

    #[test]
    fn test_publish_rejects_escaping_path() {
        let temp = TempDir::new().unwrap();
        let area = open_area(&temp);

        let result =
            area.publish_stream(&mut Cursor::new(b"x".to_vec()), Path::new("../outside.txt"));
        assert!(matches!(result, Err(FilesError::InvalidRelativePath(_))));
    }

    #[test]
    fn test_unpublish_removes_file_and_empty_dirs() {
        let temp = TempDir::new().unwrap();
        let area = open_area(&temp);
        let relative = Path::new("a/b/c/file.bin");

        area.publish_stream(&mut Cursor::new(b"data".to_vec()), relative)
            .unwrap();
        area.unpublish(relative).unwrap();

        assert!(!area.is_published(relative));
        assert!(!area.root().join("a").exists());
        assert!(area.root().exists());
    }

    #[test]
    fn test_unpublish_missing_file_succeeds() {
        let temp = TempDir::new().unwrap();
        let area = open_area(&temp);
        assert!(area.unpublish(Path::new("never/published.txt")).is_ok());
    }

    #[test]
    fn test_unpublish_keeps_shared_directories() {
        let temp = TempDir::new().unwrap();
        let area = open_area(&temp);

        area.publish_stream(&mut Cursor::new(b"one".to_vec()), Path::new("shared/one.txt"))
            .unwrap();
        area.publish_stream(&mut Cursor::new(b"two".to_vec()), Path::new("shared/two.txt"))
            .unwrap();

        area.unpublish(Path::new("shared/one.txt")).unwrap();

        assert!(area.is_published(Path::new("shared/two.txt")));
        assert!(area.root().join("shared").is_dir());
    }
}
