//! Read-only storage serving a plain directory tree.

use crate::collection::Collection;
use crate::resource::PersistentResource;
use crate::storage::{
    ObjectSource, ResourceStorage, ResourceStream, StorageError, StorageObject, StorageObjects,
};
use brs_types::MediaType;
use std::path::{Path, PathBuf};

/// A read-only storage exposing the files of an existing directory tree.
///
/// This backend backs static collections: content that ships with the
/// application (package assets, bundled documents) and is published as-is.
/// It supports glob path patterns so a collection can be scoped to a slice
/// of the tree, and it offers no write capability — imports into a
/// collection bound to it fail with a typed read-only error.
///
/// Hashes are computed on enumeration; the tree itself stays untouched.
#[derive(Debug)]
pub struct StaticDirectoryStorage {
    name: String,
    root: PathBuf,
}

impl StaticDirectoryStorage {
    /// Opens a static storage over an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Initialisation`] if the directory does not
    /// exist or cannot be canonicalised.
    pub fn new(name: &str, path: &Path) -> Result<Self, StorageError> {
        if !path.is_dir() {
            return Err(StorageError::Initialisation {
                storage: name.to_owned(),
                reason: format!("'{}' does not exist or is not a directory", path.display()),
            });
        }

        let root = path
            .canonicalize()
            .map_err(|e| StorageError::Initialisation {
                storage: name.to_owned(),
                reason: format!("cannot canonicalize '{}': {}", path.display(), e),
            })?;

        Ok(Self {
            name: name.to_owned(),
            root,
        })
    }

    /// Builds a storage object for one file of the tree, or `None` when the
    /// file vanished or cannot be read.
    fn object_for_file(&self, path: &Path) -> Option<StorageObject> {
        let record = brs_files::digest_file(path).ok()?;
        let filename = path.file_name()?.to_str()?.to_owned();
        let relative_publication_path = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .map(|relative| relative.to_string_lossy().into_owned())
            .unwrap_or_default();

        Some(StorageObject {
            sha1: record.sha1,
            media_type: MediaType::from_filename(&filename),
            filename,
            relative_publication_path,
            file_size: record.size,
            source: ObjectSource::File(path.to_path_buf()),
        })
    }
}

impl ResourceStorage for StaticDirectoryStorage {
    fn name(&self) -> &str {
        &self.name
    }

    /// Locates the file whose content matches the resource's hash.
    ///
    /// Static trees are small; a linear scan with on-the-fly digests is
    /// acceptable here, and nothing else can answer a by-hash lookup on a
    /// tree that is not content-addressed.
    fn stream_by_resource(&self, resource: &PersistentResource) -> Option<ResourceStream> {
        let wanted = resource.sha1()?;
        walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .find(|entry| {
                brs_files::digest_file(entry.path())
                    .map(|record| &record.sha1 == wanted)
                    .unwrap_or(false)
            })
            .and_then(|entry| std::fs::File::open(entry.path()).ok())
            .map(|file| Box::new(file) as ResourceStream)
    }

    fn objects_by_collection(&self, _collection: &Collection) -> StorageObjects<'_> {
        Box::new(
            walkdir::WalkDir::new(&self.root)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter_map(move |entry| self.object_for_file(entry.path())),
        )
    }

    fn objects_by_path_pattern(&self, pattern: &str) -> StorageObjects<'_> {
        let full_pattern = self.root.join(pattern);
        let Some(pattern_text) = full_pattern.to_str() else {
            return Box::new(std::iter::empty());
        };

        match glob::glob(pattern_text) {
            Ok(paths) => Box::new(
                paths
                    .filter_map(|entry| entry.ok())
                    .filter(|path| path.is_file())
                    .filter_map(move |path| self.object_for_file(&path)),
            ),
            Err(e) => {
                tracing::warn!(
                    "ignoring invalid path pattern '{}' on storage '{}': {}",
                    pattern,
                    self.name,
                    e
                );
                Box::new(std::iter::empty())
            }
        }
    }

    fn supports_path_patterns(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn build_tree(temp: &TempDir) -> PathBuf {
        let root = temp.path().join("packages");
        fs::create_dir_all(root.join("site").join("Public").join("css")).unwrap();
        fs::create_dir_all(root.join("site").join("Private")).unwrap();
        fs::write(root.join("site").join("Public").join("logo.png"), b"png-ish").unwrap();
        fs::write(
            root.join("site").join("Public").join("css").join("main.css"),
            b"body {}",
        )
        .unwrap();
        fs::write(root.join("site").join("Private").join("secret.txt"), b"no").unwrap();
        root
    }

    fn collection_stub(storage: StaticDirectoryStorage) -> Collection {
        use crate::target::FileSystemTarget;
        use std::sync::Arc;

        let temp = TempDir::new().unwrap();
        let target =
            FileSystemTarget::new("stub", &temp.path().join("public"), "/_resources/").unwrap();
        Collection::new("static", Arc::new(storage), Arc::new(target), Vec::new())
    }

    #[test]
    fn test_new_requires_existing_directory() {
        let temp = TempDir::new().unwrap();
        let result = StaticDirectoryStorage::new("packages", &temp.path().join("missing"));
        assert!(matches!(result, Err(StorageError::Initialisation { .. })));
    }

    #[test]
    fn test_objects_by_collection_lists_all_files() {
        let temp = TempDir::new().unwrap();
        let root = build_tree(&temp);
        let storage = StaticDirectoryStorage::new("packages", &root).unwrap();
        let collection = collection_stub(StaticDirectoryStorage::new("packages", &root).unwrap());

        let mut filenames: Vec<String> = storage
            .objects_by_collection(&collection)
            .map(|object| object.filename)
            .collect();
        filenames.sort();
        assert_eq!(filenames, vec!["logo.png", "main.css", "secret.txt"]);
    }

    #[test]
    fn test_objects_by_path_pattern_scopes_the_tree() {
        let temp = TempDir::new().unwrap();
        let root = build_tree(&temp);
        let storage = StaticDirectoryStorage::new("packages", &root).unwrap();

        let objects: Vec<StorageObject> = storage
            .objects_by_path_pattern("*/Public/**/*.css")
            .collect();
        assert_eq!(objects.len(), 1);

        let object = &objects[0];
        assert_eq!(object.filename, "main.css");
        assert_eq!(object.relative_publication_path, "site/Public/css");
        assert_eq!(object.media_type.as_str(), "text/css");
        assert_eq!(object.file_size, 7);
    }

    #[test]
    fn test_invalid_pattern_yields_nothing() {
        let temp = TempDir::new().unwrap();
        let root = build_tree(&temp);
        let storage = StaticDirectoryStorage::new("packages", &root).unwrap();
        assert_eq!(storage.objects_by_path_pattern("[").count(), 0);
    }

    #[test]
    fn test_storage_is_read_only() {
        let temp = TempDir::new().unwrap();
        let root = build_tree(&temp);
        let storage = StaticDirectoryStorage::new("packages", &root).unwrap();
        assert!(storage.writable().is_none());
        assert!(storage.supports_path_patterns());
    }

    #[test]
    fn test_stream_by_resource_finds_matching_content() {
        let temp = TempDir::new().unwrap();
        let root = build_tree(&temp);
        let storage = StaticDirectoryStorage::new("packages", &root).unwrap();

        let record = brs_files::digest_reader(&mut std::io::Cursor::new(b"body {}".to_vec()))
            .unwrap();
        let mut resource = PersistentResource::new("static");
        resource
            .attach_content(record.sha1, record.md5, record.size)
            .unwrap();

        let mut stream = storage
            .stream_by_resource(&resource)
            .expect("content exists in the tree");
        let mut content = String::new();
        stream.read_to_string(&mut content).unwrap();
        assert_eq!(content, "body {}");
    }
}
