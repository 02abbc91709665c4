//! Named binding of one storage and one publication target.

use crate::resource::PersistentResource;
use crate::storage::{ResourceStorage, ResourceStream, StorageObjects};
use crate::target::{PublicationTarget, TargetError};
use crate::{ResourceError, ResourceResult};
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// A resource collection: the unit applications configure and request
/// resources through.
///
/// A collection binds one storage backend and one publication target under a
/// stable name, optionally scoped to glob path patterns. It holds no state
/// beyond these references — it is the seam where capability checks happen
/// and where imported content is turned into a metadata record.
#[derive(Clone)]
pub struct Collection {
    name: String,
    storage: Arc<dyn ResourceStorage>,
    target: Arc<dyn PublicationTarget>,
    path_patterns: Vec<String>,
}

impl Collection {
    /// Creates a collection binding `storage` and `target` under `name`.
    pub fn new(
        name: &str,
        storage: Arc<dyn ResourceStorage>,
        target: Arc<dyn PublicationTarget>,
        path_patterns: Vec<String>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            storage,
            target,
            path_patterns,
        }
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the storage backend bound to this collection.
    pub fn storage(&self) -> &dyn ResourceStorage {
        self.storage.as_ref()
    }

    /// Returns the publication target bound to this collection.
    pub fn target(&self) -> &dyn PublicationTarget {
        self.target.as_ref()
    }

    /// Returns the configured glob path patterns.
    pub fn path_patterns(&self) -> &[String] {
        &self.path_patterns
    }

    /// Imports a file into this collection's storage and returns a fresh
    /// metadata record tagged with this collection's name.
    ///
    /// The record's content attributes (hashes, size) are produced by the
    /// storage in one pass; its filename stays empty — the caller decides
    /// what the resource is called.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::ReadOnlyStorage`] when the bound storage
    /// has no write capability, and with [`ResourceError::Storage`] when the
    /// import itself fails.
    pub fn import_source(&self, source_path: &Path) -> ResourceResult<PersistentResource> {
        let writable = self.require_writable()?;
        let blob = writable.import_source(source_path)?;

        let mut resource = PersistentResource::new(&self.name);
        resource.attach_content(blob.sha1, blob.md5, blob.size)?;
        Ok(resource)
    }

    /// Imports in-memory content into this collection's storage.
    ///
    /// Same contract as [`Collection::import_source`], for content that
    /// never was a file.
    pub fn import_content(&self, content: &[u8]) -> ResourceResult<PersistentResource> {
        let writable = self.require_writable()?;
        let blob = writable.import_content(content)?;

        let mut resource = PersistentResource::new(&self.name);
        resource.attach_content(blob.sha1, blob.md5, blob.size)?;
        Ok(resource)
    }

    /// Obtains a read-only stream over a resource's content, rewound to the
    /// start, or `None` when the storage holds no data for it.
    pub fn stream_by_resource(&self, resource: &PersistentResource) -> Option<ResourceStream> {
        let mut stream = self.storage.stream_by_resource(resource)?;
        // Hand out a predictable handle: position 0, wherever it came from.
        if stream.seek(SeekFrom::Start(0)).is_err() {
            return None;
        }
        Some(stream)
    }

    /// Lazily enumerates the objects this collection exposes.
    ///
    /// When path patterns are configured and the storage can evaluate them,
    /// the sequence is the concatenation of per-pattern results in pattern
    /// order; otherwise the storage's by-collection enumeration is used.
    pub fn objects(&self) -> StorageObjects<'_> {
        if !self.path_patterns.is_empty() && self.storage.supports_path_patterns() {
            Box::new(
                self.path_patterns
                    .iter()
                    .flat_map(move |pattern| self.storage.objects_by_path_pattern(pattern)),
            )
        } else {
            self.storage.objects_by_collection(self)
        }
    }

    /// Publishes every object of this collection to the bound target.
    pub fn publish(&self) -> Result<(), TargetError> {
        self.target.publish_collection(self)
    }

    fn require_writable(&self) -> ResourceResult<&dyn crate::storage::WritableStorage> {
        self.storage
            .writable()
            .ok_or_else(|| ResourceError::ReadOnlyStorage {
                collection: self.name.clone(),
                storage: self.storage.name().to_owned(),
            })
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("storage", &self.storage.name())
            .field("target", &self.target.name())
            .field("path_patterns", &self.path_patterns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileSystemStorage, StaticDirectoryStorage};
    use crate::target::FileSystemTarget;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn writable_collection(temp: &TempDir) -> Collection {
        let storage = FileSystemStorage::new("default", &temp.path().join("storage")).unwrap();
        let target =
            FileSystemTarget::new("local", &temp.path().join("public"), "/_resources/").unwrap();
        Collection::new("persistent", Arc::new(storage), Arc::new(target), Vec::new())
    }

    #[test]
    fn test_import_content_builds_tagged_record() {
        let temp = TempDir::new().unwrap();
        let collection = writable_collection(&temp);

        let resource = collection.import_content(b"collection content").unwrap();

        assert_eq!(resource.collection_name(), "persistent");
        assert!(resource.sha1().is_some());
        assert!(resource.md5().is_some());
        assert_eq!(resource.file_size(), 18);
        assert_eq!(resource.filename(), "");
        assert!(!resource.is_protected());
    }

    #[test]
    fn test_import_round_trip_preserves_bytes() {
        let temp = TempDir::new().unwrap();
        let collection = writable_collection(&temp);

        let content: Vec<u8> = (0..=255).collect();
        let resource = collection.import_content(&content).unwrap();

        let mut stream = collection
            .stream_by_resource(&resource)
            .expect("stream must be available");
        let mut read_back = Vec::new();
        stream.read_to_end(&mut read_back).unwrap();
        assert_eq!(read_back, content);
    }

    #[test]
    fn test_import_source_from_file() {
        let temp = TempDir::new().unwrap();
        let collection = writable_collection(&temp);

        let source = temp.path().join("upload.dat");
        fs::write(&source, b"from a file").unwrap();

        let resource = collection.import_source(&source).unwrap();
        assert_eq!(resource.file_size(), 11);
    }

    #[test]
    fn test_import_into_read_only_collection_fails() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("static");
        fs::create_dir_all(&tree).unwrap();

        let storage = StaticDirectoryStorage::new("packages", &tree).unwrap();
        let target =
            FileSystemTarget::new("local", &temp.path().join("public"), "/_resources/").unwrap();
        let collection = Collection::new("static", Arc::new(storage), Arc::new(target), Vec::new());

        let result = collection.import_content(b"nope");
        assert!(matches!(
            result,
            Err(ResourceError::ReadOnlyStorage { .. })
        ));
    }

    #[test]
    fn test_objects_follow_pattern_order() {
        let temp = TempDir::new().unwrap();
        let tree = temp.path().join("static");
        fs::create_dir_all(tree.join("a")).unwrap();
        fs::create_dir_all(tree.join("b")).unwrap();
        fs::write(tree.join("a").join("first.txt"), b"1").unwrap();
        fs::write(tree.join("b").join("second.txt"), b"2").unwrap();

        let storage = StaticDirectoryStorage::new("packages", &tree).unwrap();
        let target =
            FileSystemTarget::new("local", &temp.path().join("public"), "/_resources/").unwrap();
        let collection = Collection::new(
            "static",
            Arc::new(storage),
            Arc::new(target),
            vec!["b/*".to_owned(), "a/*".to_owned()],
        );

        let filenames: Vec<String> = collection.objects().map(|o| o.filename).collect();
        assert_eq!(filenames, vec!["second.txt", "first.txt"]);
    }

    #[test]
    fn test_stream_is_rewound() {
        let temp = TempDir::new().unwrap();
        let collection = writable_collection(&temp);
        let resource = collection.import_content(b"rewound").unwrap();

        let mut stream = collection.stream_by_resource(&resource).unwrap();
        let mut first = String::new();
        stream.read_to_string(&mut first).unwrap();

        let mut stream_again = collection.stream_by_resource(&resource).unwrap();
        let mut second = String::new();
        stream_again.read_to_string(&mut second).unwrap();

        assert_eq!(first, "rewound");
        assert_eq!(first, second);
    }
}
