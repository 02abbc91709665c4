//! Writable filesystem storage backed by the content-addressed blob store.

use crate::collection::Collection;
use crate::resource::PersistentResource;
use crate::storage::{
    ImportedBlob, ObjectSource, ResourceStorage, ResourceStream, StorageError, StorageObject,
    StorageObjects, WritableStorage,
};
use brs_files::{BlobRecord, BlobStore};
use brs_types::MediaType;
use std::path::Path;

/// A writable storage keeping its bytes in a local [`BlobStore`].
///
/// This is the default backend for persistent resources. Deduplication,
/// atomic writes and sharded layout come from the blob store; this type adds
/// the storage contract on top.
#[derive(Debug)]
pub struct FileSystemStorage {
    name: String,
    store: BlobStore,
}

impl FileSystemStorage {
    /// Opens (creating if necessary) a filesystem storage rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Initialisation`] if the root cannot be
    /// created or is not a directory.
    pub fn new(name: &str, path: &Path) -> Result<Self, StorageError> {
        let store = BlobStore::create(path).map_err(|e| StorageError::Initialisation {
            storage: name.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_owned(),
            store,
        })
    }

    fn record_to_blob(record: BlobRecord) -> ImportedBlob {
        ImportedBlob {
            sha1: record.sha1,
            md5: record.md5,
            size: record.size,
        }
    }
}

impl ResourceStorage for FileSystemStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn stream_by_resource(&self, resource: &PersistentResource) -> Option<ResourceStream> {
        let sha1 = resource.sha1()?;
        self.store
            .open_blob(sha1)
            .ok()
            .map(|file| Box::new(file) as ResourceStream)
    }

    /// Enumerates every blob this storage holds.
    ///
    /// Record-level names live in the metadata repository, not in the
    /// storage; enumeration therefore exposes content-addressed names only.
    /// Collection-level publication of persistent resources goes through the
    /// repository records instead of this enumeration.
    fn objects_by_collection(&self, _collection: &Collection) -> StorageObjects<'_> {
        let store = &self.store;
        Box::new(store.blobs().map(move |sha1| {
            let size = store.blob_size(&sha1).unwrap_or(0);
            let path = store.blob_path(&sha1);
            StorageObject {
                filename: sha1.to_string(),
                relative_publication_path: String::new(),
                media_type: MediaType::octet_stream(),
                file_size: size,
                source: ObjectSource::File(path),
                sha1,
            }
        }))
    }

    fn writable(&self) -> Option<&dyn WritableStorage> {
        Some(self)
    }
}

impl WritableStorage for FileSystemStorage {
    fn import_source(&self, source_path: &Path) -> Result<ImportedBlob, StorageError> {
        self.store
            .put_file(source_path)
            .map(Self::record_to_blob)
            .map_err(|e| StorageError::Import {
                storage: self.name.clone(),
                cause: Box::new(e),
            })
    }

    fn import_content(&self, content: &[u8]) -> Result<ImportedBlob, StorageError> {
        self.store
            .put_bytes(content)
            .map(Self::record_to_blob)
            .map_err(|e| StorageError::Import {
                storage: self.name.clone(),
                cause: Box::new(e),
            })
    }

    fn delete_data(&self, resource: &PersistentResource) -> Result<(), StorageError> {
        let sha1 = resource.sha1().ok_or_else(|| StorageError::Delete {
            storage: self.name.clone(),
            sha1: "-".to_owned(),
            cause: "resource has no content hash".into(),
        })?;

        self.store
            .delete_blob(sha1)
            .map_err(|e| StorageError::Delete {
                storage: self.name.clone(),
                sha1: sha1.to_string(),
                cause: Box::new(e),
            })
    }
}
