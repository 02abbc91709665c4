//! Storage backend contracts.
//!
//! A storage backend is a durable, content-addressed byte store. Given
//! content it returns stable digests; given a hash it returns a readable
//! stream. Backends come in two capability levels: every backend can read
//! and enumerate, but only [`WritableStorage`] implementations can import
//! and delete. Callers must check the capability through
//! [`ResourceStorage::writable`] and fail with a typed read-only error
//! instead of attempting the write.

mod filesystem;
mod static_dir;

pub use filesystem::FileSystemStorage;
pub use static_dir::StaticDirectoryStorage;

use crate::collection::Collection;
use crate::resource::PersistentResource;
use brs_ident::{Md5Hash, Sha1Hash};
use brs_types::MediaType;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

/// Read-only, rewindable stream over one object's content.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Boxed stream handed out by storage backends.
pub type ResourceStream = Box<dyn ReadSeek + Send>;

/// Lazy sequence of storage objects. Backends may hold thousands of objects;
/// enumeration never materialises the whole set.
pub type StorageObjects<'a> = Box<dyn Iterator<Item = StorageObject> + 'a>;

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A storage backend could not be constructed from its options
    #[error("storage '{storage}' could not be initialised: {reason}")]
    Initialisation {
        /// The storage name from the configuration
        storage: String,
        /// What went wrong
        reason: String,
    },

    /// Importing content into a storage failed
    #[error("storage '{storage}' failed to import content: {cause}")]
    Import {
        /// The storage name
        storage: String,
        /// The underlying failure
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Deleting content from a storage failed
    #[error("storage '{storage}' failed to delete data for hash {sha1}: {cause}")]
    Delete {
        /// The storage name
        storage: String,
        /// The content hash whose data was being deleted
        sha1: String,
        /// The underlying failure
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Digests and size of content imported by a writable storage.
///
/// Produced atomically by the storage during import; the caller transfers
/// them onto the metadata record with
/// [`PersistentResource::attach_content`].
#[derive(Debug, Clone)]
pub struct ImportedBlob {
    /// Primary content hash
    pub sha1: Sha1Hash,
    /// Secondary checksum
    pub md5: Md5Hash,
    /// Content length in bytes
    pub size: u64,
}

/// Where a storage object's bytes can be obtained from.
#[derive(Debug, Clone)]
pub enum ObjectSource {
    /// A file on the local filesystem
    File(PathBuf),
    /// An in-memory buffer
    Bytes(Vec<u8>),
}

/// One object a storage backend exposes during enumeration.
///
/// Carries the same metadata shape as a persistent resource record so that
/// publication targets can publish either.
#[derive(Debug, Clone)]
pub struct StorageObject {
    /// Content hash of the object
    pub sha1: Sha1Hash,
    /// Filename the object should be published under
    pub filename: String,
    /// Path prefix a target should place the object under; empty for
    /// hash-addressed publication
    pub relative_publication_path: String,
    /// Media type of the object
    pub media_type: MediaType,
    /// Content length in bytes
    pub file_size: u64,
    /// Where to read the object's bytes from
    pub source: ObjectSource,
}

impl StorageObject {
    /// Opens a rewindable stream over the object's content, or `None` if the
    /// bytes have gone missing since enumeration.
    pub fn open(&self) -> Option<ResourceStream> {
        match &self.source {
            ObjectSource::File(path) => std::fs::File::open(path)
                .ok()
                .map(|file| Box::new(file) as ResourceStream),
            ObjectSource::Bytes(bytes) => {
                Some(Box::new(Cursor::new(bytes.clone())) as ResourceStream)
            }
        }
    }
}

/// A durable content-addressed byte store (read capability).
pub trait ResourceStorage: Send + Sync {
    /// The storage name from the configuration.
    fn name(&self) -> &str;

    /// Opens a read-only stream over the content backing `resource`, or
    /// `None` if the storage holds no data for its hash.
    fn stream_by_resource(&self, resource: &PersistentResource) -> Option<ResourceStream>;

    /// Lazily enumerates every object this storage exposes for the given
    /// collection.
    fn objects_by_collection(&self, collection: &Collection) -> StorageObjects<'_>;

    /// Lazily enumerates objects matching a glob path pattern.
    ///
    /// Only meaningful for backends that organise content by path; the
    /// default implementation yields nothing.
    fn objects_by_path_pattern(&self, _pattern: &str) -> StorageObjects<'_> {
        Box::new(std::iter::empty())
    }

    /// Whether this backend supports path-pattern enumeration.
    fn supports_path_patterns(&self) -> bool {
        false
    }

    /// Returns the write capability of this backend, or `None` for
    /// read-only backends.
    fn writable(&self) -> Option<&dyn WritableStorage> {
        None
    }
}

/// Write capability of a storage backend.
pub trait WritableStorage: ResourceStorage {
    /// Imports the content of a local file, returning its digests.
    ///
    /// Importing identical bytes twice must not corrupt or duplicate
    /// storage state.
    fn import_source(&self, source_path: &Path) -> Result<ImportedBlob, StorageError>;

    /// Imports in-memory content, returning its digests.
    fn import_content(&self, content: &[u8]) -> Result<ImportedBlob, StorageError>;

    /// Deletes the stored data backing `resource`.
    fn delete_data(&self, resource: &PersistentResource) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::SeekFrom;

    #[test]
    fn test_storage_object_open_from_bytes() {
        let object = StorageObject {
            sha1: Sha1Hash::parse("c828d0f88ce197be1aff7cc2e5e86b1244241ac6").unwrap(),
            filename: "note.txt".to_owned(),
            relative_publication_path: String::new(),
            media_type: MediaType::from_filename("note.txt"),
            file_size: 5,
            source: ObjectSource::Bytes(b"hello".to_vec()),
        };

        let mut stream = object.open().expect("bytes are always openable");
        let mut content = String::new();
        stream.read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");

        // The stream is rewindable.
        stream.seek(SeekFrom::Start(0)).unwrap();
        let mut again = String::new();
        stream.read_to_string(&mut again).unwrap();
        assert_eq!(again, "hello");
    }

    #[test]
    fn test_storage_object_open_missing_file() {
        let object = StorageObject {
            sha1: Sha1Hash::parse("c828d0f88ce197be1aff7cc2e5e86b1244241ac6").unwrap(),
            filename: "gone.bin".to_owned(),
            relative_publication_path: String::new(),
            media_type: MediaType::octet_stream(),
            file_size: 0,
            source: ObjectSource::File(PathBuf::from("/no/such/file")),
        };

        assert!(object.open().is_none());
    }
}
