//! Error taxonomy of the resource management core.

use crate::persistence::PersistenceError;
use crate::storage::StorageError;
use crate::target::TargetError;

/// Errors surfaced by the resource management core.
///
/// Configuration errors are fatal: they are raised while the manager is
/// being built and abort the whole wiring. Import errors carry the
/// collection name and the original cause. Storage failures during resource
/// deletion are deliberately *not* represented here — they are logged and
/// folded into a `false` return, because deletion runs on best-effort
/// cleanup paths.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A collection name was used that is not present in the configuration
    #[error("the resource collection '{0}' does not exist; check the configuration and the code which requested it")]
    UnknownCollection(String),

    /// No metadata record carries the given content hash
    #[error("no resource found for content hash {0}")]
    UnknownResource(String),

    /// A write was attempted against a collection whose storage is read-only
    #[error("cannot write to collection '{collection}': storage '{storage}' is read-only")]
    ReadOnlyStorage {
        /// The collection the write was aimed at
        collection: String,
        /// The storage backend that refused the write
        storage: String,
    },

    /// The storage/target/collection configuration is inconsistent
    #[error("invalid resource configuration: {0}")]
    Configuration(String),

    /// A collection-level import failed; the original cause is attached
    #[error("importing into the resource collection '{collection}' failed: {cause}")]
    ImportFailed {
        /// The collection the import was aimed at
        collection: String,
        /// The underlying failure
        #[source]
        cause: Box<ResourceError>,
    },

    /// A mutation was attempted on a resource that has become immutable
    #[error("tried to modify the resource with SHA-1 hash {sha1} after it was protected; modifications are not allowed once a resource has been persisted or published")]
    ProtectedResource {
        /// The protected resource's content hash, or "-" if none was set yet
        sha1: String,
    },

    /// A content hash or record identifier failed validation
    #[error("invalid identifier: {0}")]
    InvalidHash(#[from] brs_ident::IdentError),

    /// A filename failed validation
    #[error("invalid filename: {0}")]
    InvalidFilename(#[from] brs_types::TypesError),

    /// A temporary local copy could not be materialised
    #[error("could not create a temporary local copy: {0}")]
    TemporaryCopy(String),

    /// A static resource path did not match `resource://<package>/Public/<path>`
    #[error("the path '{0}' does not point to a public package resource")]
    InvalidResourcePath(String),

    /// An uploaded file descriptor failed validation
    #[error("refusing to import upload: {0}")]
    InvalidUpload(String),

    /// The persistence collaborator rejected an operation
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// A storage backend failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A publication target failed
    #[error("publication target error: {0}")]
    Target(#[from] TargetError),
}

/// Result type for resource management operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
