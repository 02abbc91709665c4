//! Publication target contracts.
//!
//! A publication target copies stored content to a web-servable location and
//! answers public URIs for it. Targets never reach back into the metadata
//! repository; the manager decides *whether* to publish or unpublish, the
//! target only knows *how*.

mod filesystem;

pub use filesystem::FileSystemTarget;

use crate::collection::Collection;
use crate::resource::PersistentResource;

/// Errors raised by publication targets.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// A target could not be constructed from its options
    #[error("publication target '{target}' could not be initialised: {reason}")]
    Initialisation {
        /// The target name from the configuration
        target: String,
        /// What went wrong
        reason: String,
    },

    /// The storage holds no data for a resource that should be published
    #[error("could not publish '{filename}' (SHA-1 {sha1}) to target '{target}': no corresponding data in the storage")]
    MissingData {
        /// The target name
        target: String,
        /// The content hash the data was expected under
        sha1: String,
        /// The filename that was being published
        filename: String,
    },

    /// The filename extension is blacklisted on this target
    #[error("refusing to publish '{filename}' to target '{target}': the extension '{extension}' is blacklisted")]
    BlacklistedExtension {
        /// The target name
        target: String,
        /// The filename that was rejected
        filename: String,
        /// The offending extension
        extension: String,
    },

    /// A resource without a content hash cannot be published or addressed
    #[error("resource has no content hash; it cannot be handled by target '{target}'")]
    MissingContentHash {
        /// The target name
        target: String,
    },

    /// Copying or removing published files failed
    #[error("publication target '{target}' failed for '{path}': {cause}")]
    Publication {
        /// The target name
        target: String,
        /// The relative publication path involved
        path: String,
        /// The underlying failure
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A backend that exposes stored content at a public, web-reachable
/// location.
pub trait PublicationTarget: Send + Sync {
    /// The target name from the configuration.
    fn name(&self) -> &str;

    /// Publishes one persistent resource from the given collection.
    fn publish_resource(
        &self,
        resource: &PersistentResource,
        collection: &Collection,
    ) -> Result<(), TargetError>;

    /// Publishes every object the collection's storage exposes.
    fn publish_collection(&self, collection: &Collection) -> Result<(), TargetError>;

    /// Removes a previously published resource from the public location.
    fn unpublish_resource(&self, resource: &PersistentResource) -> Result<(), TargetError>;

    /// Returns the web-accessible URI for a persistent resource.
    fn public_persistent_resource_uri(
        &self,
        resource: &PersistentResource,
    ) -> Result<String, TargetError>;

    /// Returns the web-accessible URI for a static resource given its
    /// relative path.
    fn public_static_resource_uri(&self, relative_path: &str) -> String;
}
