//! # BRS Core
//!
//! Resource management core for BRS (Binary Resource Store): metadata
//! records, collections, the repository with unit-of-work bookkeeping, and
//! the manager façade that application code talks to.
//!
//! The model in one paragraph: content lives in a *storage* (a durable,
//! content-addressed byte store), is described by a [`PersistentResource`]
//! metadata record, and is made web-reachable by a *target*. A
//! [`Collection`] binds one storage and one target under a configured name;
//! the [`ResourceManager`] resolves collections, orchestrates import and
//! reference-counted deletion, and answers public URIs. Content identity is
//! the SHA-1 hash — several records may share one blob, and the
//! (sha1, collection) pair decides when bytes may really be deleted.
//!
//! Execution model: single-threaded, synchronous and request-scoped. One
//! manager instance lives for one process invocation; pending repository
//! changes are flushed by [`ResourceManager::commit`] and swept by
//! [`ResourceManager::shutdown`] when the unit of work never commits.
//!
//! **No delivery concerns**: HTTP handling, upload parsing and CLI wiring
//! belong to the layers above; they reach this crate through plain method
//! calls.

mod collection;
pub mod config;
mod error;
mod manager;
mod persistence;
mod repository;
mod resource;
pub mod storage;
pub mod target;

pub use collection::Collection;
pub use config::{BackendRegistry, Settings};
pub use error::{ResourceError, ResourceResult};
pub use manager::{ResourceManager, TemporaryLocalCopy, UploadOutcome, UploadedFile};
pub use persistence::{MemoryDriver, PersistenceDriver, PersistenceError, YamlFileDriver};
pub use repository::ResourceRepository;
pub use resource::PersistentResource;

// Identifier and value types travel across every API boundary; re-export
// them so consumers need not depend on the leaf crates directly.
pub use brs_ident::{Md5Hash, ResourceId, Sha1Hash};
pub use brs_types::MediaType;

/// Name of the default collection for persistent resources.
pub const DEFAULT_PERSISTENT_COLLECTION_NAME: &str = "persistent";

/// Name of the default collection for static resources.
pub const DEFAULT_STATIC_COLLECTION_NAME: &str = "static";
