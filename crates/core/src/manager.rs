//! The resource manager: the façade application code talks to.

use crate::collection::Collection;
use crate::config::{BackendRegistry, Settings};
use crate::persistence::PersistenceDriver;
use crate::repository::ResourceRepository;
use crate::resource::PersistentResource;
use crate::storage::{ResourceStorage, ResourceStream};
use crate::target::{PublicationTarget, TargetError};
use crate::{ResourceError, ResourceResult, DEFAULT_STATIC_COLLECTION_NAME};
use brs_ident::{ResourceId, Sha1Hash};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// URI scheme prefix of static package resource paths.
const RESOURCE_SCHEME_PREFIX: &str = "resource://";

/// Path segment that marks the public part of a package's resources.
const PUBLIC_SEGMENT: &str = "Public/";

/// Serial for scratch file names created by this process.
static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Outcome code of a file upload, as reported by the web layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The file arrived completely
    Success,
    /// The file arrived truncated
    Partial,
    /// No file was submitted
    Missing,
    /// The file exceeded a size limit
    TooLarge,
}

/// Descriptor of an uploaded file handed in by the web layer.
///
/// The manager never trusts this descriptor as-is: the temp path must lie
/// inside the configured upload staging directory, the outcome code must
/// signal success, and the client filename's extension must not be
/// blacklisted.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as reported by the client
    pub client_filename: String,

    /// Local path of the uploaded temp file
    pub temp_path: PathBuf,

    /// Upload outcome code
    pub outcome: UploadOutcome,
}

/// A resource's bytes materialised as a throwaway local file.
///
/// For APIs that insist on a filesystem path rather than a stream. The file
/// is removed when the guard is dropped, on every exit path.
#[derive(Debug)]
pub struct TemporaryLocalCopy {
    path: tempfile::TempPath,
}

impl TemporaryLocalCopy {
    /// Returns the path of the temporary file.
    ///
    /// The path must not be stored or published; it is gone once the guard
    /// drops.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The top-level resource management façade.
///
/// The manager owns the name→collection registry built from validated
/// configuration, the metadata repository, and the upload policy. It
/// orchestrates import (bytes → stored blob → metadata record → repository
/// → publication), reference-counted deletion, URI resolution, and the
/// end-of-unit-of-work orphan sweep.
///
/// Construction validates the whole configuration — storages, then targets,
/// then collections — and fails fast on the first dangling reference or
/// missing option. Once built, the registry is immutable for the process
/// lifetime.
pub struct ResourceManager {
    collections: BTreeMap<String, Collection>,
    storages: BTreeMap<String, Arc<dyn ResourceStorage>>,
    targets: BTreeMap<String, Arc<dyn PublicationTarget>>,
    repository: ResourceRepository,
    upload_staging_dir: Option<PathBuf>,
    upload_extension_blacklist: BTreeSet<String>,
    scratch_dir: PathBuf,
}

impl ResourceManager {
    /// Builds a manager from settings, a backend registry and a persistence
    /// driver.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Configuration`] when a collection refers to
    /// an unknown storage or target, a backend kind is not registered, or a
    /// backend option is missing or ill-typed.
    pub fn new(
        settings: &Settings,
        registry: &BackendRegistry,
        driver: Box<dyn PersistenceDriver>,
    ) -> ResourceResult<Self> {
        let mut storages: BTreeMap<String, Arc<dyn ResourceStorage>> = BTreeMap::new();
        for (name, backend_settings) in &settings.storages {
            storages.insert(name.clone(), registry.build_storage(name, backend_settings)?);
        }

        let mut targets: BTreeMap<String, Arc<dyn PublicationTarget>> = BTreeMap::new();
        for (name, backend_settings) in &settings.targets {
            targets.insert(name.clone(), registry.build_target(name, backend_settings)?);
        }

        let mut collections = BTreeMap::new();
        for (name, collection_settings) in &settings.collections {
            let storage = storages
                .get(&collection_settings.storage)
                .ok_or_else(|| {
                    ResourceError::Configuration(format!(
                        "collection '{}' refers to the non-existing storage '{}'",
                        name, collection_settings.storage
                    ))
                })?
                .clone();

            let target = targets
                .get(&collection_settings.target)
                .ok_or_else(|| {
                    ResourceError::Configuration(format!(
                        "collection '{}' refers to the non-existing target '{}'",
                        name, collection_settings.target
                    ))
                })?
                .clone();

            collections.insert(
                name.clone(),
                Collection::new(
                    name,
                    storage,
                    target,
                    collection_settings.path_patterns.clone(),
                ),
            );
        }

        let scratch_dir = settings
            .scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("brs-resources"));

        Ok(Self {
            collections,
            storages,
            targets,
            repository: ResourceRepository::new(driver),
            upload_staging_dir: settings.upload.staging_dir.clone(),
            upload_extension_blacklist: settings
                .upload
                .extension_blacklist
                .iter()
                .map(|extension| extension.to_ascii_lowercase())
                .collect(),
            scratch_dir,
        })
    }

    /// Imports a file as a persistent resource.
    ///
    /// The resulting record's filename is derived from the source's base
    /// name, the record is registered with the repository, and the content
    /// is published to the collection's target.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::UnknownCollection`] when the collection
    /// is not configured (the repository stays untouched), and with
    /// [`ResourceError::ImportFailed`] wrapping any collection-level
    /// failure.
    pub fn import_resource(
        &mut self,
        source_path: &Path,
        collection_name: &str,
    ) -> ResourceResult<PersistentResource> {
        self.import_resource_with_id(source_path, collection_name, None)
    }

    /// Imports a file under a caller-chosen record identifier.
    pub fn import_resource_with_id(
        &mut self,
        source_path: &Path,
        collection_name: &str,
        forced_id: Option<ResourceId>,
    ) -> ResourceResult<PersistentResource> {
        let collection = self.require_collection(collection_name)?.clone();

        let import = || -> ResourceResult<PersistentResource> {
            let mut resource = collection.import_source(source_path)?;
            if let Some(id) = forced_id {
                resource.replace_id(id)?;
            }
            if let Some(basename) = source_path.file_name().and_then(|name| name.to_str()) {
                resource.set_filename(basename)?;
            }
            Ok(resource)
        };

        let resource = import().map_err(|cause| ResourceError::ImportFailed {
            collection: collection_name.to_owned(),
            cause: Box::new(cause),
        })?;

        self.register_and_publish(&resource, &collection)?;
        tracing::debug!(
            "successfully imported file '{}' into the resource collection '{}' (storage: '{}', SHA-1: {})",
            source_path.display(),
            collection_name,
            collection.storage().name(),
            resource.sha1().map(|hash| hash.as_str()).unwrap_or("-")
        );
        Ok(resource)
    }

    /// Imports in-memory content as a persistent resource.
    ///
    /// The given filename decides the record's media type; no filename
    /// derivation happens.
    pub fn import_resource_from_content(
        &mut self,
        content: &[u8],
        filename: &str,
        collection_name: &str,
    ) -> ResourceResult<PersistentResource> {
        self.import_resource_from_content_with_id(content, filename, collection_name, None)
    }

    /// Imports in-memory content under a caller-chosen record identifier.
    pub fn import_resource_from_content_with_id(
        &mut self,
        content: &[u8],
        filename: &str,
        collection_name: &str,
        forced_id: Option<ResourceId>,
    ) -> ResourceResult<PersistentResource> {
        let collection = self.require_collection(collection_name)?.clone();

        let import = || -> ResourceResult<PersistentResource> {
            let mut resource = collection.import_content(content)?;
            if let Some(id) = forced_id {
                resource.replace_id(id)?;
            }
            resource.set_filename(filename)?;
            Ok(resource)
        };

        let resource = import().map_err(|cause| ResourceError::ImportFailed {
            collection: collection_name.to_owned(),
            cause: Box::new(cause),
        })?;

        self.register_and_publish(&resource, &collection)?;
        tracing::debug!(
            "successfully imported content into the resource collection '{}' (storage: '{}', SHA-1: {})",
            collection_name,
            collection.storage().name(),
            resource.sha1().map(|hash| hash.as_str()).unwrap_or("-")
        );
        Ok(resource)
    }

    /// Imports an uploaded file as a persistent resource.
    ///
    /// The upload descriptor is validated before anything is read: the
    /// outcome code must signal success, the client filename's extension
    /// must not be blacklisted, and — when a staging directory is
    /// configured — the temp file must actually live inside it, in which
    /// case it is relocated into the scratch directory before import.
    pub fn import_uploaded_resource(
        &mut self,
        upload: &UploadedFile,
        collection_name: &str,
    ) -> ResourceResult<PersistentResource> {
        self.require_collection(collection_name)?;

        if upload.outcome != UploadOutcome::Success {
            return Err(ResourceError::InvalidUpload(format!(
                "upload of '{}' did not complete (outcome: {:?})",
                upload.client_filename, upload.outcome
            )));
        }

        let extension = brs_types::file_extension(&upload.client_filename).to_ascii_lowercase();
        if !extension.is_empty() && self.upload_extension_blacklist.contains(&extension) {
            return Err(ResourceError::InvalidUpload(format!(
                "the extension '{}' of the uploaded file '{}' is blacklisted",
                extension, upload.client_filename
            )));
        }

        let (import_path, relocated) = self.prepare_uploaded_file(upload)?;

        let collection = self.require_collection(collection_name)?.clone();
        let import = || -> ResourceResult<PersistentResource> {
            let mut resource = collection.import_source(&import_path)?;
            resource.set_filename(&upload.client_filename)?;
            Ok(resource)
        };
        let result = import().map_err(|cause| ResourceError::ImportFailed {
            collection: collection_name.to_owned(),
            cause: Box::new(cause),
        });

        // The relocated copy is only a vehicle for the import.
        if relocated {
            let _ = std::fs::remove_file(&import_path);
        }

        let resource = result?;
        self.register_and_publish(&resource, &collection)?;
        tracing::debug!(
            "successfully imported the uploaded file '{}' into the resource collection '{}' (storage: '{}', SHA-1: {})",
            resource.filename(),
            collection_name,
            collection.storage().name(),
            resource.sha1().map(|hash| hash.as_str()).unwrap_or("-")
        );
        Ok(resource)
    }

    /// Returns the resource record identified by the given content hash, or
    /// `None` if no record carries it.
    pub fn resource_by_sha1(&self, sha1: &Sha1Hash) -> ResourceResult<Option<PersistentResource>> {
        self.repository.find_one_by_sha1(sha1)
    }

    /// Returns a read-only stream over a resource's content.
    ///
    /// Returns `None` — a failure, not an error — when the resource's
    /// collection no longer exists (records can outlive a removed collection
    /// configuration) or the storage holds no data for it.
    pub fn stream_by_resource(&self, resource: &PersistentResource) -> Option<ResourceStream> {
        let collection = self.collections.get(resource.collection_name())?;
        collection.stream_by_resource(resource)
    }

    /// Materialises a resource's bytes as a throwaway local file.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::TemporaryCopy`] when the scratch
    /// directory cannot be created, the resource's stream cannot be opened,
    /// or the copy fails.
    pub fn temporary_local_copy(
        &self,
        resource: &PersistentResource,
    ) -> ResourceResult<TemporaryLocalCopy> {
        let scratch = self.scratch_dir.join("resource-files");
        std::fs::create_dir_all(&scratch).map_err(|e| {
            ResourceError::TemporaryCopy(format!(
                "could not create the temporary directory {}: {}",
                scratch.display(),
                e
            ))
        })?;

        let mut stream = self.stream_by_resource(resource).ok_or_else(|| {
            ResourceError::TemporaryCopy(format!(
                "could not open a stream for resource '{}' ({}) from collection '{}'",
                resource.filename(),
                resource.sha1().map(|hash| hash.as_str()).unwrap_or("-"),
                resource.collection_name()
            ))
        })?;

        let prefix = format!(
            "{}-",
            resource.sha1().map(|hash| hash.as_str()).unwrap_or("resource")
        );
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile_in(&scratch)
            .map_err(|e| {
                ResourceError::TemporaryCopy(format!(
                    "could not create a temporary file in {}: {}",
                    scratch.display(),
                    e
                ))
            })?;

        io::copy(&mut stream, file.as_file_mut()).map_err(|e| {
            ResourceError::TemporaryCopy(format!(
                "could not copy resource content to the temporary file: {}",
                e
            ))
        })?;

        Ok(TemporaryLocalCopy {
            path: file.into_temp_path(),
        })
    }

    /// Deletes a resource: always the metadata record, and the storage
    /// bytes only when no other record references the same
    /// (sha1, collection) pair.
    ///
    /// Storage-level failures are logged and reported as `false` rather
    /// than raised — deletion runs on best-effort cleanup paths where an
    /// exception would abort unrelated work. Whatever happens, the record
    /// ends up marked deleted and removed from the repository, so repeated
    /// calls are no-ops.
    pub fn delete_resource(&mut self, resource: &mut PersistentResource, unpublish: bool) -> bool {
        if resource.is_deleted() {
            return true;
        }

        let mut ok = true;

        if let Some(sha1) = resource.sha1().cloned() {
            let collection_name = resource.collection_name().to_owned();
            match self
                .repository
                .count_by_sha1_and_collection_name(&sha1, &collection_name)
            {
                Err(e) => {
                    tracing::warn!(
                        "could not determine the reference count of resource '{}' ({}): {}",
                        resource.filename(),
                        sha1,
                        e
                    );
                    ok = false;
                }
                Ok(count) if count > 1 => {
                    tracing::debug!(
                        "not removing storage data of resource '{}' ({}): still in use by {} other record(s)",
                        resource.filename(),
                        sha1,
                        count - 1
                    );
                }
                Ok(_) => {
                    ok = self.delete_storage_data(resource, &sha1, &collection_name, unpublish);
                }
            }
        }

        resource.mark_deleted();
        self.repository.remove(resource);
        ok
    }

    /// Returns the web-accessible URI for a resource, or `None` when its
    /// collection is no longer configured.
    pub fn public_persistent_resource_uri(&self, resource: &PersistentResource) -> Option<String> {
        let collection = self.collections.get(resource.collection_name())?;
        match collection.target().public_persistent_resource_uri(resource) {
            Ok(uri) => Some(uri),
            Err(e) => {
                tracing::warn!(
                    "could not resolve the public URI of resource '{}': {}",
                    resource.filename(),
                    e
                );
                None
            }
        }
    }

    /// Returns the web-accessible URI for the record carrying the given
    /// content hash.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::UnknownCollection`] or
    /// [`ResourceError::UnknownResource`].
    pub fn public_persistent_resource_uri_by_hash(
        &self,
        sha1: &Sha1Hash,
        collection_name: &str,
    ) -> ResourceResult<String> {
        let collection = self.require_collection(collection_name)?;

        let resource = self
            .repository
            .find_one_by_sha1(sha1)?
            .ok_or_else(|| ResourceError::UnknownResource(sha1.to_string()))?;

        Ok(collection
            .target()
            .public_persistent_resource_uri(&resource)?)
    }

    /// Returns the public URI for a static resource of a package, below the
    /// package's public resources directory.
    pub fn public_package_resource_uri(
        &self,
        package_key: &str,
        relative_path: &str,
    ) -> ResourceResult<String> {
        let collection = self.require_collection(DEFAULT_STATIC_COLLECTION_NAME)?;
        Ok(collection
            .target()
            .public_static_resource_uri(&format!("{}/{}", package_key, relative_path)))
    }

    /// Resolves a `resource://<package>/Public/<path>` URI to its public
    /// URI.
    pub fn public_package_resource_uri_by_path(&self, path: &str) -> ResourceResult<String> {
        let (package_key, relative_path) = Self::package_and_path_by_public_path(path)?;
        self.public_package_resource_uri(&package_key, &relative_path)
    }

    /// Splits a `resource://<package>/Public/<path>` URI into package key
    /// and relative path.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::InvalidResourcePath`] when the path does
    /// not match the scheme.
    pub fn package_and_path_by_public_path(path: &str) -> ResourceResult<(String, String)> {
        let invalid = || ResourceError::InvalidResourcePath(path.to_owned());

        let rest = path.strip_prefix(RESOURCE_SCHEME_PREFIX).ok_or_else(invalid)?;
        let (package_key, tail) = rest.split_once('/').ok_or_else(invalid)?;
        if package_key.is_empty() {
            return Err(invalid());
        }

        let relative_path = tail.strip_prefix(PUBLIC_SEGMENT).ok_or_else(invalid)?;
        Ok((package_key.to_owned(), relative_path.to_owned()))
    }

    /// Publishes every resource of a collection to its target.
    ///
    /// Persistent collections publish their repository records; pattern- or
    /// read-only-backed collections publish what their storage enumerates.
    /// Missing storage data is logged and skipped.
    pub fn publish_collection(&mut self, collection_name: &str) -> ResourceResult<()> {
        let collection = self.require_collection(collection_name)?.clone();

        let record_driven = collection.storage().writable().is_some()
            && collection.path_patterns().is_empty();
        if !record_driven {
            collection.publish()?;
            return Ok(());
        }

        for record in self.repository.find_by_collection_name(collection_name)? {
            match collection.target().publish_resource(&record, &collection) {
                Ok(()) => {}
                Err(TargetError::MissingData { sha1, filename, .. }) => {
                    tracing::warn!(
                        "could not publish resource '{}' (SHA-1 {}) of collection '{}': no corresponding data in the storage",
                        filename,
                        sha1,
                        collection_name
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Returns the collection registered under the given name.
    pub fn collection(&self, collection_name: &str) -> Option<&Collection> {
        self.collections.get(collection_name)
    }

    /// Returns all configured collections.
    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    /// Returns the storage registered under the given name.
    pub fn storage(&self, storage_name: &str) -> Option<&dyn ResourceStorage> {
        self.storages.get(storage_name).map(|storage| storage.as_ref())
    }

    /// Returns the collections that use the given storage.
    pub fn collections_by_storage(&self, storage_name: &str) -> Vec<&Collection> {
        self.collections
            .values()
            .filter(|collection| collection.storage().name() == storage_name)
            .collect()
    }

    /// Returns the target registered under the given name.
    pub fn target(&self, target_name: &str) -> Option<&dyn PublicationTarget> {
        self.targets.get(target_name).map(|target| target.as_ref())
    }

    /// Returns the resources imported during this unit of work that are not
    /// yet committed.
    pub fn imported_resources(&self) -> Vec<PersistentResource> {
        self.repository.uncommitted_resources()
    }

    /// Returns every known resource record.
    pub fn resources(&self) -> ResourceResult<Vec<PersistentResource>> {
        self.repository.find_all()
    }

    /// Commits the unit of work: flushes pending repository changes to the
    /// durable store.
    pub fn commit(&mut self) -> ResourceResult<()> {
        self.repository.commit()
    }

    /// End-of-unit-of-work sweep: deletes the storage data of every
    /// resource that was imported but never committed, without
    /// unpublishing.
    ///
    /// Run this when the surrounding transaction rolled back (or the
    /// process ends without a commit); it prevents orphaned blobs in
    /// storage.
    pub fn shutdown(&mut self) {
        let pending = self.repository.uncommitted_resources();
        if pending.is_empty() {
            return;
        }

        tracing::debug!(
            "removing storage data of {} imported but never committed resource(s)",
            pending.len()
        );
        for mut resource in pending {
            self.delete_resource(&mut resource, false);
        }
    }

    fn require_collection(&self, collection_name: &str) -> ResourceResult<&Collection> {
        self.collections
            .get(collection_name)
            .ok_or_else(|| ResourceError::UnknownCollection(collection_name.to_owned()))
    }

    /// Registers a freshly imported resource and publishes it.
    ///
    /// Publication failures do not fail the import: the record and its
    /// bytes are consistent, and publication can be repeated through
    /// [`ResourceManager::publish_collection`].
    fn register_and_publish(
        &mut self,
        resource: &PersistentResource,
        collection: &Collection,
    ) -> ResourceResult<()> {
        self.repository.add(resource)?;

        if let Err(e) = collection.target().publish_resource(resource, collection) {
            tracing::warn!(
                "imported resource '{}' could not be published to target '{}': {}",
                resource.filename(),
                collection.target().name(),
                e
            );
        }
        Ok(())
    }

    fn delete_storage_data(
        &self,
        resource: &PersistentResource,
        sha1: &Sha1Hash,
        collection_name: &str,
        unpublish: bool,
    ) -> bool {
        let Some(collection) = self.collections.get(collection_name) else {
            tracing::warn!(
                "could not remove storage data of resource '{}' ({}): it refers to the unknown collection '{}'",
                resource.filename(),
                sha1,
                collection_name
            );
            return false;
        };

        let Some(writable) = collection.storage().writable() else {
            tracing::warn!(
                "could not remove storage data of resource '{}' ({}): its collection '{}' is read-only",
                resource.filename(),
                sha1,
                collection_name
            );
            return false;
        };

        if let Err(e) = writable.delete_data(resource) {
            tracing::warn!(
                "could not remove storage data of resource '{}' ({}): {}",
                resource.filename(),
                sha1,
                e
            );
            return false;
        }

        if unpublish {
            let shared = self
                .repository
                .find_similar_resources(resource)
                .map(|similar| similar.len())
                .unwrap_or(0);
            if shared <= 1 {
                if let Err(e) = collection.target().unpublish_resource(resource) {
                    tracing::warn!(
                        "could not unpublish resource '{}' ({}): {}",
                        resource.filename(),
                        sha1,
                        e
                    );
                }
            }
            tracing::debug!(
                "removed storage data and unpublished resource '{}' ({}): not used by any other record",
                resource.filename(),
                sha1
            );
        } else {
            tracing::debug!(
                "removed storage data of resource '{}' ({}): not used by any other record",
                resource.filename(),
                sha1
            );
        }

        true
    }

    /// Validates the upload's origin and relocates it into the scratch
    /// directory when a staging directory is configured.
    ///
    /// Returns the path to import from and whether it is a relocated copy
    /// the caller must remove afterwards.
    fn prepare_uploaded_file(&self, upload: &UploadedFile) -> ResourceResult<(PathBuf, bool)> {
        let Some(staging_dir) = &self.upload_staging_dir else {
            if !upload.temp_path.is_file() {
                return Err(ResourceError::InvalidUpload(format!(
                    "the uploaded temp file '{}' does not exist (anymore)",
                    upload.temp_path.display()
                )));
            }
            return Ok((upload.temp_path.clone(), false));
        };

        let staging = staging_dir.canonicalize().map_err(|e| {
            ResourceError::InvalidUpload(format!(
                "the configured upload staging directory '{}' is not accessible: {}",
                staging_dir.display(),
                e
            ))
        })?;

        let temp_path = upload.temp_path.canonicalize().map_err(|e| {
            ResourceError::InvalidUpload(format!(
                "the uploaded temp file '{}' does not exist (anymore): {}",
                upload.temp_path.display(),
                e
            ))
        })?;

        if !temp_path.starts_with(&staging) {
            return Err(ResourceError::InvalidUpload(format!(
                "the file '{}' was not uploaded through the staging directory; as it could pose a security risk it will not be imported",
                upload.temp_path.display()
            )));
        }

        let scratch = self.scratch_dir.join("uploads");
        std::fs::create_dir_all(&scratch).map_err(|e| {
            ResourceError::InvalidUpload(format!(
                "could not create the upload scratch directory '{}': {}",
                scratch.display(),
                e
            ))
        })?;

        let serial = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let relocated = scratch.join(format!("upload-{}-{}.tmp", std::process::id(), serial));

        // Move the file out of the staging directory; fall back to
        // copy-and-remove across filesystems.
        if std::fs::rename(&temp_path, &relocated).is_err() {
            std::fs::copy(&temp_path, &relocated).map_err(|e| {
                ResourceError::InvalidUpload(format!(
                    "the uploaded file '{}' could not be moved to '{}': {}",
                    temp_path.display(),
                    relocated.display(),
                    e
                ))
            })?;
            let _ = std::fs::remove_file(&temp_path);
        }

        Ok((relocated, true))
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .field("storages", &self.storages.keys().collect::<Vec<_>>())
            .field("targets", &self.targets.keys().collect::<Vec<_>>())
            .field("repository", &self.repository)
            .finish()
    }
}
