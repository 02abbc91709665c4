//! The persistent resource metadata record.

use crate::{ResourceError, ResourceResult, DEFAULT_PERSISTENT_COLLECTION_NAME};
use brs_ident::{Md5Hash, ResourceId, Sha1Hash};
use brs_types::MediaType;
use chrono::{DateTime, Utc};

/// Metadata describing one logical piece of content.
///
/// A `PersistentResource` records *what* a piece of content is — hash,
/// filename, media type, size, owning collection — independent of where its
/// bytes live. Content identity is the SHA-1 hash, not the record identity:
/// several records may share a hash (the same file imported twice under
/// different filenames, or into different collections), and the
/// (sha1, collection) pair is the unit the deduplication logic reasons
/// about.
///
/// # Protection
///
/// Once a record has been rehydrated from the durable store it is
/// *protected*: every mutating setter fails with
/// [`ResourceError::ProtectedResource`] and leaves the record unchanged.
/// Freshly created records stay mutable until they have been committed and
/// loaded again.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PersistentResource {
    /// Durable record identity; distinct from the content hash
    id: ResourceId,

    /// Name of the collection whose storage holds this resource's bytes and
    /// whose target publishes them
    collection_name: String,

    /// User-facing filename; drives media-type derivation
    filename: String,

    /// Content length in bytes
    file_size: u64,

    /// Optional sub-path a publication target should place this resource
    /// under
    #[serde(default)]
    relative_publication_path: String,

    /// Explicitly assigned media type; derived from the filename when unset
    #[serde(default)]
    media_type: Option<MediaType>,

    /// Primary content hash
    sha1: Option<Sha1Hash>,

    /// Secondary content checksum
    md5: Option<Md5Hash>,

    /// When this record was created by an import
    imported_at: DateTime<Utc>,

    /// Set when the record has been persisted/published; not serialised
    #[serde(skip)]
    protected: bool,

    /// Set exactly once by the manager when the record is deleted, to
    /// short-circuit duplicate deletion calls; not serialised
    #[serde(skip)]
    deleted: bool,
}

impl PersistentResource {
    /// Creates a fresh, unprotected record for the given collection.
    ///
    /// The content attributes (hashes, size) are unset; they are filled in
    /// by the storage backend during import, not by application code.
    pub fn new(collection_name: &str) -> Self {
        Self::with_id(ResourceId::new(), collection_name)
    }

    /// Creates a fresh record under a caller-chosen identifier.
    ///
    /// Used by replication and migration tooling that must preserve record
    /// identities; everything else uses [`PersistentResource::new`].
    pub fn with_id(id: ResourceId, collection_name: &str) -> Self {
        Self {
            id,
            collection_name: collection_name.to_owned(),
            filename: String::new(),
            file_size: 0,
            relative_publication_path: String::new(),
            media_type: None,
            sha1: None,
            md5: None,
            imported_at: Utc::now(),
            protected: false,
            deleted: false,
        }
    }

    /// Returns the durable record identifier.
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Returns the name of the collection this resource belongs to.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Moves this resource to another collection.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::ProtectedResource`] once the record is
    /// protected.
    pub fn set_collection_name(&mut self, collection_name: &str) -> ResourceResult<()> {
        self.ensure_mutable()?;
        self.collection_name = collection_name.to_owned();
        Ok(())
    }

    /// Returns the filename used when this resource is downloaded or saved.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Sets the filename and re-derives the media type from its extension.
    ///
    /// The extension is lowercased; the stem keeps its case.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::ProtectedResource`] once the record is
    /// protected, and with [`ResourceError::InvalidFilename`] for blank or
    /// overlong names.
    pub fn set_filename(&mut self, filename: &str) -> ResourceResult<()> {
        self.ensure_mutable()?;
        let normalized = brs_types::normalize_filename(filename)?;
        self.media_type = Some(MediaType::from_filename(&normalized));
        self.filename = normalized;
        Ok(())
    }

    /// Returns the file extension of the filename, or an empty string.
    pub fn file_extension(&self) -> &str {
        brs_types::file_extension(&self.filename)
    }

    /// Returns the relative publication path, empty unless a target should
    /// structure this resource into a sub-directory.
    pub fn relative_publication_path(&self) -> &str {
        &self.relative_publication_path
    }

    /// Sets the relative publication path.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::ProtectedResource`] once the record is
    /// protected.
    pub fn set_relative_publication_path(&mut self, path: &str) -> ResourceResult<()> {
        self.ensure_mutable()?;
        self.relative_publication_path = path.to_owned();
        Ok(())
    }

    /// Returns the IANA media type, deriving it from the filename when no
    /// explicit type was set.
    pub fn media_type(&self) -> MediaType {
        match &self.media_type {
            Some(media_type) => media_type.clone(),
            None => MediaType::from_filename(&self.filename),
        }
    }

    /// Explicitly sets the media type.
    ///
    /// Unlike the other setters this is allowed on protected records — the
    /// media type is presentation metadata and does not participate in
    /// content identity.
    pub fn set_media_type(&mut self, media_type: MediaType) {
        self.media_type = Some(media_type);
    }

    /// Returns the content size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Sets the content size.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::ProtectedResource`] once the record is
    /// protected.
    pub fn set_file_size(&mut self, file_size: u64) -> ResourceResult<()> {
        self.ensure_mutable()?;
        self.file_size = file_size;
        Ok(())
    }

    /// Returns the SHA-1 content hash, if content has been attached.
    pub fn sha1(&self) -> Option<&Sha1Hash> {
        self.sha1.as_ref()
    }

    /// Sets the SHA-1 content hash from its textual form.
    ///
    /// Mixed-case input is accepted and normalised to lowercase.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::ProtectedResource`] once the record is
    /// protected, and with [`ResourceError::InvalidHash`] if the value is
    /// not exactly 40 hex characters.
    pub fn set_sha1(&mut self, sha1: &str) -> ResourceResult<()> {
        self.ensure_mutable()?;
        self.sha1 = Some(Sha1Hash::parse(sha1)?);
        Ok(())
    }

    /// Returns the MD5 checksum, if content has been attached.
    pub fn md5(&self) -> Option<&Md5Hash> {
        self.md5.as_ref()
    }

    /// Sets the MD5 checksum from its textual form.
    ///
    /// # Errors
    ///
    /// Fails with [`ResourceError::ProtectedResource`] once the record is
    /// protected, and with [`ResourceError::InvalidHash`] if the value is
    /// not exactly 32 hex characters.
    pub fn set_md5(&mut self, md5: &str) -> ResourceResult<()> {
        self.ensure_mutable()?;
        self.md5 = Some(Md5Hash::parse(md5)?);
        Ok(())
    }

    /// Attaches the content digests produced by a storage import in one
    /// step.
    ///
    /// All three values come from a single pass over the content inside the
    /// storage backend; callers never compute them individually.
    pub fn attach_content(
        &mut self,
        sha1: Sha1Hash,
        md5: Md5Hash,
        file_size: u64,
    ) -> ResourceResult<()> {
        self.ensure_mutable()?;
        self.sha1 = Some(sha1);
        self.md5 = Some(md5);
        self.file_size = file_size;
        Ok(())
    }

    /// Replaces the record identifier.
    ///
    /// Internal hook used when an import must preserve an identity chosen
    /// elsewhere (replication, migration); everything else keeps the
    /// identifier allocated at construction.
    pub(crate) fn replace_id(&mut self, id: ResourceId) -> ResourceResult<()> {
        self.ensure_mutable()?;
        self.id = id;
        Ok(())
    }

    /// Returns when this record was created by an import.
    pub fn imported_at(&self) -> DateTime<Utc> {
        self.imported_at
    }

    /// Returns a string which distinctly identifies this record's content
    /// and can key cache entries referring to it: the SHA-1 hash.
    pub fn cache_entry_identifier(&self) -> Option<&str> {
        self.sha1.as_ref().map(|hash| hash.as_str())
    }

    /// Marks this record immutable. Applied when a record is rehydrated
    /// from the durable store; never on first creation.
    pub fn protect(&mut self) {
        self.protected = true;
    }

    /// Returns true once this record has become immutable.
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Marks this record as deleted. Called by the manager only, so that a
    /// second deletion request becomes a no-op instead of a double delete.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    /// Returns true if the manager has already deleted this record.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn ensure_mutable(&self) -> ResourceResult<()> {
        if self.protected {
            return Err(ResourceError::ProtectedResource {
                sha1: self
                    .sha1
                    .as_ref()
                    .map(|hash| hash.to_string())
                    .unwrap_or_else(|| "-".to_owned()),
            });
        }
        Ok(())
    }
}

impl Default for PersistentResource {
    fn default() -> Self {
        Self::new(DEFAULT_PERSISTENT_COLLECTION_NAME)
    }
}
