//! Resource repository: durable records plus unit-of-work bookkeeping.

use crate::persistence::{PersistenceDriver, PersistenceError};
use crate::resource::PersistentResource;
use crate::ResourceResult;
use brs_ident::{ResourceId, Sha1Hash};
use std::collections::{BTreeMap, BTreeSet};

/// A persistence-aware collection of [`PersistentResource`] records.
///
/// The repository wraps a [`PersistenceDriver`] with resource-specific
/// lookup semantics and tracks pending changes for the current unit of
/// work. Adds and removes are *deferred*: they are flushed to the driver in
/// one [`ResourceRepository::commit`], the transaction boundary of the
/// surrounding request or command.
///
/// Bookkeeping is keyed by [`ResourceId`]:
///
/// - `add` is idempotent per identifier, and cancels a pending removal of
///   the same identifier — the underlying persist-add fires at most once.
/// - `remove` is idempotent per identifier; removing a record whose add was
///   never committed simply discards the pending add.
///
/// Every sha1-based finder merges the durable view with the pending-add
/// view, deduplicated by identifier, with pending removals excluded.
/// Records loaded from the durable store come back **protected** — they
/// have been persisted once, so further mutation is refused.
pub struct ResourceRepository {
    driver: Box<dyn PersistenceDriver>,
    added: BTreeMap<ResourceId, PersistentResource>,
    removed: BTreeSet<ResourceId>,
}

impl ResourceRepository {
    /// Creates a repository over the given persistence driver.
    pub fn new(driver: Box<dyn PersistenceDriver>) -> Self {
        Self {
            driver,
            added: BTreeMap::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Registers a resource for addition in the current unit of work.
    ///
    /// A pending removal of the same identifier is cancelled. Adding the
    /// same record twice, or a record that is already durable, is a no-op.
    ///
    /// # Errors
    ///
    /// Fails with [`PersistenceError::NotPersistable`] when the record has
    /// no content attached yet — such a record cannot be stored.
    pub fn add(&mut self, resource: &PersistentResource) -> ResourceResult<()> {
        if resource.sha1().is_none() {
            return Err(PersistenceError::NotPersistable(
                "resource has no content hash; import it through a collection first".to_owned(),
            )
            .into());
        }

        let id = resource.id().clone();

        // Re-adding cancels a pending removal. If the record never made it
        // to the durable store, the add itself is still pending.
        if self.removed.remove(&id) {
            if self.driver.load(&id)?.is_none() {
                self.added.insert(id, resource.clone());
            }
            return Ok(());
        }

        if self.added.contains_key(&id) {
            return Ok(());
        }

        if self.driver.load(&id)?.is_some() {
            return Ok(());
        }

        self.added.insert(id, resource.clone());
        Ok(())
    }

    /// Registers a resource for removal in the current unit of work.
    ///
    /// Removing the same record twice is a no-op; removing a record whose
    /// add was never committed discards the pending add without ever
    /// touching the driver.
    pub fn remove(&mut self, resource: &PersistentResource) {
        let id = resource.id().clone();

        if self.added.remove(&id).is_some() {
            return;
        }

        self.removed.insert(id);
    }

    /// Finds a record by its identifier: durable store first, then the
    /// pending-add set (covering records created this unit of work).
    pub fn find_by_identifier(
        &self,
        id: &ResourceId,
    ) -> ResourceResult<Option<PersistentResource>> {
        if self.removed.contains(id) {
            return Ok(None);
        }

        if let Some(mut record) = self.driver.load(id)? {
            record.protect();
            return Ok(Some(record));
        }

        Ok(self.added.get(id).cloned())
    }

    /// Finds all records carrying the given content hash.
    pub fn find_by_sha1(&self, sha1: &Sha1Hash) -> ResourceResult<Vec<PersistentResource>> {
        self.merged_view(|record| record.sha1() == Some(sha1))
    }

    /// Finds all records carrying the given content hash within one
    /// collection.
    pub fn find_by_sha1_and_collection_name(
        &self,
        sha1: &Sha1Hash,
        collection_name: &str,
    ) -> ResourceResult<Vec<PersistentResource>> {
        self.merged_view(|record| {
            record.sha1() == Some(sha1) && record.collection_name() == collection_name
        })
    }

    /// Counts the records sharing the given (sha1, collection) pair — the
    /// deduplication unit the manager's deletion logic reasons about.
    pub fn count_by_sha1_and_collection_name(
        &self,
        sha1: &Sha1Hash,
        collection_name: &str,
    ) -> ResourceResult<usize> {
        Ok(self
            .find_by_sha1_and_collection_name(sha1, collection_name)?
            .len())
    }

    /// Finds one record carrying the given content hash: the first durable
    /// match, else the first pending-add match.
    pub fn find_one_by_sha1(&self, sha1: &Sha1Hash) -> ResourceResult<Option<PersistentResource>> {
        Ok(self.find_by_sha1(sha1)?.into_iter().next())
    }

    /// Finds all records belonging to the given collection.
    pub fn find_by_collection_name(
        &self,
        collection_name: &str,
    ) -> ResourceResult<Vec<PersistentResource>> {
        self.merged_view(|record| record.collection_name() == collection_name)
    }

    /// Finds every known record: durable and pending-add alike.
    pub fn find_all(&self) -> ResourceResult<Vec<PersistentResource>> {
        self.merged_view(|_| true)
    }

    /// Finds the durable records matching the probe's (sha1, filename,
    /// collection) triple, including the probe itself if stored.
    ///
    /// Publication targets derive the published location from exactly this
    /// triple, so the result tells whether a published file is still shared.
    pub fn find_similar_resources(
        &self,
        resource: &PersistentResource,
    ) -> ResourceResult<Vec<PersistentResource>> {
        let Some(sha1) = resource.sha1() else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        for mut record in self.driver.load_all()? {
            if self.removed.contains(record.id()) {
                continue;
            }
            if record.sha1() == Some(sha1)
                && record.filename() == resource.filename()
                && record.collection_name() == resource.collection_name()
            {
                record.protect();
                matches.push(record);
            }
        }
        Ok(matches)
    }

    /// Returns the resources added during this unit of work and not yet
    /// committed. The manager's shutdown sweep feeds on this.
    pub fn uncommitted_resources(&self) -> Vec<PersistentResource> {
        self.added.values().cloned().collect()
    }

    /// Returns true while the record's addition has not been committed.
    pub fn is_uncommitted(&self, id: &ResourceId) -> bool {
        self.added.contains_key(id)
    }

    /// Flushes the pending sets to the driver and clears them.
    ///
    /// This is the transaction boundary: removals first, then additions.
    pub fn commit(&mut self) -> ResourceResult<()> {
        for id in std::mem::take(&mut self.removed) {
            self.driver.delete(&id)?;
        }

        for (_, record) in std::mem::take(&mut self.added) {
            self.driver.insert(&record)?;
        }

        Ok(())
    }

    /// Discards all pending changes without touching the driver.
    ///
    /// The storage-side counterpart — deleting orphaned blobs of discarded
    /// adds — is the manager's job; the repository only forgets.
    pub fn discard_pending(&mut self) {
        self.added.clear();
        self.removed.clear();
    }

    /// Merged durable ∪ pending-add view, deduplicated by identifier,
    /// pending removals excluded. Durable records come back protected.
    fn merged_view<F>(&self, matches: F) -> ResourceResult<Vec<PersistentResource>>
    where
        F: Fn(&PersistentResource) -> bool,
    {
        let mut seen: BTreeSet<ResourceId> = BTreeSet::new();
        let mut result = Vec::new();

        for mut record in self.driver.load_all()? {
            if self.removed.contains(record.id()) || !matches(&record) {
                continue;
            }
            record.protect();
            seen.insert(record.id().clone());
            result.push(record);
        }

        for record in self.added.values() {
            if matches(record) && !seen.contains(record.id()) {
                result.push(record.clone());
            }
        }

        Ok(result)
    }
}

impl std::fmt::Debug for ResourceRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRepository")
            .field("pending_added", &self.added.len())
            .field("pending_removed", &self.removed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryDriver;
    use crate::ResourceError;
    use brs_ident::{Md5Hash, Sha1Hash};

    const SHA1_A: &str = "c828d0f88ce197be1aff7cc2e5e86b1244241ac6";
    const SHA1_B: &str = "0a0a9f2a6772942557ab5355d76af442f8f65e01";
    const MD5: &str = "9e107d9d372bb6826bd81d3542a419d6";

    fn record(sha1: &str, filename: &str, collection: &str) -> PersistentResource {
        let mut record = PersistentResource::new(collection);
        record
            .attach_content(
                Sha1Hash::parse(sha1).unwrap(),
                Md5Hash::parse(MD5).unwrap(),
                10,
            )
            .unwrap();
        record.set_filename(filename).unwrap();
        record
    }

    fn repository() -> ResourceRepository {
        ResourceRepository::new(Box::new(MemoryDriver::new()))
    }

    #[test]
    fn test_add_requires_content() {
        let mut repo = repository();
        let empty = PersistentResource::new("persistent");
        assert!(matches!(
            repo.add(&empty),
            Err(ResourceError::Persistence(_))
        ));
        assert!(repo.uncommitted_resources().is_empty());
    }

    #[test]
    fn test_add_is_idempotent_per_identifier() {
        let mut repo = repository();
        let resource = record(SHA1_A, "a.txt", "persistent");

        repo.add(&resource).unwrap();
        repo.add(&resource).unwrap();

        assert_eq!(repo.uncommitted_resources().len(), 1);
        repo.commit().unwrap();

        // The persist-add fired exactly once: a second commit has nothing
        // left to flush, and the store holds a single record.
        assert_eq!(repo.find_by_sha1(resource.sha1().unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent_per_identifier() {
        let mut repo = repository();
        let resource = record(SHA1_A, "a.txt", "persistent");

        repo.add(&resource).unwrap();
        repo.commit().unwrap();

        repo.remove(&resource);
        repo.remove(&resource);
        repo.commit().unwrap();

        assert!(repo.find_by_identifier(resource.id()).unwrap().is_none());
    }

    #[test]
    fn test_re_add_cancels_pending_removal() {
        let mut repo = repository();
        let resource = record(SHA1_A, "a.txt", "persistent");

        repo.add(&resource).unwrap();
        repo.commit().unwrap();

        repo.remove(&resource);
        repo.add(&resource).unwrap();
        repo.commit().unwrap();

        // The removal was cancelled; the record is still durable.
        assert!(repo.find_by_identifier(resource.id()).unwrap().is_some());
    }

    #[test]
    fn test_remove_of_uncommitted_add_discards_it() {
        let mut repo = repository();
        let resource = record(SHA1_A, "a.txt", "persistent");

        repo.add(&resource).unwrap();
        repo.remove(&resource);
        repo.commit().unwrap();

        assert!(repo.find_by_identifier(resource.id()).unwrap().is_none());
        assert!(repo.uncommitted_resources().is_empty());
    }

    #[test]
    fn test_find_by_identifier_covers_pending_adds() {
        let mut repo = repository();
        let resource = record(SHA1_A, "a.txt", "persistent");

        repo.add(&resource).unwrap();

        let found = repo
            .find_by_identifier(resource.id())
            .unwrap()
            .expect("pending add must be visible");
        assert_eq!(found.id(), resource.id());
        // Not yet persisted, so not yet protected.
        assert!(!found.is_protected());
    }

    #[test]
    fn test_durable_records_come_back_protected() {
        let mut repo = repository();
        let resource = record(SHA1_A, "a.txt", "persistent");

        repo.add(&resource).unwrap();
        repo.commit().unwrap();

        let found = repo.find_by_identifier(resource.id()).unwrap().unwrap();
        assert!(found.is_protected());
    }

    #[test]
    fn test_sha1_finders_merge_durable_and_pending() {
        let mut repo = repository();
        let durable = record(SHA1_A, "first.txt", "persistent");
        repo.add(&durable).unwrap();
        repo.commit().unwrap();

        let pending = record(SHA1_A, "second.txt", "persistent");
        repo.add(&pending).unwrap();

        let sha1 = Sha1Hash::parse(SHA1_A).unwrap();
        let all = repo.find_by_sha1(&sha1).unwrap();
        assert_eq!(all.len(), 2);

        assert_eq!(
            repo.count_by_sha1_and_collection_name(&sha1, "persistent")
                .unwrap(),
            2
        );
        assert_eq!(
            repo.count_by_sha1_and_collection_name(&sha1, "other")
                .unwrap(),
            0
        );

        // find_one prefers the durable record.
        let one = repo.find_one_by_sha1(&sha1).unwrap().unwrap();
        assert_eq!(one.id(), durable.id());
    }

    #[test]
    fn test_finders_exclude_pending_removals() {
        let mut repo = repository();
        let resource = record(SHA1_A, "a.txt", "persistent");
        repo.add(&resource).unwrap();
        repo.commit().unwrap();

        repo.remove(&resource);

        let sha1 = Sha1Hash::parse(SHA1_A).unwrap();
        assert!(repo.find_by_sha1(&sha1).unwrap().is_empty());
        assert!(repo.find_by_identifier(resource.id()).unwrap().is_none());
    }

    #[test]
    fn test_collection_name_scopes_finders() {
        let mut repo = repository();
        let here = record(SHA1_A, "a.txt", "persistent");
        let elsewhere = record(SHA1_A, "a.txt", "archive");
        repo.add(&here).unwrap();
        repo.add(&elsewhere).unwrap();
        repo.commit().unwrap();

        let sha1 = Sha1Hash::parse(SHA1_A).unwrap();
        assert_eq!(
            repo.find_by_sha1_and_collection_name(&sha1, "persistent")
                .unwrap()
                .len(),
            1
        );
        assert_eq!(repo.find_by_sha1(&sha1).unwrap().len(), 2);
    }

    #[test]
    fn test_find_similar_resources_matches_triple() {
        let mut repo = repository();
        let original = record(SHA1_A, "shared.txt", "persistent");
        let same_name = record(SHA1_A, "shared.txt", "persistent");
        let other_name = record(SHA1_A, "different.txt", "persistent");
        let other_hash = record(SHA1_B, "shared.txt", "persistent");

        repo.add(&original).unwrap();
        repo.add(&same_name).unwrap();
        repo.add(&other_name).unwrap();
        repo.add(&other_hash).unwrap();
        repo.commit().unwrap();

        let similar = repo.find_similar_resources(&original).unwrap();
        assert_eq!(similar.len(), 2);
        assert!(similar.iter().all(|r| r.filename() == "shared.txt"));
    }

    #[test]
    fn test_discard_pending_forgets_everything() {
        let mut repo = repository();
        let resource = record(SHA1_A, "a.txt", "persistent");
        repo.add(&resource).unwrap();

        repo.discard_pending();
        repo.commit().unwrap();

        assert!(repo.find_by_identifier(resource.id()).unwrap().is_none());
    }
}
