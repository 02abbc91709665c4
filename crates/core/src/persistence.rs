//! Persistence collaborator for metadata records.
//!
//! The repository does not talk to a database directly; it wraps a
//! [`PersistenceDriver`], the narrow contract a durable record store must
//! satisfy: insert, delete, load by identifier, load all. Two drivers ship
//! with the core — an in-memory one for tests and embedding, and a
//! YAML-file driver storing one document per record under a sharded
//! directory tree.

use crate::resource::PersistentResource;
use brs_ident::ResourceId;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the per-record document written by the YAML driver.
const RECORD_FILE_NAME: &str = "resource.yaml";

/// Errors raised by persistence drivers.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// The record is not in a persistable state
    #[error("record is not persistable: {0}")]
    NotPersistable(String),

    /// A record with the same identifier already exists
    #[error("a record with identifier {0} already exists")]
    DuplicateRecord(ResourceId),

    /// Reading or writing record files failed
    #[error("failed to access record store: {0}")]
    Io(#[from] io::Error),

    /// A record document could not be serialised or deserialised
    #[error("failed to encode/decode record: {0}")]
    Encoding(#[from] serde_yaml::Error),
}

/// The durable store the repository defers its changes to.
pub trait PersistenceDriver: Send {
    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Fails with [`PersistenceError::DuplicateRecord`] when the identifier
    /// is already taken.
    fn insert(&mut self, record: &PersistentResource) -> Result<(), PersistenceError>;

    /// Deletes the record with the given identifier. Deleting an unknown
    /// identifier is a no-op: deletion runs on cleanup paths that must not
    /// fail over a record that is already gone.
    fn delete(&mut self, id: &ResourceId) -> Result<(), PersistenceError>;

    /// Loads one record by identifier.
    fn load(&self, id: &ResourceId) -> Result<Option<PersistentResource>, PersistenceError>;

    /// Loads every stored record.
    fn load_all(&self) -> Result<Vec<PersistentResource>, PersistenceError>;
}

/// In-memory driver; records live only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    records: BTreeMap<ResourceId, PersistentResource>,
}

impl MemoryDriver {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceDriver for MemoryDriver {
    fn insert(&mut self, record: &PersistentResource) -> Result<(), PersistenceError> {
        if self.records.contains_key(record.id()) {
            return Err(PersistenceError::DuplicateRecord(record.id().clone()));
        }
        self.records.insert(record.id().clone(), record.clone());
        Ok(())
    }

    fn delete(&mut self, id: &ResourceId) -> Result<(), PersistenceError> {
        self.records.remove(id);
        Ok(())
    }

    fn load(&self, id: &ResourceId) -> Result<Option<PersistentResource>, PersistenceError> {
        Ok(self.records.get(id).cloned())
    }

    fn load_all(&self) -> Result<Vec<PersistentResource>, PersistenceError> {
        Ok(self.records.values().cloned().collect())
    }
}

/// Driver storing one YAML document per record:
/// `<root>/<s1>/<s2>/<identifier>/resource.yaml`.
///
/// The sharded layout keeps directory fan-out bounded however many records
/// accumulate. Unreadable documents are skipped (with a warning) when
/// scanning, so a single damaged file cannot take the whole store down.
#[derive(Debug)]
pub struct YamlFileDriver {
    root: PathBuf,
}

impl YamlFileDriver {
    /// Opens the record store rooted at `root`, creating the directory if
    /// necessary.
    pub fn open(root: &Path) -> Result<Self, PersistenceError> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn record_path(&self, id: &ResourceId) -> PathBuf {
        id.sharded_dir(&self.root).join(RECORD_FILE_NAME)
    }
}

impl PersistenceDriver for YamlFileDriver {
    fn insert(&mut self, record: &PersistentResource) -> Result<(), PersistenceError> {
        let path = self.record_path(record.id());
        if path.exists() {
            return Err(PersistenceError::DuplicateRecord(record.id().clone()));
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let document = serde_yaml::to_string(record)?;
        fs::write(&path, document)?;
        Ok(())
    }

    fn delete(&mut self, id: &ResourceId) -> Result<(), PersistenceError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path)?;

        // Prune the record directory and, when empty, its shard parents.
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
        Ok(())
    }

    fn load(&self, id: &ResourceId) -> Result<Option<PersistentResource>, PersistenceError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let document = fs::read_to_string(&path)?;
        let record: PersistentResource = serde_yaml::from_str(&document)?;
        Ok(Some(record))
    }

    fn load_all(&self) -> Result<Vec<PersistentResource>, PersistenceError> {
        let mut records = Vec::new();

        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(4)
            .max_depth(4)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() || entry.file_name() != RECORD_FILE_NAME {
                continue;
            }

            let document = match fs::read_to_string(entry.path()) {
                Ok(document) => document,
                Err(e) => {
                    tracing::warn!("failed to read record {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            match serde_yaml::from_str::<PersistentResource>(&document) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("failed to parse record {}: {}", entry.path().display(), e);
                }
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brs_ident::{Md5Hash, Sha1Hash};
    use tempfile::TempDir;

    fn sample_record(filename: &str) -> PersistentResource {
        let mut record = PersistentResource::new("persistent");
        record
            .attach_content(
                Sha1Hash::parse("c828d0f88ce197be1aff7cc2e5e86b1244241ac6").unwrap(),
                Md5Hash::parse("9e107d9d372bb6826bd81d3542a419d6").unwrap(),
                11,
            )
            .unwrap();
        record.set_filename(filename).unwrap();
        record
    }

    #[test]
    fn test_memory_driver_round_trip() {
        let mut driver = MemoryDriver::new();
        let record = sample_record("one.txt");

        driver.insert(&record).unwrap();
        let loaded = driver.load(record.id()).unwrap().unwrap();
        assert_eq!(loaded.filename(), "one.txt");

        driver.delete(record.id()).unwrap();
        assert!(driver.load(record.id()).unwrap().is_none());
    }

    #[test]
    fn test_memory_driver_rejects_duplicate_insert() {
        let mut driver = MemoryDriver::new();
        let record = sample_record("one.txt");

        driver.insert(&record).unwrap();
        assert!(matches!(
            driver.insert(&record),
            Err(PersistenceError::DuplicateRecord(_))
        ));
    }

    #[test]
    fn test_yaml_driver_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut driver = YamlFileDriver::open(&temp.path().join("records")).unwrap();
        let record = sample_record("document.pdf");

        driver.insert(&record).unwrap();

        // The record lives at the sharded path.
        let id_text = record.id().to_string();
        let expected = temp
            .path()
            .join("records")
            .join(&id_text[0..2])
            .join(&id_text[2..4])
            .join(&id_text)
            .join("resource.yaml");
        assert!(expected.is_file());

        let loaded = driver.load(record.id()).unwrap().unwrap();
        assert_eq!(loaded.filename(), "document.pdf");
        assert_eq!(loaded.sha1(), record.sha1());
        // Rehydrated records come back unprotected; protection is applied by
        // the repository layer.
        assert!(!loaded.is_protected());
    }

    #[test]
    fn test_yaml_driver_delete_prunes_shards() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("records");
        let mut driver = YamlFileDriver::open(&root).unwrap();
        let record = sample_record("gone.txt");

        driver.insert(&record).unwrap();
        driver.delete(record.id()).unwrap();

        assert!(driver.load(record.id()).unwrap().is_none());
        let id_text = record.id().to_string();
        assert!(!root.join(&id_text[0..2]).exists());
        assert!(root.exists());
    }

    #[test]
    fn test_yaml_driver_delete_missing_is_noop() {
        let temp = TempDir::new().unwrap();
        let mut driver = YamlFileDriver::open(&temp.path().join("records")).unwrap();
        assert!(driver.delete(&ResourceId::new()).is_ok());
    }

    #[test]
    fn test_yaml_driver_load_all_skips_damaged_records() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("records");
        let mut driver = YamlFileDriver::open(&root).unwrap();

        driver.insert(&sample_record("keep.txt")).unwrap();

        // Plant a damaged record document.
        let damaged_id = ResourceId::new();
        let damaged_dir = damaged_id.sharded_dir(&root);
        fs::create_dir_all(&damaged_dir).unwrap();
        fs::write(damaged_dir.join("resource.yaml"), "{ not yaml").unwrap();

        let records = driver.load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename(), "keep.txt");
    }
}
