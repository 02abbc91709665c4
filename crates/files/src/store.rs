//! Content-addressed blob store implementation.

use crate::{remove_empty_parents, FilesError, FilesResult};
use brs_ident::{Md5Hash, Sha1Hash};
use md5::Md5;
use sha1::{Digest, Sha1};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Directory below the store root holding all blob data.
const BLOBS_DIR_NAME: &str = "blobs";

/// Algorithm directory; blobs are addressed by SHA-1.
const ALGORITHM_DIR_NAME: &str = "sha1";

/// Staging directory for in-flight writes.
const TMP_DIR_NAME: &str = "tmp";

/// Monotonic counter distinguishing staging files created by this process.
static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Digests and size of one stored blob.
///
/// All three values are produced by the store in a single pass over the
/// content during import — callers never compute them separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    /// Primary content hash; also the blob's address within the store
    pub sha1: Sha1Hash,

    /// Secondary checksum, carried for consumers that expect one
    pub md5: Md5Hash,

    /// Content length in bytes
    pub size: u64,
}

/// A content-addressed blob store rooted at one directory.
///
/// # Design
///
/// - Content-addressed: blobs live at `blobs/sha1/<s1>/<s2>/<hash>`
/// - Deduplicating: storing already-present content is a successful no-op
/// - Atomic: writes go to `blobs/tmp/` and are renamed into place
/// - Defensive: the root is validated and canonicalised at construction
#[derive(Debug)]
pub struct BlobStore {
    /// Canonicalised store root
    root: PathBuf,
}

impl BlobStore {
    /// Opens a blob store at an existing root directory.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if the root does not
    /// exist, is not a directory, or cannot be canonicalised.
    pub fn open(root: &Path) -> FilesResult<Self> {
        if !root.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root.display()
            )));
        }

        if !root.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root.display()
            )));
        }

        let root = root.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    /// Creates the root directory (including parents) if necessary, then
    /// opens the store.
    pub fn create(root: &Path) -> FilesResult<Self> {
        fs::create_dir_all(root).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to create store root {}: {}", root.display(), e),
            ))
        })?;
        Self::open(root)
    }

    /// Stores in-memory content, returning its digests.
    ///
    /// If a blob with the same content already exists the call succeeds
    /// without touching it.
    pub fn put_bytes(&self, content: &[u8]) -> FilesResult<BlobRecord> {
        self.put_reader(&mut io::Cursor::new(content))
    }

    /// Stores the content of a file, returning its digests.
    ///
    /// The file is streamed through the digests into a staging file; it is
    /// never loaded into memory as a whole.
    pub fn put_file(&self, source_path: &Path) -> FilesResult<BlobRecord> {
        let mut file = fs::File::open(source_path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!(
                    "Failed to open source file {}: {}",
                    source_path.display(),
                    e
                ),
            ))
        })?;
        self.put_reader(&mut file)
    }

    /// Stores content from an arbitrary reader, returning its digests.
    pub fn put_reader(&self, source: &mut dyn Read) -> FilesResult<BlobRecord> {
        let staging_path = self.staging_path();
        if let Some(parent) = staging_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create staging directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let staging_file = fs::File::create(&staging_path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!(
                    "Failed to create staging file {}: {}",
                    staging_path.display(),
                    e
                ),
            ))
        })?;

        let record = match copy_and_digest(source, staging_file) {
            Ok(record) => record,
            Err(e) => {
                // Best-effort cleanup of the abandoned staging file.
                let _ = fs::remove_file(&staging_path);
                return Err(FilesError::Io(e));
            }
        };

        let blob_path = record.sha1.sharded_path(&self.algorithm_dir());
        if blob_path.exists() {
            // Content is already present; the staging copy is redundant.
            let _ = fs::remove_file(&staging_path);
            return Ok(record);
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FilesError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create blob directory {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        fs::rename(&staging_path, &blob_path).map_err(|e| {
            let _ = fs::remove_file(&staging_path);
            FilesError::Io(io::Error::new(
                e.kind(),
                format!(
                    "Failed to move staged blob into place at {}: {}",
                    blob_path.display(),
                    e
                ),
            ))
        })?;

        Ok(record)
    }

    /// Opens a stored blob for reading.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::BlobNotFound`] if no blob with that hash exists.
    pub fn open_blob(&self, sha1: &Sha1Hash) -> FilesResult<fs::File> {
        let blob_path = sha1.sharded_path(&self.algorithm_dir());
        if !blob_path.exists() {
            return Err(FilesError::BlobNotFound(sha1.to_string()));
        }

        fs::File::open(&blob_path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to open blob {}: {}", blob_path.display(), e),
            ))
        })
    }

    /// Returns true if a blob with the given hash is stored.
    pub fn contains(&self, sha1: &Sha1Hash) -> bool {
        sha1.sharded_path(&self.algorithm_dir()).exists()
    }

    /// Returns the path a blob with the given hash is (or would be) stored
    /// at. The blob need not exist.
    #[must_use]
    pub fn blob_path(&self, sha1: &Sha1Hash) -> PathBuf {
        sha1.sharded_path(&self.algorithm_dir())
    }

    /// Returns the size in bytes of a stored blob.
    pub fn blob_size(&self, sha1: &Sha1Hash) -> FilesResult<u64> {
        let blob_path = sha1.sharded_path(&self.algorithm_dir());
        let metadata = fs::metadata(&blob_path)
            .map_err(|_| FilesError::BlobNotFound(sha1.to_string()))?;
        Ok(metadata.len())
    }

    /// Deletes a stored blob and prunes shard directories it leaves empty.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::BlobNotFound`] if no blob with that hash exists.
    pub fn delete_blob(&self, sha1: &Sha1Hash) -> FilesResult<()> {
        let blob_path = sha1.sharded_path(&self.algorithm_dir());
        if !blob_path.exists() {
            return Err(FilesError::BlobNotFound(sha1.to_string()));
        }

        fs::remove_file(&blob_path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to delete blob {}: {}", blob_path.display(), e),
            ))
        })?;

        if let Some(parent) = blob_path.parent() {
            remove_empty_parents(parent, &self.algorithm_dir());
        }

        Ok(())
    }

    /// Lazily enumerates the hashes of all stored blobs.
    ///
    /// The walk is restartable per call; entries that do not look like blobs
    /// (stray files, staging leftovers) are skipped. Order is
    /// filesystem-defined.
    pub fn blobs(&self) -> impl Iterator<Item = Sha1Hash> {
        walkdir::WalkDir::new(self.algorithm_dir())
            .min_depth(3)
            .max_depth(3)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|name| Sha1Hash::parse(name).ok())
            })
    }

    /// Returns the canonicalised store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn algorithm_dir(&self) -> PathBuf {
        self.root.join(BLOBS_DIR_NAME).join(ALGORITHM_DIR_NAME)
    }

    fn staging_path(&self) -> PathBuf {
        let serial = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(BLOBS_DIR_NAME)
            .join(TMP_DIR_NAME)
            .join(format!("in-flight-{}-{}", std::process::id(), serial))
    }
}

/// Copies `source` into `sink` while computing SHA-1, MD5 and length in one
/// pass.
fn copy_and_digest(source: &mut dyn Read, mut sink: fs::File) -> io::Result<BlobRecord> {
    let record = stream_digest(source, &mut sink)?;
    sink.sync_all()?;
    Ok(record)
}

/// Computes the digests of everything `source` yields without storing it.
pub fn digest_reader(source: &mut dyn Read) -> io::Result<BlobRecord> {
    stream_digest(source, &mut io::sink())
}

/// Computes the digests of a file's content without storing it.
pub fn digest_file(path: &Path) -> io::Result<BlobRecord> {
    let mut file = fs::File::open(path)?;
    digest_reader(&mut file)
}

fn stream_digest(source: &mut dyn Read, sink: &mut dyn Write) -> io::Result<BlobRecord> {
    let mut sha1 = Sha1::new();
    let mut md5 = Md5::new();
    let mut size: u64 = 0;
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let read = source.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        let chunk = &buffer[..read];
        sha1.update(chunk);
        md5.update(chunk);
        sink.write_all(chunk)?;
        size += read as u64;
    }

    let sha1_bytes: [u8; 20] = sha1.finalize().into();
    let md5_bytes: [u8; 16] = md5.finalize().into();

    Ok(BlobRecord {
        sha1: Sha1Hash::from_bytes(&sha1_bytes),
        md5: Md5Hash::from_bytes(&md5_bytes),
        size,
    })
}
