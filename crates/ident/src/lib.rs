//! Identifier and content-hash utilities.
//!
//! BRS addresses stored content by hash and addresses metadata records by a
//! canonical record identifier. Both kinds of value travel through
//! configuration files, URIs and on-disk paths, so this crate pins down one
//! *canonical* textual form for each and guarantees it at the type level:
//!
//! - [`ResourceId`] — **32 lowercase hexadecimal characters** (no hyphens),
//!   the identity of one metadata record.
//! - [`Sha1Hash`] — **40 lowercase hexadecimal characters**, the identity of
//!   one piece of content. Several records may share a hash; the hash is the
//!   deduplication unit, not the record identity.
//! - [`Md5Hash`] — **32 lowercase hexadecimal characters**, a secondary
//!   checksum with no uniqueness role.
//!
//! ## Canonical forms
//! - Characters: `0-9` and `a-f` only, fixed length per type.
//! - [`ResourceId::parse`] is strict: non-canonical input (uppercase,
//!   hyphenated, wrong length) is rejected.
//! - The hash parsers accept mixed-case hex and normalise to lowercase,
//!   because hashes routinely arrive from external tools that print
//!   uppercase digests. Wrong length or non-hex input is rejected.
//!
//! ## Sharded path layout
//! Large stores fan content out over fixed-depth subdirectories derived from
//! the leading characters of the identifier, preventing oversized
//! directories. For an identifier `u`:
//! `parent/<u[0..2]>/<u[2..4]>/<u>/`

mod hash;
mod id;

pub use hash::{Md5Hash, Sha1Hash};
pub use id::ResourceId;

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type IdentResult<T> = Result<T, IdentError>;

/// Returns true if `input` consists of exactly `len` lowercase hex characters.
pub(crate) fn is_canonical_hex(input: &str, len: usize) -> bool {
    input.len() == len
        && input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Returns true if `input` consists of exactly `len` hex characters of any case.
pub(crate) fn is_hex(input: &str, len: usize) -> bool {
    input.len() == len && input.bytes().all(|b| b.is_ascii_hexdigit())
}
