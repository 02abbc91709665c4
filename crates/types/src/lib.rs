//! Shared value types for BRS: media types and filename handling.
//!
//! Resources are presented to users under a filename, and delivered over the
//! web under an IANA media type derived from that filename's extension. Both
//! values are bounded and normalised here so that every layer above can store
//! and compare them without re-validating.

mod filename;
mod media_type;

pub use filename::{file_extension, normalize_filename, MAX_FILENAME_LEN};
pub use media_type::MediaType;

/// Errors that can occur when creating validated text values.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input text exceeded the allowed length
    #[error("Text exceeds the maximum length of {limit} characters")]
    TooLong {
        /// The limit that was exceeded
        limit: usize,
    },
}
