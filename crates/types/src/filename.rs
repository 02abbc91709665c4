//! Filename normalisation and extension handling.

use crate::TypesError;

/// Maximum length of a resource filename.
pub const MAX_FILENAME_LEN: usize = 255;

/// Returns the extension of `filename`, or an empty string if it has none.
///
/// A leading dot does not start an extension (`.gitignore` has no extension),
/// and neither does a trailing dot (`archive.` has none).
pub fn file_extension(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => extension,
        _ => "",
    }
}

/// Normalises a filename for storage: trims whitespace, lowercases the
/// extension (only the extension — the stem keeps its case), and enforces the
/// length bound.
///
/// # Errors
///
/// Returns [`TypesError::Empty`] for blank input and
/// [`TypesError::TooLong`] when the normalised name exceeds
/// [`MAX_FILENAME_LEN`].
pub fn normalize_filename(filename: &str) -> Result<String, TypesError> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(TypesError::Empty);
    }

    let normalized = match trimmed.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            format!("{}.{}", stem, extension.to_ascii_lowercase())
        }
        _ => trimmed.to_owned(),
    };

    if normalized.len() > MAX_FILENAME_LEN {
        return Err(TypesError::TooLong {
            limit: MAX_FILENAME_LEN,
        });
    }

    Ok(normalized)
}
