//! IANA media types and their derivation from filenames.

use crate::TypesError;

/// Media type lookup table: lowercase filename extension to IANA media type.
///
/// The table covers the formats commonly pushed through resource imports;
/// anything else falls back to `application/octet-stream`. Kept as a plain
/// sorted slice — the table is tiny and a linear scan is fine.
const MEDIA_TYPES_BY_EXTENSION: &[(&str, &str)] = &[
    ("7z", "application/x-7z-compressed"),
    ("aac", "audio/aac"),
    ("avif", "image/avif"),
    ("bmp", "image/bmp"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("eot", "application/vnd.ms-fontobject"),
    ("gif", "image/gif"),
    ("gz", "application/gzip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/vnd.microsoft.icon"),
    ("ics", "text/calendar"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "text/javascript"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("mjs", "text/javascript"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("oga", "audio/ogg"),
    ("ogg", "audio/ogg"),
    ("ogv", "video/ogg"),
    ("otf", "font/otf"),
    ("pdf", "application/pdf"),
    ("png", "image/png"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("rtf", "application/rtf"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ttf", "font/ttf"),
    ("txt", "text/plain"),
    ("wasm", "application/wasm"),
    ("wav", "audio/wav"),
    ("weba", "audio/webm"),
    ("webm", "video/webm"),
    ("webp", "image/webp"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("xml", "application/xml"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("zip", "application/zip"),
];

/// Fallback media type for unknown content.
const OCTET_STREAM: &str = "application/octet-stream";

/// An IANA media type string, non-empty and at most 100 characters.
///
/// The length bound matches the column width the durable record format
/// reserves for media types; the value itself is treated as opaque beyond
/// that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType(String);

impl MediaType {
    /// Maximum length of a media type value.
    pub const MAX_LEN: usize = 100;

    /// Creates a validated `MediaType` from the given input.
    ///
    /// The input is trimmed; an empty result or one longer than
    /// [`MediaType::MAX_LEN`] is rejected.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(TypesError::TooLong {
                limit: Self::MAX_LEN,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Derives the media type from a filename's extension.
    ///
    /// The extension is matched case-insensitively against a fixed table of
    /// common types; filenames without an extension, or with an unknown one,
    /// map to `application/octet-stream`.
    pub fn from_filename(filename: &str) -> Self {
        let extension = crate::file_extension(filename).to_ascii_lowercase();
        let media_type = MEDIA_TYPES_BY_EXTENSION
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, media_type)| *media_type)
            .unwrap_or(OCTET_STREAM);
        Self(media_type.to_owned())
    }

    /// Best-effort detection of the media type from content bytes.
    ///
    /// This is not authoritative; returns `None` when the content matches no
    /// known signature.
    pub fn from_content(content: &[u8]) -> Option<Self> {
        infer::get(content).map(|kind| Self(kind.mime_type().to_owned()))
    }

    /// The fallback media type for content of unknown shape.
    pub fn octet_stream() -> Self {
        Self(OCTET_STREAM.to_owned())
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MediaType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for MediaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for MediaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MediaType::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename_known_extensions() {
        assert_eq!(MediaType::from_filename("notes.txt").as_str(), "text/plain");
        assert_eq!(MediaType::from_filename("photo.png").as_str(), "image/png");
        assert_eq!(
            MediaType::from_filename("photo.JPEG").as_str(),
            "image/jpeg"
        );
        assert_eq!(
            MediaType::from_filename("archive.tar").as_str(),
            "application/x-tar"
        );
    }

    #[test]
    fn test_from_filename_unknown_extension_falls_back() {
        assert_eq!(
            MediaType::from_filename("data.qz9").as_str(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_from_filename_without_extension_falls_back() {
        assert_eq!(
            MediaType::from_filename("README").as_str(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_from_content_detects_png() {
        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let detected = MediaType::from_content(&png_header);
        assert_eq!(detected.map(|m| m.as_str().to_owned()), Some("image/png".to_owned()));
    }

    #[test]
    fn test_from_content_unknown_is_none() {
        assert!(MediaType::from_content(b"nothing recognisable here").is_none());
    }

    #[test]
    fn test_new_rejects_empty_and_overlong() {
        assert!(matches!(MediaType::new("   "), Err(TypesError::Empty)));
        let long = "a".repeat(MediaType::MAX_LEN + 1);
        assert!(matches!(
            MediaType::new(long),
            Err(TypesError::TooLong { .. })
        ));
    }

    #[test]
    fn test_serde_round_trip() {
        let media_type = MediaType::new("image/svg+xml").unwrap();
        let json = serde_json::to_string(&media_type).unwrap();
        let back: MediaType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, media_type);
    }
}
