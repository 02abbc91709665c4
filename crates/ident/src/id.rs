//! Canonical record identifiers.

use crate::{is_canonical_hex, IdentError, IdentResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// The canonical identity of one metadata record (32 lowercase hex characters,
/// no hyphens).
///
/// This wrapper guarantees that once constructed, the contained identifier is
/// in canonical form. Record identity is deliberately distinct from content
/// identity: two records with different `ResourceId`s may describe the same
/// bytes (same SHA-1), which is exactly the situation the deduplication logic
/// reasons about.
///
/// # Construction
/// - [`ResourceId::new`] allocates a fresh identifier (UUID v4).
/// - [`ResourceId::parse`] validates an externally supplied identifier.
///
/// # Errors
/// [`ResourceId::parse`] returns [`IdentError::InvalidInput`] if the input is
/// not already canonical. Other common UUID forms (hyphenated, uppercase) are
/// *not* normalised; callers must provide the canonical representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(Uuid);

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceId {
    /// Allocates a fresh identifier in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns [`IdentError::InvalidInput`] if `input` is not 32 lowercase
    /// hex characters.
    pub fn parse(input: &str) -> IdentResult<Self> {
        if is_canonical_hex(input, 32) {
            let uuid = Uuid::parse_str(input).expect("canonical form guarantees a valid UUID");
            return Ok(Self(uuid));
        }
        Err(IdentError::InvalidInput(format!(
            "record identifier must be 32 lowercase hex characters without hyphens, got: '{}'",
            input
        )))
    }

    /// Returns `parent/<s1>/<s2>/<id>/` where `s1`/`s2` are derived from this
    /// identifier.
    ///
    /// `s1` is the first two hex characters, `s2` the next two. The full
    /// identifier forms the leaf directory. This keeps fan-out bounded no
    /// matter how many records a store accumulates.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ResourceId {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_new_is_canonical() {
        let id = ResourceId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert!(text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn test_parse_round_trip() {
        let id = ResourceId::new();
        let parsed = ResourceId::parse(&id.to_string()).expect("canonical form must parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_hyphenated() {
        let result = ResourceId::parse("550e8400-e29b-41d4-a716-446655440000");
        assert!(matches!(result, Err(IdentError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        let result = ResourceId::parse("550E8400E29B41D4A716446655440000");
        assert!(matches!(result, Err(IdentError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(ResourceId::parse("550e8400e29b41d4a71644665544000").is_err());
        assert!(ResourceId::parse("550e8400e29b41d4a7164466554400001").is_err());
        assert!(ResourceId::parse("").is_err());
    }

    #[test]
    fn test_sharded_dir_layout() {
        let id = ResourceId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let dir = id.sharded_dir(Path::new("records"));
        assert_eq!(
            dir,
            Path::new("records")
                .join("55")
                .join("0e")
                .join("550e8400e29b41d4a716446655440000")
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_canonical_text() {
        let id = ResourceId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        let bad: Result<ResourceId, _> = serde_json::from_str("\"not-a-uuid\"");
        assert!(bad.is_err());
    }
}
