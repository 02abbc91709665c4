//! Content-hash value types.

use crate::{is_canonical_hex, is_hex, IdentError, IdentResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// SHA-1 content hash in canonical form (40 lowercase hex characters).
///
/// The SHA-1 hash is the *content identity* of a resource: any number of
/// metadata records may point at the same hash, and storage backends address
/// their bytes by it. Because of that, every layer that touches a hash gets
/// it through this type and can rely on the canonical form for path and URI
/// derivation.
///
/// # Construction
/// - [`Sha1Hash::parse`] validates a textual digest. Mixed-case input is
///   accepted and normalised to lowercase; wrong length or non-hex input is
///   rejected.
/// - [`Sha1Hash::from_bytes`] wraps a raw 20-byte digest, as produced by a
///   hasher.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sha1Hash(String);

impl Sha1Hash {
    /// Length of the canonical textual form.
    pub const LEN: usize = 40;

    /// Validates and parses a textual SHA-1 digest, normalising to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`IdentError::InvalidInput`] if `input` is not exactly 40 hex
    /// characters.
    pub fn parse(input: &str) -> IdentResult<Self> {
        if is_canonical_hex(input, Self::LEN) {
            return Ok(Self(input.to_owned()));
        }
        if is_hex(input, Self::LEN) {
            return Ok(Self(input.to_ascii_lowercase()));
        }
        Err(IdentError::InvalidInput(format!(
            "SHA-1 hash must be 40 hex characters, got: '{}'",
            input
        )))
    }

    /// Wraps a raw digest as produced by a SHA-1 hasher.
    pub fn from_bytes(bytes: &[u8; 20]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Returns the canonical textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `parent/<s1>/<s2>/<hash>` where `s1`/`s2` are the first two
    /// character pairs of the hash.
    ///
    /// This is the storage-side sharding scheme; it bounds directory fan-out
    /// for stores holding very many blobs.
    pub fn sharded_path(&self, parent_dir: &Path) -> PathBuf {
        let s1 = &self.0[0..2];
        let s2 = &self.0[2..4];
        parent_dir.join(s1).join(s2).join(&self.0)
    }

}

impl fmt::Display for Sha1Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Sha1Hash {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sha1Hash::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Sha1Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Sha1Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha1Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// MD5 content checksum in canonical form (32 lowercase hex characters).
///
/// Carried alongside the SHA-1 hash as a secondary checksum for consumers
/// that still expect one. It plays no role in deduplication or addressing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Md5Hash(String);

impl Md5Hash {
    /// Length of the canonical textual form.
    pub const LEN: usize = 32;

    /// Validates and parses a textual MD5 digest, normalising to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`IdentError::InvalidInput`] if `input` is not exactly 32 hex
    /// characters.
    pub fn parse(input: &str) -> IdentResult<Self> {
        if is_canonical_hex(input, Self::LEN) {
            return Ok(Self(input.to_owned()));
        }
        if is_hex(input, Self::LEN) {
            return Ok(Self(input.to_ascii_lowercase()));
        }
        Err(IdentError::InvalidInput(format!(
            "MD5 hash must be 32 hex characters, got: '{}'",
            input
        )))
    }

    /// Wraps a raw digest as produced by an MD5 hasher.
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Returns the canonical textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Md5Hash {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Md5Hash::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Md5Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Md5Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Md5Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA1: &str = "c828d0f88ce197be1aff7cc2e5e86b1244241ac6";
    const MD5: &str = "9e107d9d372bb6826bd81d3542a419d6";

    #[test]
    fn test_sha1_parse_lowercase() {
        let hash = Sha1Hash::parse(SHA1).unwrap();
        assert_eq!(hash.as_str(), SHA1);
    }

    #[test]
    fn test_sha1_parse_normalises_mixed_case() {
        let hash = Sha1Hash::parse(&SHA1.to_ascii_uppercase()).unwrap();
        assert_eq!(hash.as_str(), SHA1);
    }

    #[test]
    fn test_sha1_parse_rejects_wrong_length() {
        // 39 characters
        assert!(Sha1Hash::parse(&SHA1[..39]).is_err());
        // 41 characters
        assert!(Sha1Hash::parse(&format!("{}0", SHA1)).is_err());
        assert!(Sha1Hash::parse("").is_err());
    }

    #[test]
    fn test_sha1_parse_rejects_non_hex() {
        let bad = format!("{}g", &SHA1[..39]);
        assert!(matches!(
            Sha1Hash::parse(&bad),
            Err(IdentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sha1_from_bytes() {
        let bytes = [0xc8u8; 20];
        let hash = Sha1Hash::from_bytes(&bytes);
        assert_eq!(hash.as_str(), "c8".repeat(20));
    }

    #[test]
    fn test_sha1_sharded_path() {
        let hash = Sha1Hash::parse(SHA1).unwrap();
        let path = hash.sharded_path(Path::new("blobs"));
        assert_eq!(path, Path::new("blobs").join("c8").join("28").join(SHA1));
    }

    #[test]
    fn test_md5_parse_and_normalise() {
        let hash = Md5Hash::parse(&MD5.to_ascii_uppercase()).unwrap();
        assert_eq!(hash.as_str(), MD5);
    }

    #[test]
    fn test_md5_rejects_sha1_length() {
        assert!(Md5Hash::parse(SHA1).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_hash_serde_round_trip() {
        let hash = Sha1Hash::parse(SHA1).unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        let back: Sha1Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);

        let bad: Result<Sha1Hash, _> = serde_json::from_str("\"zz\"");
        assert!(bad.is_err());
    }
}
