//! Hash identities for content-addressed storage
//!
//! Every stored object is identified by a `(kind, algorithm, hex digest)`
//! triple, serialized as `kind:algorithm:hex`. The serialized form is used
//! both as a database key and as input to higher-level hashes: trees hash
//! over the identities of their members, commits over their headers and
//! tree.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

/// Delimiter between the fields of a serialized identity
pub const HASH_VALUE_DELIMITER: &str = ":";

/// The kind of object an identity refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Chunk,
    Blob,
    FileId,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Chunk => "chunk",
            ObjectKind::Blob => "blob",
            ObjectKind::FileId => "file_id",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }
}

impl FromStr for ObjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "chunk" => Ok(ObjectKind::Chunk),
            "blob" => Ok(ObjectKind::Blob),
            "file_id" => Ok(ObjectKind::FileId),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            other => Err(Error::Hash(format!("unknown object kind '{other}'"))),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of hash algorithms the system ships with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "sha3-256")]
    Sha3_256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha3_256 => "sha3-256",
        }
    }

    /// Digest length in hex characters
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha3_256 => 64,
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha3_256
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha3-256" => Ok(HashAlgorithm::Sha3_256),
            other => Err(Error::Hash(format!("unknown hash algorithm '{other}'"))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete object identity: `kind:algorithm:hex`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HashValue {
    pub kind: ObjectKind,
    pub algorithm: HashAlgorithm,
    pub hex_digest: String,
}

impl HashValue {
    pub fn new(kind: ObjectKind, algorithm: HashAlgorithm, hex_digest: String) -> Self {
        Self {
            kind,
            algorithm,
            hex_digest,
        }
    }

    /// Parse a serialized `kind:algorithm:hex` identity
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, HASH_VALUE_DELIMITER);
        let (kind, algo, hex) = match (parts.next(), parts.next(), parts.next()) {
            (Some(k), Some(a), Some(h)) => (k, a, h),
            _ => return Err(Error::Hash(format!("malformed hash identity '{s}'"))),
        };
        let algorithm: HashAlgorithm = algo.parse()?;
        if hex.len() != algorithm.hex_len() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Hash(format!("malformed hex digest '{hex}'")));
        }
        Ok(Self {
            kind: kind.parse()?,
            algorithm,
            hex_digest: hex.to_ascii_lowercase(),
        })
    }

    /// The serialized form fed into higher-level hashes
    pub fn hash_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.kind, HASH_VALUE_DELIMITER, self.algorithm, HASH_VALUE_DELIMITER, self.hex_digest
        )
    }
}

/// Incremental hasher for streaming data through a named algorithm
pub struct Hasher {
    algorithm: HashAlgorithm,
    inner: Sha3_256,
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            inner: Sha3_256::new(),
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Update the hash with more data
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalize and return the lowercase hex digest
    pub fn finalize_hex(self) -> String {
        hex_encode(&self.inner.finalize())
    }

    /// Finalize into a full identity of the given kind
    pub fn finalize_value(self, kind: ObjectKind) -> HashValue {
        let algorithm = self.algorithm;
        HashValue::new(kind, algorithm, hex_encode(&self.inner.finalize()))
    }
}

impl std::io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Hash a byte slice, returning the lowercase hex digest
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Hash a byte slice into a full identity of the given kind
pub fn hash_value(kind: ObjectKind, algorithm: HashAlgorithm, data: &[u8]) -> HashValue {
    HashValue::new(kind, algorithm, hash_bytes(algorithm, data))
}

fn hex_encode(digest: &[u8]) -> String {
    const HEX_CHARS: &[u8] = b"0123456789abcdef";
    let mut hex = String::with_capacity(digest.len() * 2);
    for &byte in digest {
        hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
        hex.push(HEX_CHARS[(byte & 0xf) as usize] as char);
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let data = b"hello world";
        let hash1 = hash_bytes(HashAlgorithm::Sha3_256, data);
        let hash2 = hash_bytes(HashAlgorithm::Sha3_256, data);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_known_digest() {
        // sha3-256 of the empty string
        let hash = hash_bytes(HashAlgorithm::Sha3_256, b"");
        assert_eq!(
            hash,
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_hex_is_lowercase() {
        let hash = hash_bytes(HashAlgorithm::Sha3_256, b"case check");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let direct = hash_bytes(HashAlgorithm::Sha3_256, b"hello world");

        let mut incremental = Hasher::new(HashAlgorithm::Sha3_256);
        incremental.update(b"hello ");
        incremental.update(b"world");
        assert_eq!(direct, incremental.finalize_hex());
    }

    #[test]
    fn test_identity_roundtrip() {
        let value = hash_value(ObjectKind::Blob, HashAlgorithm::Sha3_256, b"roundtrip");
        let serialized = value.to_string();
        assert!(serialized.starts_with("blob:sha3-256:"));

        let parsed = HashValue::parse(&serialized).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_identity_rejects_malformed() {
        assert!(HashValue::parse("blob").is_err());
        assert!(HashValue::parse("blob:sha3-256").is_err());
        assert!(HashValue::parse("blob:md5:abcd").is_err());
        assert!(HashValue::parse("gadget:sha3-256:abcd").is_err());
        // digest too short
        assert!(HashValue::parse("blob:sha3-256:abcd").is_err());
        // digest contains non-hex
        let bad = format!("blob:sha3-256:{}", "g".repeat(64));
        assert!(HashValue::parse(&bad).is_err());
    }

    #[test]
    fn test_identity_is_hash_input() {
        let value = hash_value(ObjectKind::Chunk, HashAlgorithm::Sha3_256, b"data");
        assert_eq!(value.hash_bytes(), value.to_string().into_bytes());
    }

    #[test]
    fn test_different_kinds_distinct_identities() {
        let blob = hash_value(ObjectKind::Blob, HashAlgorithm::Sha3_256, b"same bytes");
        let chunk = hash_value(ObjectKind::Chunk, HashAlgorithm::Sha3_256, b"same bytes");
        assert_eq!(blob.hex_digest, chunk.hex_digest);
        assert_ne!(blob.to_string(), chunk.to_string());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!(
            "sha3-256".parse::<HashAlgorithm>().unwrap(),
            HashAlgorithm::Sha3_256
        );
        assert!("sha1".parse::<HashAlgorithm>().is_err());
    }
}
