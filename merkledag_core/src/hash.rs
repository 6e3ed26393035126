//! Content addresses and the hash algorithms that produce them.

use crate::error::{Error, Result};
use digest::DynDigest;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Hash digest size in bytes (both supported algorithms produce 256-bit hashes).
pub const HASH_SIZE: usize = 32;

/// A boxed, independently owned hasher instance.
///
/// Every unit of work that hashes concurrently must own its own `Hasher`.
pub type Hasher = Box<dyn DynDigest + Send>;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// BLAKE3 with 256-bit output.
    #[default]
    Blake3,
    /// SHA-256.
    Sha256,
}

impl Algorithm {
    /// Returns the string representation of the algorithm (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3-256",
            Algorithm::Sha256 => "sha2-256",
        }
    }

    /// Parse algorithm from string.
    ///
    /// Accepts the canonical config names as well as the short CLI names.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blake3-256" | "blake3" => Ok(Algorithm::Blake3),
            "sha2-256" | "sha256" => Ok(Algorithm::Sha256),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// Returns the algorithm ID byte.
    pub fn id(&self) -> u8 {
        match self {
            Algorithm::Blake3 => 1,
            Algorithm::Sha256 => 2,
        }
    }

    /// Parse algorithm from ID byte.
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Algorithm::Blake3),
            2 => Ok(Algorithm::Sha256),
            _ => Err(Error::unsupported_algorithm(format!("ID {}", id))),
        }
    }

    /// Create a fresh hasher for this algorithm.
    pub fn hasher(&self) -> Hasher {
        match self {
            Algorithm::Blake3 => Box::new(blake3::Hasher::new()),
            Algorithm::Sha256 => Box::new(sha2::Sha256::default()),
        }
    }

    /// Hash raw bytes in one shot.
    pub fn digest(&self, data: &[u8]) -> Hash {
        let mut hasher = self.hasher();
        hasher.update(data);
        let out = hasher.finalize_reset();
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(&out);
        Hash(bytes)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 32-byte content address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Take a digest output, which must be exactly [`HASH_SIZE`] bytes.
    pub fn from_digest(digest: &[u8]) -> Result<Self> {
        digest.try_into().map(Hash).map_err(|_| {
            Error::invalid_hash(format!("expected {} bytes, got {}", HASH_SIZE, digest.len()))
        })
    }

    /// Parse a lowercase or uppercase hex string of 64 characters.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::invalid_hash(format!("{:?} is not hex: {}", hex_str, e)))?;
        Self::from_digest(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

/// On the wire a hash is its raw bytes, using the serializer's byte-array
/// convention (a JSON array of numbers, like object data).
impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        <[u8; HASH_SIZE]>::deserialize(deserializer).map(Hash)
    }
}
