//! On-disk key-value store.
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   config                      version=1, algo=<algorithm>
//!   objects/<algo>/<aa>/<key>   one file per key (hex), sharded by first byte
//! ```
//!
//! Each value file starts with a 16-byte header:
//!
//! ```text
//! 0x00  4   "MDKV" magic
//! 0x04  1   version (u8) = 1
//! 0x05  1   algo: 1=blake3-256, 2=sha2-256
//! 0x06  1   compression: 0=none, 1=zstd
//! 0x07  1   reserved (must be 0)
//! 0x08  8   payload_len (u64 LE) - stored (possibly compressed) size
//! 0x10  ... payload
//! ```

use crate::error::{Error, Result};
use crate::hash::Algorithm;
use crate::kv::KvStore;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Magic bytes at the start of every value file.
pub const MAGIC: &[u8; 4] = b"MDKV";

/// Current value file format version.
pub const VERSION: u8 = 1;

/// Size of the value header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Compression threshold: values >= 4KB are compressed.
const COMPRESSION_THRESHOLD: usize = 4096;

/// Payload compression recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None = 0,
    Zstd = 1,
}

impl TryFrom<u8> for CompressionType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Zstd),
            other => Err(Error::decode(format!("unknown compression type {}", other))),
        }
    }
}

/// The fixed header in front of every stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueHeader {
    /// Hash algorithm of the store that wrote the value.
    pub algorithm: Algorithm,
    pub compression: CompressionType,
    /// Stored payload size, after compression.
    pub payload_len: u64,
}

impl ValueHeader {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let (head, len) = buf.split_at_mut(8);
        head[..4].copy_from_slice(MAGIC);
        head[4..].copy_from_slice(&[VERSION, self.algorithm.id(), self.compression as u8, 0]);
        len.copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Parse the header at the start of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let Some(head) = buf.get(..HEADER_SIZE) else {
            return Err(Error::decode(format!(
                "value of {} bytes is shorter than its {}-byte header",
                buf.len(),
                HEADER_SIZE
            )));
        };

        let (magic, fields) = head.split_at(4);
        if magic != MAGIC {
            return Err(Error::decode(format!("bad value magic {:02x?}", magic)));
        }
        if fields[0] != VERSION {
            return Err(Error::decode(format!(
                "value format version {} is not supported",
                fields[0]
            )));
        }
        if fields[3] != 0 {
            return Err(Error::decode(format!(
                "reserved header byte is {}, not 0",
                fields[3]
            )));
        }

        let len: [u8; 8] = fields[4..].try_into().map_err(Error::decode)?;
        Ok(Self {
            algorithm: Algorithm::from_id(fields[1])?,
            compression: CompressionType::try_from(fields[2])?,
            payload_len: u64::from_le_bytes(len),
        })
    }
}

/// A key-value store backed by one file per key.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    algorithm: Algorithm,
}

impl FsStore {
    /// Initialize a new store at the given path.
    ///
    /// Creates `objects/<algo>/` and writes the `config` file.
    pub fn init<P: AsRef<Path>>(root: P, algorithm: Algorithm) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let objects_dir = root.join("objects").join(algorithm.as_str());
        fs::create_dir_all(&objects_dir)?;

        let config_content = format!("version=1\nalgo={}\n", algorithm.as_str());
        fs::write(root.join("config"), config_content)?;

        debug!(root = %root.display(), algo = %algorithm, "initialized store");
        Ok(Self { root, algorithm })
    }

    /// Open a store created by [`FsStore::init`].
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let config = match fs::read_to_string(root.join("config")) {
            Ok(config) => config,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let reason = if root.is_dir() {
                    "no config file"
                } else {
                    "not a directory"
                };
                return Err(Error::invalid_store(&root, reason));
            }
            Err(e) => return Err(e.into()),
        };
        let algorithm = parse_config(&root, &config)?;

        if !root.join("objects").join(algorithm.as_str()).is_dir() {
            return Err(Error::invalid_store(
                &root,
                format!("missing objects/{} directory", algorithm),
            ));
        }

        debug!(root = %root.display(), algo = %algorithm, "opened store");
        Ok(Self { root, algorithm })
    }

    /// Get the path of the file holding `key`.
    ///
    /// Returns: `objects/{algorithm}/{first byte hex}/{key hex}`
    pub fn object_path(&self, key: &[u8]) -> PathBuf {
        let name = hex::encode(key);
        let shard = name.get(..2).unwrap_or("00");
        self.root
            .join("objects")
            .join(self.algorithm.as_str())
            .join(shard)
            .join(name)
    }

    /// Get the root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the algorithm this store was initialized with.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Write a value file atomically using tempfile.
    fn write_atomic(&self, path: &Path, header: &ValueHeader, payload: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::invalid_store(path, "object path has no parent"))?;
        fs::create_dir_all(parent)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(&header.encode())?;
        temp_file.write_all(payload)?;
        temp_file.flush()?;
        temp_file.persist(path)?;

        Ok(())
    }
}

/// Read the algorithm from `key=value` config lines.
///
/// Blank lines, `#` comments and unknown keys are skipped.
fn parse_config(root: &Path, content: &str) -> Result<Algorithm> {
    let entries: HashMap<&str, &str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    match entries.get("version") {
        Some(&"1") => {}
        other => {
            return Err(Error::invalid_store(
                root,
                format!("unsupported config version {:?}", other),
            ));
        }
    }

    let algo = entries
        .get("algo")
        .ok_or_else(|| Error::invalid_store(root, "config has no algo entry"))?;
    Algorithm::parse(algo)
}

impl KvStore for FsStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::store_write(key, "empty key"));
        }

        let (payload, compression) = if value.len() >= COMPRESSION_THRESHOLD {
            let compressed =
                zstd::encode_all(value, 3).map_err(|e| Error::store_write(key, e))?;
            (compressed, CompressionType::Zstd)
        } else {
            (value.to_vec(), CompressionType::None)
        };

        let header = ValueHeader {
            algorithm: self.algorithm,
            compression,
            payload_len: payload.len() as u64,
        };

        let path = self.object_path(key);
        self.write_atomic(&path, &header, &payload)
            .map_err(|e| Error::store_write(key, e))?;

        trace!(key = %hex::encode(key), bytes = value.len(), "stored value");
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::store_read(key, e)),
        };

        let header = ValueHeader::decode(&raw)?;
        let payload = &raw[HEADER_SIZE..];
        if payload.len() as u64 != header.payload_len {
            return Err(Error::store_read(
                key,
                format!(
                    "Payload length mismatch: expected {}, got {}",
                    header.payload_len,
                    payload.len()
                ),
            ));
        }

        let value = match header.compression {
            CompressionType::None => payload.to_vec(),
            CompressionType::Zstd => {
                zstd::decode_all(payload).map_err(|e| Error::store_read(key, e))?
            }
        };
        Ok(Some(value))
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.object_path(key).exists())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        match fs::remove_file(self.object_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::store_write(key, e)),
        }
    }
}
