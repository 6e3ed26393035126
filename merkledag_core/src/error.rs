//! Error types for merkledag_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using merkledag_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or resolving a DAG.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error that is not attributable to a source node or a store call.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Reading a source file or directory (metadata or bytes) failed.
    #[error("Failed to read source {path}: {reason}")]
    SourceRead { path: String, reason: String },

    /// The backing store rejected a write.
    #[error("Store write failed for {key}: {reason}")]
    StoreWrite { key: String, reason: String },

    /// The backing store failed to serve a read.
    #[error("Store read failed for {key}: {reason}")]
    StoreRead { key: String, reason: String },

    /// An object could not be serialized.
    #[error("Failed to encode object: {reason}")]
    Encode { reason: String },

    /// Stored bytes do not decode to a valid object.
    #[error("Failed to decode object: {reason}")]
    Decode { reason: String },

    /// Object not found in store.
    #[error("Object not found: {hash}")]
    ObjectNotFound { hash: String },

    /// A source node has a type the DAG cannot represent.
    #[error("Unsupported node type at {path}: {kind}")]
    UnsupportedNodeType { path: String, kind: String },

    /// A path segment did not match any link during resolution.
    #[error("Path not found: no entry '{segment}' under '{prefix}'")]
    PathNotFound { segment: String, prefix: String },

    /// Object content contradicts the links that reference it.
    #[error("Corrupted object {hash}: {reason}")]
    Corrupted { hash: String, reason: String },

    /// Invalid hash format or encoding.
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// Store is invalid or not initialized.
    #[error("Invalid store at {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },

    /// Invalid object type.
    #[error("Invalid object type: expected {expected}, got {got}")]
    InvalidObjectType { expected: String, got: String },

    /// Path already exists (for materialization).
    #[error("Path already exists: {path}")]
    PathExists { path: PathBuf },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
}

impl Error {
    /// Create a SourceRead error.
    pub fn source_read(path: impl Into<String>, reason: impl ToString) -> Self {
        Error::SourceRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a StoreWrite error.
    pub fn store_write(key: &[u8], reason: impl ToString) -> Self {
        Error::StoreWrite {
            key: hex::encode(key),
            reason: reason.to_string(),
        }
    }

    /// Create a StoreRead error.
    pub fn store_read(key: &[u8], reason: impl ToString) -> Self {
        Error::StoreRead {
            key: hex::encode(key),
            reason: reason.to_string(),
        }
    }

    /// Create an Encode error.
    pub fn encode(reason: impl ToString) -> Self {
        Error::Encode {
            reason: reason.to_string(),
        }
    }

    /// Create a Decode error.
    pub fn decode(reason: impl ToString) -> Self {
        Error::Decode {
            reason: reason.to_string(),
        }
    }

    /// Create an ObjectNotFound error.
    pub fn object_not_found(hash: impl Into<String>) -> Self {
        Error::ObjectNotFound { hash: hash.into() }
    }

    /// Create an UnsupportedNodeType error.
    pub fn unsupported_node_type(path: impl Into<String>, kind: impl Into<String>) -> Self {
        Error::UnsupportedNodeType {
            path: path.into(),
            kind: kind.into(),
        }
    }

    /// Create a PathNotFound error.
    pub fn path_not_found(segment: impl Into<String>, prefix: impl Into<String>) -> Self {
        Error::PathNotFound {
            segment: segment.into(),
            prefix: prefix.into(),
        }
    }

    /// Create a Corrupted error.
    pub fn corrupted(hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Corrupted {
            hash: hash.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidStore error.
    pub fn invalid_store(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidObjectType error.
    pub fn invalid_object_type(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::InvalidObjectType {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a PathExists error.
    pub fn path_exists(path: impl Into<PathBuf>) -> Self {
        Error::PathExists { path: path.into() }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
