//! # Merkledag Core
//!
//! A content-addressed Merkle DAG over files and directories.
//!
//! Files are split into fixed-size blocks, directories become tree objects
//! linking their children by name, and every object is stored in a key-value
//! store under the hash of its encoding. The root hash identifies the whole
//! tree; any subpath can be resolved back to its bytes.
//!
//! ## Features
//!
//! - Fixed 256 KiB chunking with blob deduplication
//! - Iterative, bottom-up directory builder (no recursion depth limit)
//! - Optional parallel storing of sibling files
//! - Pluggable key-value stores: in-memory or on-disk with zstd compression
//! - BLAKE3 or SHA-256 addressing
//!
//! ## Example
//!
//! ```no_run
//! use merkledag_core::{Algorithm, DagBuilder, FsStore, WalkOptions, node_from_path, resolve};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Initialize a new store
//! let store = FsStore::init("./my-store", Algorithm::Blake3)?;
//!
//! // Add a directory, storing sibling files on four threads
//! let node = node_from_path(Path::new("./dir1"), WalkOptions::default())?;
//! let root = DagBuilder::new(&store, store.algorithm()).workers(4).add(&node)?;
//!
//! // Read one file back by path
//! let content = resolve(&store, &root, "dir3/dir4/c.txt")?.into_bytes()?;
//! println!("{}", String::from_utf8_lossy(&content));
//! # Ok(())
//! # }
//! ```

mod chunking;
mod codec;
mod error;
mod fs;
mod hash;
mod kv;
mod materialize;
mod node;
mod object;
mod resolve;
mod store;
mod walk;

pub use chunking::{BLOCK_SIZE, chunk_ranges, store_file};
pub use codec::{get, put};
pub use error::{Error, Result};
pub use fs::{FsDir, FsFile, WalkOptions, node_from_path};
pub use hash::{Algorithm, HASH_SIZE, Hash, Hasher};
pub use kv::{KvStore, MemoryStore};
pub use materialize::materialize;
pub use node::{Children, DirNode, FileNode, MemDir, MemFile, Node, NodeType};
pub use object::{LIST_MARKER, Link, Object, ObjectKind, TREE_MARKER};
pub use resolve::{Resolved, list, read_file, resolve, resolve_hash, write_file};
pub use store::{CompressionType, FsStore, ValueHeader};
pub use walk::{DagBuilder, add, store_dir};
