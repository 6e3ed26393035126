//! Fixed-size chunking of file content into blobs and lists.

use crate::codec;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::kv::KvStore;
use crate::node::FileNode;
use crate::object::{Link, Object};
use digest::DynDigest;
use std::io::{ErrorKind, Read};
use std::ops::Range;
use tracing::{debug, trace};

/// Chunk size in bytes. Files up to this size are stored as a single blob.
pub const BLOCK_SIZE: u64 = 256 * 1024;

/// Partition `[0, size)` into contiguous `BLOCK_SIZE` ranges.
///
/// The last range holds the remainder, or a full block when `size` is a
/// multiple of `BLOCK_SIZE`. Every byte is covered exactly once and a zero
/// size yields no ranges.
pub fn chunk_ranges(size: u64) -> impl Iterator<Item = Range<u64>> {
    (0..size.div_ceil(BLOCK_SIZE)).map(move |i| {
        let start = i * BLOCK_SIZE;
        start..(start + BLOCK_SIZE).min(size)
    })
}

/// Store a file and return its root hash.
///
/// Files of at most `BLOCK_SIZE` bytes become one blob. Larger files are
/// stored block by block, each blob written before the list that links them.
pub fn store_file(
    store: &dyn KvStore,
    file: &dyn FileNode,
    hasher: &mut dyn DynDigest,
) -> Result<Hash> {
    let size = file.size();
    let mut reader = file.open()?;

    if size <= BLOCK_SIZE {
        let data = read_block(&mut reader, file.name(), size)?;
        let hash = codec::put(store, &Object::blob(data), hasher)?;
        debug!(name = file.name(), size, hash = %hash, "stored file as blob");
        return Ok(hash);
    }

    let mut list = Object::list();
    for range in chunk_ranges(size) {
        let len = range.end - range.start;
        let data = read_block(&mut reader, file.name(), len)?;
        let hash = codec::put(store, &Object::blob(data), hasher)?;
        trace!(name = file.name(), offset = range.start, len, hash = %hash, "stored chunk");
        list.links.push(Link::chunk(hash, len));
    }

    let hash = codec::put(store, &list, hasher)?;
    debug!(
        name = file.name(),
        size,
        chunks = list.links.len(),
        hash = %hash,
        "stored file as list"
    );
    Ok(hash)
}

/// Read exactly `len` bytes, reporting a short source as a read failure.
fn read_block(reader: &mut impl Read, name: &str, len: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::source_read(name, format!("source ended before {} declared bytes", len))
        } else {
            Error::source_read(name, e)
        }
    })?;
    Ok(buf)
}
