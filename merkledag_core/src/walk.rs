//! Building DAGs from source trees.
//!
//! Directories are traversed with an explicit stack of frames, one per
//! directory under construction, so depth is bounded by memory rather than by
//! the call stack. A directory's tree object is written only after every
//! descendant has been written, and its link is added to the parent only then.

use crate::chunking::store_file;
use crate::codec;
use crate::error::Result;
use crate::hash::{Algorithm, Hash};
use crate::kv::KvStore;
use crate::node::{Children, DirNode, FileNode, Node};
use crate::object::{Link, Object};
use digest::DynDigest;
use std::thread;
use tracing::{debug, info};

/// Number of sibling files gathered per batch for each worker.
const FILES_PER_WORKER: usize = 16;

/// Store a file or directory and return its root hash.
pub fn add(store: &dyn KvStore, node: &Node, hasher: &mut dyn DynDigest) -> Result<Hash> {
    let hash = match node {
        Node::File(file) => store_file(store, file.as_ref(), hasher)?,
        Node::Dir(dir) => store_dir(store, dir.as_ref(), hasher)?,
    };
    info!(name = node.name(), kind = ?node.node_type(), hash = %hash, "added node");
    Ok(hash)
}

/// Store a directory tree and return the hash of its root tree object.
///
/// Any error from a child aborts the whole build.
pub fn store_dir(
    store: &dyn KvStore,
    root: &dyn DirNode,
    hasher: &mut dyn DynDigest,
) -> Result<Hash> {
    build_tree(store, root, hasher, 1, &mut |files, hasher| {
        files
            .iter()
            .map(|file| store_file(store, file.as_ref(), hasher))
            .collect()
    })
}

/// Builds DAGs, optionally storing sibling files on several threads.
///
/// Each worker owns a hasher created from the builder's algorithm. Files are
/// joined before their links are appended, in iteration order, so the result
/// is identical to a sequential build.
pub struct DagBuilder<'a> {
    store: &'a dyn KvStore,
    algorithm: Algorithm,
    workers: usize,
}

impl<'a> DagBuilder<'a> {
    /// Create a sequential builder.
    pub fn new(store: &'a dyn KvStore, algorithm: Algorithm) -> Self {
        Self {
            store,
            algorithm,
            workers: 1,
        }
    }

    /// Set the number of worker threads used for sibling files.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Store a file or directory and return its root hash.
    pub fn add(&self, node: &Node) -> Result<Hash> {
        let mut hasher = self.algorithm.hasher();
        match node {
            Node::Dir(dir) if self.workers > 1 => {
                let store = self.store;
                let algorithm = self.algorithm;
                let workers = self.workers;
                let hash = build_tree(
                    store,
                    dir.as_ref(),
                    hasher.as_mut(),
                    workers * FILES_PER_WORKER,
                    &mut |files, _| store_files_parallel(store, files, algorithm, workers),
                )?;
                info!(name = dir.name(), workers, hash = %hash, "added directory");
                Ok(hash)
            }
            _ => add(self.store, node, hasher.as_mut()),
        }
    }
}

/// Stores a batch of sibling files, returning their hashes in order.
type StoreFiles<'f> = dyn FnMut(&[Box<dyn FileNode>], &mut dyn DynDigest) -> Result<Vec<Hash>> + 'f;

/// A directory under construction.
struct Frame {
    name: String,
    size: u64,
    children: Children,
    tree: Object,
}

impl Frame {
    fn open(dir: &dyn DirNode) -> Result<Self> {
        Ok(Self {
            name: dir.name().to_string(),
            size: dir.size(),
            children: dir.children()?,
            tree: Object::tree(),
        })
    }
}

fn build_tree(
    store: &dyn KvStore,
    root: &dyn DirNode,
    hasher: &mut dyn DynDigest,
    batch_limit: usize,
    store_files: &mut StoreFiles<'_>,
) -> Result<Hash> {
    let mut stack = vec![Frame::open(root)?];
    let mut batch: Vec<Box<dyn FileNode>> = Vec::new();

    while let Some(mut frame) = stack.pop() {
        let mut subdir = None;
        let mut exhausted = false;

        while batch.len() < batch_limit {
            match frame.children.next() {
                Some(child) => match child? {
                    Node::File(file) => batch.push(file),
                    Node::Dir(dir) => {
                        subdir = Some(dir);
                        break;
                    }
                },
                None => {
                    exhausted = true;
                    break;
                }
            }
        }

        if !batch.is_empty() {
            let hashes = store_files(&batch, hasher)?;
            for (file, hash) in batch.drain(..).zip(hashes) {
                frame
                    .tree
                    .links
                    .push(Link::new(file.name(), hash, file.size()));
            }
        }

        if let Some(dir) = subdir {
            let child = Frame::open(dir.as_ref())?;
            stack.push(frame);
            stack.push(child);
        } else if exhausted {
            let hash = codec::put(store, &frame.tree, hasher)?;
            debug!(
                name = %frame.name,
                links = frame.tree.links.len(),
                depth = stack.len(),
                hash = %hash,
                "stored directory"
            );
            match stack.last_mut() {
                Some(parent) => parent
                    .tree
                    .links
                    .push(Link::new(frame.name, hash, frame.size)),
                None => return Ok(hash),
            }
        } else {
            stack.push(frame);
        }
    }

    unreachable!("directory stack emptied before the root tree was stored")
}

fn store_files_parallel(
    store: &dyn KvStore,
    files: &[Box<dyn FileNode>],
    algorithm: Algorithm,
    workers: usize,
) -> Result<Vec<Hash>> {
    let per_worker = files.len().div_ceil(workers).max(1);

    thread::scope(|scope| {
        let handles: Vec<_> = files
            .chunks(per_worker)
            .map(|group| {
                scope.spawn(move || {
                    let mut hasher = algorithm.hasher();
                    group
                        .iter()
                        .map(|file| store_file(store, file.as_ref(), hasher.as_mut()))
                        .collect::<Result<Vec<Hash>>>()
                })
            })
            .collect();

        let mut hashes = Vec::with_capacity(files.len());
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(group)) => hashes.extend(group),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(hashes),
        }
    })
}
