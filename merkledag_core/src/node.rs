//! Source nodes: the files and directories a DAG is built from.
//!
//! A source tree is anything that can present itself as [`Node`]s. The
//! filesystem adapter lives in [`crate::fs`]; [`MemFile`] and [`MemDir`] build
//! trees in memory.

use crate::error::Result;
use std::io::{Cursor, Read};
use std::sync::Arc;

/// Iterator over the immediate children of a directory, in stable order.
pub type Children = Box<dyn Iterator<Item = Result<Node>>>;

/// A source file.
pub trait FileNode: Send + Sync {
    /// Base name of the file.
    fn name(&self) -> &str;

    /// Size in bytes. Exactly this many bytes are read from [`FileNode::open`].
    fn size(&self) -> u64;

    /// Open the file's content for sequential reading.
    fn open(&self) -> Result<Box<dyn Read + '_>>;
}

/// A source directory.
pub trait DirNode: Send {
    /// Base name of the directory.
    fn name(&self) -> &str;

    /// Size recorded in the parent's link for this directory.
    fn size(&self) -> u64;

    /// List the immediate children.
    ///
    /// Calling this twice on the same directory must yield the same order.
    fn children(&self) -> Result<Children>;
}

/// Node type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    File,
    Dir,
}

/// A file or a directory.
pub enum Node {
    File(Box<dyn FileNode>),
    Dir(Box<dyn DirNode>),
}

impl Node {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::File(_) => NodeType::File,
            Node::Dir(_) => NodeType::Dir,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::File(file) => file.name(),
            Node::Dir(dir) => dir.name(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Node::File(file) => file.size(),
            Node::Dir(dir) => dir.size(),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("type", &self.node_type())
            .field("name", &self.name())
            .field("size", &self.size())
            .finish()
    }
}

/// An in-memory file.
#[derive(Debug, Clone)]
pub struct MemFile {
    name: String,
    data: Arc<[u8]>,
}

impl MemFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: Arc::from(data.into()),
        }
    }
}

impl FileNode for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(&self.data[..])))
    }
}

#[derive(Debug, Clone)]
enum MemEntry {
    File(MemFile),
    Dir(MemDir),
}

/// An in-memory directory whose children keep insertion order.
///
/// Its size is the total number of file bytes beneath it.
#[derive(Debug, Clone)]
pub struct MemDir {
    name: String,
    size: u64,
    entries: Arc<Vec<MemEntry>>,
}

impl MemDir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            entries: Arc::new(Vec::new()),
        }
    }

    /// Append a file child.
    pub fn file(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let file = MemFile::new(name, data);
        self.size += file.size();
        Arc::make_mut(&mut self.entries).push(MemEntry::File(file));
        self
    }

    /// Append a subdirectory child.
    pub fn dir(mut self, dir: MemDir) -> Self {
        self.size += dir.size;
        Arc::make_mut(&mut self.entries).push(MemEntry::Dir(dir));
        self
    }
}

impl DirNode for MemDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn children(&self) -> Result<Children> {
        let entries = Arc::clone(&self.entries);
        let iter = (0..entries.len()).map(move |i| -> Result<Node> {
            Ok(match &entries[i] {
                MemEntry::File(file) => Node::File(Box::new(file.clone())),
                MemEntry::Dir(dir) => Node::Dir(Box::new(dir.clone())),
            })
        });
        Ok(Box::new(iter))
    }
}

impl From<MemFile> for Node {
    fn from(file: MemFile) -> Self {
        Node::File(Box::new(file))
    }
}

impl From<MemDir> for Node {
    fn from(dir: MemDir) -> Self {
        Node::Dir(Box::new(dir))
    }
}
