//! DAG objects and their wire encoding.
//!
//! Every persisted unit is an [`Object`] with two fields, `links` and `data`.
//! The three logical shapes are told apart by their content:
//!
//! ```text
//! blob   links: []              data: <raw chunk bytes>
//! list   links: [{"", h, n}..]  data: "list"
//! tree   links: [{name, h, n}]  data: "tree"
//! ```
//!
//! Objects are encoded as JSON. Both `hash` and `data` use serde's
//! byte-array convention. Field order is fixed by the struct definitions, so
//! equal objects always encode to equal bytes.
//!
//! An empty tree encodes exactly like a blob holding the bytes `tree`. Any
//! object without links is read as a blob, so such a file keeps its content
//! and an empty directory reads back as that four-byte blob.

use crate::error::{Error, Result};
use crate::hash::Hash;
use serde::{Deserialize, Serialize};

/// Discriminator carried in the data area of a list object.
pub const LIST_MARKER: &[u8] = b"list";

/// Discriminator carried in the data area of a tree object.
pub const TREE_MARKER: &[u8] = b"tree";

/// Logical object shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A chunk of raw file content.
    Blob,
    /// An ordered list of blob links covering one file.
    List,
    /// A directory: named links to file roots and subtrees.
    Tree,
}

impl ObjectKind {
    /// Get the string name of this object kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::List => "list",
            ObjectKind::Tree => "tree",
        }
    }
}

/// A named, sized reference to a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Entry name; empty for list members.
    pub name: String,
    /// Content address of the target.
    pub hash: Hash,
    /// Byte length of the content the link points to (not the encoded size).
    pub size: u64,
}

impl Link {
    /// Create a new link.
    pub fn new(name: impl Into<String>, hash: Hash, size: u64) -> Self {
        Self {
            name: name.into(),
            hash,
            size,
        }
    }

    /// Create an unnamed chunk link for a list object.
    pub fn chunk(hash: Hash, size: u64) -> Self {
        Self::new(String::new(), hash, size)
    }
}

/// The single persisted unit of the DAG.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Object {
    /// Ordered child links.
    pub links: Vec<Link>,
    /// Raw content (blobs) or a shape discriminator (lists and trees).
    pub data: Vec<u8>,
}

impl Object {
    /// Create a blob holding `data`.
    pub fn blob(data: Vec<u8>) -> Self {
        Self {
            links: Vec::new(),
            data,
        }
    }

    /// Create an empty list.
    pub fn list() -> Self {
        Self {
            links: Vec::new(),
            data: LIST_MARKER.to_vec(),
        }
    }

    /// Create an empty tree.
    pub fn tree() -> Self {
        Self {
            links: Vec::new(),
            data: TREE_MARKER.to_vec(),
        }
    }

    /// Classify this object by shape.
    ///
    /// An object without links is always a blob, whatever its data.
    pub fn kind(&self) -> Result<ObjectKind> {
        if self.links.is_empty() {
            return Ok(ObjectKind::Blob);
        }
        if self.data == LIST_MARKER {
            Ok(ObjectKind::List)
        } else if self.data == TREE_MARKER {
            Ok(ObjectKind::Tree)
        } else {
            Err(Error::decode(format!(
                "object has {} links but no list/tree discriminator ({} data bytes)",
                self.links.len(),
                self.data.len()
            )))
        }
    }

    /// Find the first link with the given name.
    pub fn find_link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.name == name)
    }

    /// Sum of the sizes of all links.
    pub fn links_size(&self) -> u64 {
        self.links.iter().map(|link| link.size).sum()
    }

    /// Serialize to the canonical wire encoding.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::encode)
    }

    /// Deserialize from the wire encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(Error::decode)
    }
}
