//! Filesystem adapter: presents paths on disk as [`Node`]s.

use crate::error::{Error, Result};
use crate::node::{Children, DirNode, FileNode, Node};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Options controlling how directories are listed.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    /// Skip entries matched by `.gitignore` files.
    pub git_ignore: bool,
}

/// Build a node for the file or directory at `path`.
///
/// Symlinks and special files are rejected with `UnsupportedNodeType`.
pub fn node_from_path(path: &Path, options: WalkOptions) -> Result<Node> {
    let metadata =
        fs::symlink_metadata(path).map_err(|e| Error::source_read(path.display().to_string(), e))?;
    let name = base_name(path)?;
    let file_type = metadata.file_type();

    if file_type.is_file() {
        Ok(Node::File(Box::new(FsFile {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })))
    } else if file_type.is_dir() {
        Ok(Node::Dir(Box::new(FsDir {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            options,
        })))
    } else {
        let kind = if file_type.is_symlink() {
            "symlink"
        } else {
            "special file"
        };
        Err(Error::unsupported_node_type(path.display().to_string(), kind))
    }
}

/// Base name of `path`, resolving `.` and similar through the real path.
///
/// Names that are not valid UTF-8 are rejected rather than rewritten, since
/// lossy conversion could give two siblings the same link name.
fn base_name(path: &Path) -> Result<String> {
    let resolved;
    let path = if path.file_name().is_some() {
        path
    } else {
        resolved = fs::canonicalize(path)
            .map_err(|e| Error::source_read(path.display().to_string(), e))?;
        resolved.as_path()
    };

    match path.file_name() {
        None => Ok(String::new()),
        Some(name) => name.to_str().map(str::to_string).ok_or_else(|| {
            Error::unsupported_node_type(path.display().to_string(), "non-UTF-8 name")
        }),
    }
}

/// A regular file on disk.
#[derive(Debug, Clone)]
pub struct FsFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl FileNode for FsFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        let file = fs::File::open(&self.path)
            .map_err(|e| Error::source_read(self.path.display().to_string(), e))?;
        Ok(Box::new(file))
    }
}

/// A directory on disk. Children are listed sorted by file name.
#[derive(Debug, Clone)]
pub struct FsDir {
    path: PathBuf,
    name: String,
    size: u64,
    options: WalkOptions,
}

impl DirNode for FsDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn children(&self) -> Result<Children> {
        let mut builder = ignore::WalkBuilder::new(&self.path);
        builder
            .max_depth(Some(1)) // Only immediate children
            .standard_filters(false)
            .git_ignore(self.options.git_ignore)
            .git_exclude(self.options.git_ignore)
            .parents(self.options.git_ignore)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));

        let mut paths = Vec::new();
        for entry in builder.build() {
            let entry = entry.map_err(|e| {
                Error::source_read(self.path.display().to_string(), Error::from(e))
            })?;
            // Skip the directory itself
            if entry.depth() == 0 {
                continue;
            }
            paths.push(entry.into_path());
        }

        let options = self.options;
        Ok(Box::new(
            paths
                .into_iter()
                .map(move |path| node_from_path(&path, options)),
        ))
    }
}
