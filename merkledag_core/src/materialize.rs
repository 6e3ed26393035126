//! Writing stored files and trees back to the filesystem.

use crate::codec;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::kv::KvStore;
use crate::object::ObjectKind;
use crate::resolve::write_object;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Recreate the file or directory rooted at `hash` at `dest`.
///
/// `dest` must not exist. Trees become directories and everything else
/// becomes a regular file. Directories are walked with an explicit stack.
///
/// An object without links is always written as a file. An empty directory
/// shares its encoding with a file holding `tree`, so it comes back as that
/// file.
pub fn materialize(store: &dyn KvStore, hash: &Hash, dest: &Path) -> Result<()> {
    if fs::symlink_metadata(dest).is_ok() {
        return Err(Error::path_exists(dest));
    }

    let mut pending: Vec<(Hash, PathBuf)> = vec![(*hash, dest.to_path_buf())];
    let mut files = 0usize;
    let mut dirs = 0usize;

    while let Some((hash, path)) = pending.pop() {
        let object = codec::get(store, &hash)?;

        if object.kind()? == ObjectKind::Tree {
            fs::create_dir(&path)?;
            dirs += 1;
            // Reversed so entries are created in link order
            for link in object.links.iter().rev() {
                check_entry_name(&hash, &link.name)?;
                pending.push((link.hash, path.join(&link.name)));
            }
        } else {
            let file = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)?;
            let mut writer = BufWriter::new(file);
            let written = write_object(store, &hash, &object, &mut writer)?;
            writer.flush()?;
            files += 1;
            debug!(path = %path.display(), bytes = written, "materialized file");
        }
    }

    info!(hash = %hash, dest = %dest.display(), files, dirs, "materialized");
    Ok(())
}

/// Reject names that would escape or alias the directory being written.
fn check_entry_name(tree: &Hash, name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(Error::corrupted(
            tree.to_hex(),
            format!("invalid entry name {:?}", name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::BLOCK_SIZE;
    use crate::fs::{WalkOptions, node_from_path};
    use crate::hash::Algorithm;
    use crate::kv::MemoryStore;
    use crate::node::{MemDir, MemFile, Node};
    use crate::object::{Link, Object};
    use crate::store::FsStore;
    use crate::walk::add;
    use tempfile::TempDir;

    fn build(store: &dyn KvStore, node: Node) -> Hash {
        let mut hasher = Algorithm::Blake3.hasher();
        add(store, &node, hasher.as_mut()).unwrap()
    }

    #[test]
    fn test_materialize_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let hash = build(&store, MemFile::new("c.txt", b"i am a txt file".to_vec()).into());

        let dest = temp_dir.path().join("out.txt");
        materialize(&store, &hash, &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"i am a txt file");
    }

    #[test]
    fn test_materialize_tree() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let big: Vec<u8> = (0..BLOCK_SIZE as usize + 500).map(|i| (i % 7) as u8).collect();
        let dir = MemDir::new("dir1")
            .dir(MemDir::new("dir2").file("a.go", b"package a\n".to_vec()))
            .dir(
                MemDir::new("dir3")
                    .dir(MemDir::new("dir4").file("c.txt", b"i am a txt file".to_vec())),
            )
            .file("big.bin", big.clone());
        let hash = build(&store, dir.into());

        let dest = temp_dir.path().join("restored");
        materialize(&store, &hash, &dest).unwrap();

        assert_eq!(fs::read(dest.join("dir2/a.go")).unwrap(), b"package a\n");
        assert_eq!(fs::read(dest.join("dir3/dir4/c.txt")).unwrap(), b"i am a txt file");
        assert_eq!(fs::read(dest.join("big.bin")).unwrap(), big);
    }

    #[test]
    fn test_materialize_file_holding_tree_marker() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let dir = MemDir::new("d")
            .file("notes", b"tree".to_vec())
            .dir(MemDir::new("empty"));
        let hash = build(&store, dir.into());

        let dest = temp_dir.path().join("d");
        materialize(&store, &hash, &dest).unwrap();

        let notes = dest.join("notes");
        assert!(notes.is_file());
        assert_eq!(fs::read(&notes).unwrap(), b"tree");

        // An empty directory has the same object, so it also becomes the file
        assert!(dest.join("empty").is_file());
        assert_eq!(fs::read(dest.join("empty")).unwrap(), b"tree");

        let root = temp_dir.path().join("root");
        let file_hash = build(&store, MemFile::new("notes", b"tree".to_vec()).into());
        materialize(&store, &file_hash, &root).unwrap();
        assert_eq!(fs::read(&root).unwrap(), b"tree");
    }

    #[test]
    fn test_materialize_round_trip_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        fs::create_dir_all(src.join("nested/deeper")).unwrap();
        fs::write(src.join("top.txt"), b"top").unwrap();
        fs::write(src.join("nested/mid.txt"), b"mid").unwrap();
        fs::write(src.join("nested/deeper/low.txt"), b"low").unwrap();

        let store = FsStore::init(temp_dir.path().join("store"), Algorithm::Sha256).unwrap();
        let node = node_from_path(&src, WalkOptions::default()).unwrap();
        let mut hasher = store.algorithm().hasher();
        let hash = add(&store, &node, hasher.as_mut()).unwrap();

        let dest = temp_dir.path().join("dest");
        materialize(&store, &hash, &dest).unwrap();
        assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"top");
        assert_eq!(fs::read(dest.join("nested/mid.txt")).unwrap(), b"mid");
        assert_eq!(fs::read(dest.join("nested/deeper/low.txt")).unwrap(), b"low");

        // Re-adding the restored copy yields the same file hashes
        let copy = node_from_path(&dest, WalkOptions::default()).unwrap();
        let copy_hash = add(&store, &copy, hasher.as_mut()).unwrap();
        let names = |h: &Hash| -> Vec<String> {
            codec::get(&store, h).unwrap().links.into_iter().map(|l| l.name).collect()
        };
        assert_eq!(names(&copy_hash), names(&hash));
    }

    #[test]
    fn test_materialize_existing_dest() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let hash = build(&store, MemFile::new("f", b"x".to_vec()).into());

        let dest = temp_dir.path().join("taken");
        fs::write(&dest, b"already here").unwrap();
        assert!(matches!(
            materialize(&store, &hash, &dest),
            Err(Error::PathExists { .. })
        ));
        assert_eq!(fs::read(&dest).unwrap(), b"already here");
    }

    #[test]
    fn test_materialize_missing_object() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let hash = Algorithm::Blake3.digest(b"nothing stored");
        assert!(matches!(
            materialize(&store, &hash, &temp_dir.path().join("out")),
            Err(Error::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn test_materialize_rejects_escaping_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let mut hasher = Algorithm::Blake3.hasher();

        let blob = codec::put(&store, &Object::blob(b"evil".to_vec()), hasher.as_mut()).unwrap();
        let mut tree = Object::tree();
        tree.links.push(Link::new("../escape", blob, 4));
        let hash = codec::put(&store, &tree, hasher.as_mut()).unwrap();

        let dest = temp_dir.path().join("out");
        assert!(matches!(
            materialize(&store, &hash, &dest),
            Err(Error::Corrupted { .. })
        ));
        assert!(!temp_dir.path().join("escape").exists());
    }
}
