//! Reading content back out of a DAG.

use crate::codec;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::kv::KvStore;
use crate::object::{Link, Object, ObjectKind};
use std::io::Write;
use tracing::debug;

/// The result of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Data of an object without links: a single-blob file or an empty tree.
    Data(Vec<u8>),
    /// An object with links: a multi-chunk file or a directory.
    Node(Object),
}

impl Resolved {
    /// Bytes for callers: the data itself, or the object's encoded form.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Resolved::Data(data) => Ok(data),
            Resolved::Node(object) => object.encode(),
        }
    }
}

/// Follow a `/`-separated path of link names from `root`.
///
/// Empty segments are skipped, so `""` and `"/"` name the root itself. A
/// segment with no matching link fails with `PathNotFound`, carrying the
/// segment and the prefix consumed before it.
pub fn resolve(store: &dyn KvStore, root: &Hash, path: &str) -> Result<Resolved> {
    let (_, object) = walk_path(store, root, path)?;
    if object.links.is_empty() {
        Ok(Resolved::Data(object.data))
    } else {
        Ok(Resolved::Node(object))
    }
}

/// Like [`resolve`], but returns the hash of the object the path names.
pub fn resolve_hash(store: &dyn KvStore, root: &Hash, path: &str) -> Result<Hash> {
    walk_path(store, root, path).map(|(hash, _)| hash)
}

fn walk_path(store: &dyn KvStore, root: &Hash, path: &str) -> Result<(Hash, Object)> {
    let mut hash = *root;
    let mut current = codec::get(store, root)?;
    let mut prefix = String::new();

    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let link = current
            .find_link(segment)
            .ok_or_else(|| Error::path_not_found(segment, prefix.as_str()))?;
        hash = link.hash;
        current = codec::get(store, &hash)?;

        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);
    }

    debug!(root = %root, path, hash = %hash, "resolved path");
    Ok((hash, current))
}

/// Reassemble the complete content of the file rooted at `hash`.
pub fn read_file(store: &dyn KvStore, hash: &Hash) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_file(store, hash, &mut buf)?;
    Ok(buf)
}

/// Stream the content of the file rooted at `hash` into `writer`.
///
/// Returns the number of bytes written.
pub fn write_file<W: Write + ?Sized>(
    store: &dyn KvStore,
    hash: &Hash,
    writer: &mut W,
) -> Result<u64> {
    let object = codec::get(store, hash)?;
    write_object(store, hash, &object, writer)
}

/// The links of the object stored under `hash`.
pub fn list(store: &dyn KvStore, hash: &Hash) -> Result<Vec<Link>> {
    Ok(codec::get(store, hash)?.links)
}

pub(crate) fn write_object<W: Write + ?Sized>(
    store: &dyn KvStore,
    hash: &Hash,
    object: &Object,
    writer: &mut W,
) -> Result<u64> {
    if object.links.is_empty() {
        writer.write_all(&object.data)?;
        return Ok(object.data.len() as u64);
    }

    match object.kind()? {
        ObjectKind::List => {
            let mut written = 0;
            for link in &object.links {
                let chunk = codec::get(store, &link.hash)?;
                if chunk.kind()? != ObjectKind::Blob {
                    return Err(Error::corrupted(
                        hash.to_hex(),
                        format!("chunk {} is not a blob", link.hash),
                    ));
                }
                if chunk.data.len() as u64 != link.size {
                    return Err(Error::corrupted(
                        hash.to_hex(),
                        format!(
                            "chunk {} has {} bytes, link records {}",
                            link.hash,
                            chunk.data.len(),
                            link.size
                        ),
                    ));
                }
                writer.write_all(&chunk.data)?;
                written += link.size;
            }
            Ok(written)
        }
        kind => Err(Error::invalid_object_type("file", kind.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::BLOCK_SIZE;
    use crate::fs::{WalkOptions, node_from_path};
    use crate::hash::Algorithm;
    use crate::kv::MemoryStore;
    use crate::node::{MemDir, MemFile, Node};
    use crate::store::FsStore;
    use crate::walk::{DagBuilder, add};
    use tempfile::TempDir;

    fn fixture() -> MemDir {
        MemDir::new("dir1")
            .dir(
                MemDir::new("dir2")
                    .file("a.go", b"package main\n".to_vec())
                    .file("b.js", b"console.log(1)\n".to_vec()),
            )
            .dir(
                MemDir::new("dir3")
                    .dir(MemDir::new("dir4").file("c.txt", b"i am a txt file".to_vec())),
            )
    }

    fn build(store: &dyn KvStore, node: Node) -> Hash {
        let mut hasher = Algorithm::Blake3.hasher();
        add(store, &node, hasher.as_mut()).unwrap()
    }

    #[test]
    fn test_resolve_fixture_file() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());

        let resolved = resolve(&store, &root, "dir3/dir4/c.txt").unwrap();
        assert_eq!(resolved, Resolved::Data(b"i am a txt file".to_vec()));

        // Reproducible across fresh stores
        let other = MemoryStore::new();
        assert_eq!(build(&other, fixture().into()), root);
        assert_eq!(
            resolve(&other, &root, "dir3/dir4/c.txt").unwrap(),
            Resolved::Data(b"i am a txt file".to_vec())
        );
    }

    #[test]
    fn test_resolve_fixture_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("dir1");
        std::fs::create_dir_all(src.join("dir2")).unwrap();
        std::fs::create_dir_all(src.join("dir3/dir4")).unwrap();
        std::fs::write(src.join("dir2/a.go"), b"package main\n").unwrap();
        std::fs::write(src.join("dir2/b.js"), b"console.log(1)\n").unwrap();
        std::fs::write(src.join("dir3/dir4/c.txt"), b"i am a txt file").unwrap();

        let store = FsStore::init(temp_dir.path().join("store"), Algorithm::Blake3).unwrap();
        let node = node_from_path(&src, WalkOptions::default()).unwrap();
        let root = DagBuilder::new(&store, store.algorithm())
            .add(&node)
            .unwrap();

        let resolved = resolve(&store, &root, "dir3/dir4/c.txt").unwrap();
        assert_eq!(resolved.into_bytes().unwrap(), b"i am a txt file");

        // Re-adding the unchanged tree yields the same root
        let again = DagBuilder::new(&store, store.algorithm())
            .workers(4)
            .add(&node)
            .unwrap();
        assert_eq!(again, root);
    }

    #[test]
    fn test_resolve_path_normalization() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());

        let expected = resolve(&store, &root, "dir3/dir4/c.txt").unwrap();
        assert_eq!(resolve(&store, &root, "/dir3//dir4/c.txt/").unwrap(), expected);

        let Resolved::Node(object) = resolve(&store, &root, "").unwrap() else {
            panic!("expected the root tree")
        };
        assert_eq!(object, codec::get(&store, &root).unwrap());
        assert_eq!(resolve(&store, &root, "/").unwrap(), Resolved::Node(object));
    }

    #[test]
    fn test_resolve_directory_returns_node() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());

        let resolved = resolve(&store, &root, "dir2").unwrap();
        let Resolved::Node(object) = resolved.clone() else {
            panic!("expected a tree")
        };
        assert_eq!(object.kind().unwrap(), ObjectKind::Tree);
        assert_eq!(object.links.len(), 2);
        assert_eq!(resolved.into_bytes().unwrap(), object.encode().unwrap());
    }

    #[test]
    fn test_resolve_path_miss() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());

        match resolve(&store, &root, "dir3/nope/c.txt") {
            Err(Error::PathNotFound { segment, prefix }) => {
                assert_eq!(segment, "nope");
                assert_eq!(prefix, "dir3");
            }
            other => panic!("expected PathNotFound, got {other:?}"),
        }

        match resolve(&store, &root, "missing") {
            Err(Error::PathNotFound { segment, prefix }) => {
                assert_eq!(segment, "missing");
                assert_eq!(prefix, "");
            }
            other => panic!("expected PathNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_hash() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());

        assert_eq!(resolve_hash(&store, &root, "").unwrap(), root);
        let dir3 = list_hash(&store, &root, "dir3");
        assert_eq!(resolve_hash(&store, &root, "dir3/").unwrap(), dir3);

        let c = resolve_hash(&store, &root, "dir3/dir4/c.txt").unwrap();
        assert_eq!(read_file(&store, &c).unwrap(), b"i am a txt file");
    }

    #[test]
    fn test_resolve_through_file_fails() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());
        assert!(matches!(
            resolve(&store, &root, "dir3/dir4/c.txt/more"),
            Err(Error::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_resolve_missing_root() {
        let store = MemoryStore::new();
        let root = Algorithm::Blake3.digest(b"absent");
        assert!(matches!(
            resolve(&store, &root, ""),
            Err(Error::ObjectNotFound { .. })
        ));
    }

    #[test]
    fn test_large_file_resolves_to_list() {
        let store = MemoryStore::new();
        let data: Vec<u8> = (0..BLOCK_SIZE as usize * 2 + 99).map(|i| (i % 13) as u8).collect();
        let root = build(&store, MemDir::new("d").file("big.bin", data.clone()).into());

        let Resolved::Node(list) = resolve(&store, &root, "big.bin").unwrap() else {
            panic!("expected a list")
        };
        assert_eq!(list.kind().unwrap(), ObjectKind::List);
        assert_eq!(list.links_size(), data.len() as u64);

        let file_hash = list_hash(&store, &root, "big.bin");
        assert_eq!(read_file(&store, &file_hash).unwrap(), data);

        let mut streamed = Vec::new();
        let n = write_file(&store, &file_hash, &mut streamed).unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(streamed, data);
    }

    fn list_hash(store: &dyn KvStore, root: &Hash, name: &str) -> Hash {
        list(store, root)
            .unwrap()
            .into_iter()
            .find(|l| l.name == name)
            .unwrap()
            .hash
    }

    #[test]
    fn test_read_file_rejects_directory() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());
        assert!(matches!(
            read_file(&store, &root),
            Err(Error::InvalidObjectType { .. })
        ));
    }

    #[test]
    fn test_read_file_detects_size_mismatch() {
        let store = MemoryStore::new();
        let mut hasher = Algorithm::Blake3.hasher();
        let chunk = codec::put(&store, &Object::blob(b"abc".to_vec()), hasher.as_mut()).unwrap();
        let mut bogus = Object::list();
        bogus.links.push(Link::chunk(chunk, 4));
        let hash = codec::put(&store, &bogus, hasher.as_mut()).unwrap();

        assert!(matches!(
            read_file(&store, &hash),
            Err(Error::Corrupted { .. })
        ));
    }

    #[test]
    fn test_list_links() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());

        let names: Vec<String> = list(&store, &root)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["dir2", "dir3"]);

        let dir3 = list_hash(&store, &root, "dir3");
        let dir4 = list_hash(&store, &dir3, "dir4");
        let c = list_hash(&store, &dir4, "c.txt");
        assert!(list(&store, &c).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_resolves() {
        let store = MemoryStore::new();
        let root = build(&store, fixture().into());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let resolved = resolve(&store, &root, "dir3/dir4/c.txt").unwrap();
                    assert_eq!(resolved, Resolved::Data(b"i am a txt file".to_vec()));
                });
            }
        });
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Any file added under a directory reads back byte for byte
        #[test]
        fn prop_file_round_trip(
            name in "[a-z]{1,12}",
            content in prop::collection::vec(any::<u8>(), 0..4096),
        ) {
            let store = MemoryStore::new();
            let root = build(&store, MemDir::new("d").file(name.clone(), content.clone()).into());

            let hash = list_hash(&store, &root, &name);
            prop_assert_eq!(read_file(&store, &hash).unwrap(), content.clone());

            let file: Node = MemFile::new(name, content).into();
            prop_assert_eq!(build(&store, file), hash);
        }
    }
}
