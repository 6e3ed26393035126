//! Persisting objects under their content address.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::kv::KvStore;
use crate::object::Object;
use digest::DynDigest;
use tracing::trace;

/// Encode `object`, hash the encoding with `hasher`, and store it under that hash.
///
/// The hasher is reset before use and left reset afterwards, so one instance
/// can be threaded through a whole sequential build. Storing an object that
/// already exists rewrites identical bytes under the identical key.
pub fn put(store: &dyn KvStore, object: &Object, hasher: &mut dyn DynDigest) -> Result<Hash> {
    let encoded = object.encode()?;

    hasher.reset();
    hasher.update(&encoded);
    let hash = Hash::from_digest(&hasher.finalize_reset())?;

    store.put(hash.as_bytes(), &encoded)?;
    trace!(hash = %hash, links = object.links.len(), bytes = encoded.len(), "put object");
    Ok(hash)
}

/// Load and decode the object stored under `hash`.
pub fn get(store: &dyn KvStore, hash: &Hash) -> Result<Object> {
    let encoded = store
        .get(hash.as_bytes())?
        .ok_or_else(|| Error::object_not_found(hash.to_hex()))?;
    Object::decode(&encoded)
}
