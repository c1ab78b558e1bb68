use std::hash::{BuildHasher, Hash};

use crate::{BoxError, KeyError};

/// Strategy for deriving the routing key of an item.
///
/// The key is only ever hashed to select a lane; it is never stored or compared. Implementations
/// must be deterministic: the same item must always produce the same key, otherwise items that
/// belong together may land on different lanes and lose their relative ordering.
///
/// Implemented for:
///
/// - [`Identity`], which uses the item itself as its key;
/// - any `Fn(&T) -> K` where `K: Hash`;
/// - [`Fallible`], which wraps `Fn(&T) -> Result<K, E>` for key derivation that can fail.
pub trait KeyFactory<T> {
    /// Hashes the key of `item` with `build_hasher`.
    fn hash_key<S: BuildHasher>(&self, item: &T, build_hasher: &S) -> Result<u64, KeyError>;
}

/// Default key policy: every item is its own key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> KeyFactory<T> for Identity
where
    T: Hash,
{
    fn hash_key<S: BuildHasher>(&self, item: &T, build_hasher: &S) -> Result<u64, KeyError> {
        Ok(build_hasher.hash_one(item))
    }
}

impl<T, K, F> KeyFactory<T> for F
where
    F: Fn(&T) -> K,
    K: Hash,
{
    fn hash_key<S: BuildHasher>(&self, item: &T, build_hasher: &S) -> Result<u64, KeyError> {
        Ok(build_hasher.hash_one(self(item)))
    }
}

/// Key policy for key extraction that can fail.
///
/// An `Err` from the wrapped function rejects the item with
/// [`EnqueueError::KeyDerivation`](crate::EnqueueError::KeyDerivation).
#[derive(Debug, Clone, Copy)]
pub struct Fallible<F>(pub F);

impl<T, K, E, F> KeyFactory<T> for Fallible<F>
where
    F: Fn(&T) -> Result<K, E>,
    K: Hash,
    E: Into<BoxError>,
{
    fn hash_key<S: BuildHasher>(&self, item: &T, build_hasher: &S) -> Result<u64, KeyError> {
        let key = (self.0)(item).map_err(KeyError::new)?;
        Ok(build_hasher.hash_one(key))
    }
}
