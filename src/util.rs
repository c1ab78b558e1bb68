use std::hash::BuildHasher;

use crate::{KeyError, KeyFactory};

/// Maps the key of `item` onto a lane in `0..num_lanes`.
///
/// The hash is an unsigned 64-bit value, so the remainder is never negative and fits in `usize`.
pub fn compute_lane<T, K, S>(
    item: &T,
    num_lanes: usize,
    key_factory: &K,
    build_hasher: &S,
) -> Result<usize, KeyError>
where
    K: KeyFactory<T>,
    S: BuildHasher,
{
    let hash = key_factory.hash_key(item, build_hasher)?;
    Ok((hash % num_lanes as u64) as usize)
}
