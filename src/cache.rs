// Global cache of built interpolation tables.
//
// Tables are expensive to build (adaptive quadrature at every node) and
// read-only once built, so they are shared process-wide behind `Arc`. The
// cache key must incorporate every input that affects the tabulated values;
// the composition helpers here are used by the cross section layer to
// combine parametrization, cut, medium, particle and grid-definition hashes.

use once_cell::sync::{Lazy, OnceCell};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::interpolant::{Interpolant1d, Interpolant2d};

// Per-key publish cells: the outer mutex is only held long enough to find
// or insert the cell, so concurrent builds of *different* tables proceed in
// parallel while concurrent requests for the *same* key block on one build.
static TABLE_CACHE_1D: Lazy<Mutex<HashMap<u64, Arc<OnceCell<Arc<Interpolant1d>>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static TABLE_CACHE_2D: Lazy<Mutex<HashMap<u64, Arc<OnceCell<Arc<Interpolant2d>>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Return the cached 1D table for `key`, building and publishing it first
/// if this is the first request. At most one build runs per distinct key;
/// a failed build is not published and will be retried by the next caller.
pub fn get_or_build_1d<F>(key: u64, builder: F) -> Result<Arc<Interpolant1d>, String>
where
    F: FnOnce() -> Result<Interpolant1d, String>,
{
    let cell = {
        let mut cache = lock_or_recover(&TABLE_CACHE_1D);
        Arc::clone(cache.entry(key).or_insert_with(|| Arc::new(OnceCell::new())))
    };
    let table = cell.get_or_try_init(|| builder().map(Arc::new))?;
    Ok(Arc::clone(table))
}

/// 2D counterpart of [`get_or_build_1d`].
pub fn get_or_build_2d<F>(key: u64, builder: F) -> Result<Arc<Interpolant2d>, String>
where
    F: FnOnce() -> Result<Interpolant2d, String>,
{
    let cell = {
        let mut cache = lock_or_recover(&TABLE_CACHE_2D);
        Arc::clone(cache.entry(key).or_insert_with(|| Arc::new(OnceCell::new())))
    };
    let table = cell.get_or_try_init(|| builder().map(Arc::new))?;
    Ok(Arc::clone(table))
}

/// Drop every cached table. Used by tests to make build counting
/// deterministic.
pub fn clear_table_cache() {
    lock_or_recover(&TABLE_CACHE_1D).clear();
    lock_or_recover(&TABLE_CACHE_2D).clear();
}

/// Combine a hash into a running seed (boost-style mixing).
pub fn hash_combine(seed: &mut u64, hash: u64) {
    *seed ^= hash
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

/// Hash an arbitrary value with the standard hasher.
pub fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Compose the identity key of a table from its kind tag and the identity
/// hashes of every input that shaped its values.
pub fn table_key(kind: &str, hashes: &[u64]) -> u64 {
    let mut seed = hash_of(&kind);
    for &hash in hashes {
        hash_combine(&mut seed, hash);
    }
    seed
}
