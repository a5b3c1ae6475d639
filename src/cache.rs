//! Per-instance memoization of expensive whole-file decodes.
//!
//! Several containers hold many IRs behind one expensive parse (a MATLAB
//! array file, a SOFA tensor). Datasets backed by such containers own a
//! [`DecodeCache`] so every sub-item of a file shares a single decode.
//!
//! The cache is deliberately unbounded and never evicts: the expected
//! access pattern is "read a known finite dataset once", not a long-running
//! server. Callers worried about memory should drop the dataset instance
//! (and build a fresh one) between passes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use crate::error::Result;

/// Maps a cache key (typically a file path, sometimes qualified by a
/// variable name) to a shared decoded payload.
#[derive(Debug)]
pub struct DecodeCache<K, V> {
    map: RefCell<HashMap<K, Rc<V>>>,
}

impl<K, V> Default for DecodeCache<K, V> {
    fn default() -> Self {
        Self {
            map: RefCell::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> DecodeCache<K, V> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key`, computing and storing it on the
    /// first call. `compute` runs at most once per key; a failed compute is
    /// not cached and will be retried on the next call.
    pub fn cached(&self, key: K, compute: impl FnOnce() -> Result<V>) -> Result<Rc<V>> {
        if let Some(hit) = self.map.borrow().get(&key) {
            return Ok(Rc::clone(hit));
        }
        log::trace!("decode cache miss ({} entries)", self.map.borrow().len());
        let value = Rc::new(compute()?);
        self.map.borrow_mut().insert(key, Rc::clone(&value));
        Ok(value)
    }

    /// Number of decoded payloads currently held.
    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    /// Whether the cache holds nothing yet.
    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }
}

/// Capability marker for datasets that memoize sub-file decodes.
pub trait CachedDecodes {
    /// Number of container decodes currently memoized by this instance.
    fn cached_decodes(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatasetError;
    use std::path::PathBuf;

    #[test]
    fn compute_runs_once_per_key() {
        let cache: DecodeCache<&str, Vec<u8>> = DecodeCache::new();
        let mut calls = 0;

        let first = cache
            .cached("a", || {
                calls += 1;
                Ok(vec![1, 2, 3])
            })
            .unwrap();
        let second = cache
            .cached("a", || {
                calls += 1;
                Ok(vec![9, 9, 9])
            })
            .unwrap();

        assert_eq!(calls, 1);
        // Identity, not mere equality: both handles point at one payload.
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_keys_compute_separately() {
        let cache: DecodeCache<(PathBuf, &str), u32> = DecodeCache::new();
        cache.cached((PathBuf::from("f.mat"), "IR_L"), || Ok(1)).unwrap();
        cache.cached((PathBuf::from("f.mat"), "IR_R"), || Ok(2)).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_compute_is_not_cached() {
        let cache: DecodeCache<&str, u32> = DecodeCache::new();
        let err = cache.cached("k", || {
            Err(DatasetError::Malformed {
                path: PathBuf::from("k"),
                reason: "boom".into(),
            })
        });
        assert!(err.is_err());
        assert!(cache.is_empty());
        assert_eq!(*cache.cached("k", || Ok(7)).unwrap(), 7);
    }
}
