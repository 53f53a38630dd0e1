//! Explicit, caller-owned caches for expensive construction results.
//!
//! A cache is keyed by a content hash of the inputs that produced the value,
//! so two calls with bit-identical inputs share one entry. Nothing here is
//! global: the caller creates a [`ContentCache`], passes it to the functions
//! that can use it and decides when to invalidate entries.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::Arc;

use crate::error::Result;

/// Hash of the inputs of a cached computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentKey(u64);

impl ContentKey {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Builder for [`ContentKey`]s. Floats are hashed by their bit pattern.
#[derive(Default)]
pub struct ContentHasher {
    inner: DefaultHasher,
}

impl ContentHasher {
    pub fn new(tag: &str) -> Self {
        let mut hasher = Self::default();
        hasher.inner.write(tag.as_bytes());
        hasher
    }

    pub fn usize(mut self, value: usize) -> Self {
        self.inner.write_usize(value);
        self
    }

    pub fn bool(mut self, value: bool) -> Self {
        self.inner.write_u8(value as u8);
        self
    }

    pub fn f64(mut self, value: f64) -> Self {
        // +0.0 and -0.0 describe the same input
        let value = if value == 0.0 { 0.0 } else { value };
        self.inner.write_u64(value.to_bits());
        self
    }

    pub fn f64s(mut self, values: &[f64]) -> Self {
        self.inner.write_usize(values.len());
        for &v in values {
            self = self.f64(v);
        }
        self
    }

    pub fn str(mut self, value: &str) -> Self {
        self.inner.write(value.as_bytes());
        self
    }

    pub fn finish(self) -> ContentKey {
        ContentKey(self.inner.finish())
    }
}

/// Hit/miss counters of a [`ContentCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Map from content hash to a shared computed value.
#[derive(Debug)]
pub struct ContentCache<V> {
    entries: HashMap<ContentKey, Arc<V>>,
    hits: usize,
    misses: usize,
}

impl<V> Default for ContentCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }
}

impl<V> ContentCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: ContentKey) -> Option<Arc<V>> {
        match self.entries.get(&key) {
            Some(v) => {
                self.hits += 1;
                Some(Arc::clone(v))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: ContentKey, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.insert(key, Arc::clone(&value));
        value
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    /// Failed computations are not cached.
    pub fn get_or_try_insert_with<F>(&mut self, key: ContentKey, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(v) = self.get(key) {
            return Ok(v);
        }
        let value = compute()?;
        Ok(self.insert(key, value))
    }

    /// Drop one entry. Returns whether it was present.
    pub fn invalidate(&mut self, key: ContentKey) -> bool {
        self.entries.remove(&key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;

    #[test]
    fn test_same_inputs_same_key() {
        let a = ContentHasher::new("interp").usize(3).f64s(&[0.0, 1.5]).finish();
        let b = ContentHasher::new("interp").usize(3).f64s(&[-0.0, 1.5]).finish();
        let c = ContentHasher::new("interp").usize(2).f64s(&[0.0, 1.5]).finish();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_get_or_insert_computes_once() {
        let mut cache = ContentCache::new();
        let key = ContentHasher::new("k").usize(1).finish();
        let mut calls = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_try_insert_with(key, || {
                    calls += 1;
                    Ok(42)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(calls, 1);
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache: ContentCache<i32> = ContentCache::new();
        let key = ContentHasher::new("k").finish();
        let r = cache.get_or_try_insert_with(key, || Err(KernelError::Geometry("no".into())));
        assert!(r.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let mut cache = ContentCache::new();
        let key = ContentHasher::new("k").finish();
        cache.insert(key, "value");
        assert!(cache.invalidate(key));
        assert!(!cache.invalidate(key));
        assert!(cache.get(key).is_none());
    }
}
