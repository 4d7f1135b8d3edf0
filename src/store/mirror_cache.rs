//! Per-node cache of mirrored buffers.
//!
//! A mirror is keyed by the deterministic path `<space>_<leaf path>`, e.g.
//! `device_values/x`. Presence of the key is the cache-hit signal. Entries
//! are inserted at most once while the owning
//! [`Node`](crate::store::node::Node) is shared; any mutable access to the
//! tree through that node drops them.

use core::fmt::{self, Display};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::memory::buffer::Buffer;
use crate::memory::space::MemorySpace;
use crate::mirror_error::MirrorError;

/// (leaf path, target space) pair identifying one mirror.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MirrorKey {
    pub space: MemorySpace,
    pub leaf_path: String,
}

impl MirrorKey {
    pub fn new(space: MemorySpace, leaf_path: impl Into<String>) -> Self {
        Self {
            space,
            leaf_path: leaf_path.into(),
        }
    }

    /// Synthesized mirror path.
    pub fn path(&self) -> String {
        format!("{}_{}", self.space.as_str(), self.leaf_path)
    }
}

impl Display for MirrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.space.as_str(), self.leaf_path)
    }
}

/// Mirror path -> buffer, with insert-if-absent under a lock.
#[derive(Debug, Default)]
pub struct MirrorCache {
    entries: Mutex<HashMap<String, Arc<Buffer>>>,
}

impl MirrorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached buffer for `key`, if one was materialised.
    pub fn get(&self, key: &MirrorKey) -> Option<Arc<Buffer>> {
        self.entries.lock().get(&key.path()).cloned()
    }

    /// Drop every mirror. Exclusive access, so no lock is taken.
    pub fn clear(&mut self) {
        self.entries.get_mut().clear();
    }

    /// Return the cached buffer for `key`, or run `make` and cache its result.
    ///
    /// The lock is held across `make`, so concurrent first requests for the
    /// same key allocate once. The flag is `true` when `make` ran. A failed
    /// `make` caches nothing.
    pub fn get_or_try_insert_with<F>(
        &self,
        key: &MirrorKey,
        make: F,
    ) -> Result<(Arc<Buffer>, bool), MirrorError>
    where
        F: FnOnce() -> Result<Buffer, MirrorError>,
    {
        let mut entries = self.entries.lock();
        let path = key.path();
        if let Some(buf) = entries.get(&path) {
            return Ok((Arc::clone(buf), false));
        }
        let buf = Arc::new(make()?);
        entries.insert(path, Arc::clone(&buf));
        Ok((buf, true))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Sorted mirror paths.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.entries.lock().keys().cloned().collect();
        paths.sort_unstable();
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::buffer::AllocatorId;

    #[test]
    fn key_paths_prefix_the_space() {
        let k = MirrorKey::new(MemorySpace::Device, "values/x");
        assert_eq!(k.path(), "device_values/x");
        assert_eq!(k.to_string(), k.path());
        assert_eq!(MirrorKey::new(MemorySpace::Host, "values").path(), "host_values");
    }

    #[test]
    fn insert_runs_once_per_key() {
        let cache = MirrorCache::new();
        let key = MirrorKey::new(MemorySpace::Device, "values");
        let mut calls = 0;
        let (a, created) = cache
            .get_or_try_insert_with(&key, || {
                calls += 1;
                Ok(Buffer::zeroed(8, AllocatorId(1)))
            })
            .unwrap();
        assert!(created);
        let (b, created) = cache
            .get_or_try_insert_with(&key, || {
                calls += 1;
                Ok(Buffer::zeroed(8, AllocatorId(1)))
            })
            .unwrap();
        assert!(!created);
        assert_eq!(calls, 1);
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_eq!(cache.get(&key).map(|m| m.as_ptr()), Some(a.as_ptr()));
        assert_eq!(cache.paths(), vec!["device_values".to_string()]);
    }

    #[test]
    fn failed_insert_caches_nothing() {
        let cache = MirrorCache::new();
        let key = MirrorKey::new(MemorySpace::Host, "values");
        let err = cache
            .get_or_try_insert_with(&key, || {
                Err(MirrorError::AllocationFailure {
                    space: MemorySpace::Host,
                    bytes: 4,
                })
            })
            .unwrap_err();
        assert!(matches!(err, MirrorError::AllocationFailure { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_forgets_every_mirror() {
        let mut cache = MirrorCache::new();
        for space in [MemorySpace::Host, MemorySpace::Device] {
            cache
                .get_or_try_insert_with(&MirrorKey::new(space, "values"), || {
                    Ok(Buffer::zeroed(4, AllocatorId::HOST))
                })
                .unwrap();
        }
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&MirrorKey::new(MemorySpace::Host, "values")).is_none());
    }
}
