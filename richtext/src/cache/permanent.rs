// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

use super::pool::LruList;
use super::{lock, regenerate, CallerId, Entry};
use crate::{FontRegistry, GenerationError, GenerationSettings, LayoutContextPool, LayoutResult};

#[derive(Debug, Default)]
struct Inner {
    bound: HashMap<CallerId, Entry>,
    /// Released buffers, most recently released first.
    free: LruList<Arc<LayoutResult>>,
}

impl Inner {
    /// Binds a buffer to `id`, returning `false` if it already had one.
    fn acquire(&mut self, id: CallerId) -> bool {
        if self.bound.contains_key(&id) {
            return false;
        }
        let entry = self.fresh_entry(id);
        self.bound.insert(id, entry);
        true
    }

    /// A dirty entry for `id` on a released buffer, or a new one.
    fn fresh_entry(&mut self, id: CallerId) -> Entry {
        let result = self
            .free
            .pop_front()
            .unwrap_or_else(|| Arc::new(LayoutResult::new()));
        Entry {
            owner: id,
            hash: 0,
            dirty: true,
            result,
        }
    }
}

/// A cache of layouts bound to their caller until released.
///
/// Released buffers go to a free pool and are handed to the next caller that
/// acquires an entry, so callers coming and going do not allocate.
#[derive(Debug, Default)]
pub struct PermanentCache {
    inner: Mutex<Inner>,
}

impl PermanentCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a buffer to `id`, reusing a released one if possible.
    ///
    /// The entry starts out dirty. Returns `false` if `id` already holds one.
    pub fn acquire(&self, id: CallerId) -> bool {
        lock(&self.inner).acquire(id)
    }

    /// Returns `id`'s buffer to the free pool.
    ///
    /// Returns `false` if `id` holds none.
    pub fn release(&self, id: CallerId) -> bool {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        match inner.bound.remove(&id) {
            Some(entry) => {
                inner.free.push_front(entry.result);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `id` holds an entry.
    pub fn contains(&self, id: CallerId) -> bool {
        lock(&self.inner).bound.contains_key(&id)
    }

    /// Number of callers holding an entry.
    pub fn len(&self) -> usize {
        lock(&self.inner).bound.len()
    }

    /// Returns `true` if no caller holds an entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of released buffers waiting for reuse.
    pub fn free_count(&self) -> usize {
        lock(&self.inner).free.len()
    }

    /// Returns the result held by `id` if it was generated from settings
    /// hashing to `hash` and has not been marked dirty since.
    pub fn get(&self, id: CallerId, hash: u64) -> Option<Arc<LayoutResult>> {
        let inner = lock(&self.inner);
        let entry = inner.bound.get(&id)?;
        entry.is_valid(hash).then(|| entry.result.clone())
    }

    /// Returns the result held by `id`, or calls `generate` to fill one in,
    /// acquiring an entry first if `id` holds none.
    ///
    /// Generation runs without the cache locked. If it fails, the entry is kept
    /// as it was.
    pub fn get_or_generate(
        &self,
        id: CallerId,
        hash: u64,
        generate: impl FnOnce(&mut LayoutResult) -> Result<(), GenerationError>,
    ) -> Result<Arc<LayoutResult>, GenerationError> {
        let mut entry = {
            let mut inner = lock(&self.inner);
            match inner.bound.remove(&id) {
                Some(entry) if entry.is_valid(hash) => {
                    let result = entry.result.clone();
                    inner.bound.insert(id, entry);
                    return Ok(result);
                }
                Some(entry) => entry,
                None => inner.fresh_entry(id),
            }
        };

        let outcome = regenerate(&mut entry.result, generate);
        if outcome.is_ok() {
            entry.hash = hash;
            entry.dirty = false;
        }
        let result = entry.result.clone();
        lock(&self.inner).bound.insert(id, entry);
        outcome.map(|()| result)
    }

    /// Lays out `settings` for `id` on the current thread's context of `contexts`,
    /// unless an up to date result is held.
    pub fn generate(
        &self,
        id: CallerId,
        contexts: &LayoutContextPool,
        registry: &FontRegistry,
        settings: &GenerationSettings,
    ) -> Result<Arc<LayoutResult>, GenerationError> {
        self.get_or_generate(id, settings.content_hash(), |out| {
            contexts.generate_into(registry, settings, out)
        })
    }

    /// Forces the next request of `id` to regenerate.
    ///
    /// Returns `false` if `id` holds no entry.
    pub fn mark_dirty(&self, id: CallerId) -> bool {
        match lock(&self.inner).bound.get_mut(&id) {
            Some(entry) => {
                entry.dirty = true;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::PermanentCache;
    use crate::cache::CallerId;
    use crate::{GenerationError, LayoutResult};

    fn fill(size: f32) -> impl FnOnce(&mut LayoutResult) -> Result<(), GenerationError> {
        move |out| {
            out.clear();
            out.font_size = size;
            Ok(())
        }
    }

    #[test]
    fn acquire_binds_once() {
        let cache = PermanentCache::new();
        let id = CallerId::new(1);
        assert!(cache.acquire(id));
        assert!(!cache.acquire(id));
        assert!(cache.contains(id));
        assert_eq!(cache.len(), 1);
        // A fresh entry holds nothing valid yet.
        assert!(cache.get(id, 0).is_none());
    }

    #[test]
    fn released_buffers_are_reused() {
        let cache = PermanentCache::new();
        let a = CallerId::new(1);
        let address = Arc::as_ptr(&cache.get_or_generate(a, 1, fill(10.0)).unwrap());
        assert!(cache.release(a));
        assert!(!cache.release(a));
        assert_eq!(cache.free_count(), 1);
        assert!(cache.get(a, 1).is_none());

        let b = CallerId::new(2);
        let result = cache.get_or_generate(b, 1, fill(20.0)).unwrap();
        assert_eq!(Arc::as_ptr(&result), address);
        assert_eq!(result.font_size(), 20.0);
        assert_eq!(cache.free_count(), 0);
    }

    #[test]
    fn entries_survive_until_released() {
        let cache = PermanentCache::new();
        let id = CallerId::new(1);
        let first = cache.get_or_generate(id, 3, fill(10.0)).unwrap();
        for _ in 0..8 {
            let again = cache
                .get_or_generate(id, 3, |_| panic!("should not regenerate"))
                .unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert!(cache.mark_dirty(id));
        assert!(cache.get(id, 3).is_none());
        let regenerated = cache.get_or_generate(id, 3, fill(11.0)).unwrap();
        assert_eq!(regenerated.font_size(), 11.0);
        assert_eq!(first.font_size(), 10.0);
    }

    #[test]
    fn failed_generation_keeps_entry() {
        let cache = PermanentCache::new();
        let id = CallerId::new(1);
        cache.get_or_generate(id, 1, fill(10.0)).unwrap();
        assert!(cache
            .get_or_generate(id, 2, |_| Err(GenerationError::NoFont))
            .is_err());
        assert_eq!(cache.get(id, 1).unwrap().font_size(), 10.0);
        assert!(cache.contains(id));
    }
}
