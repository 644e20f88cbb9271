// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::{Arc, Mutex};

use hashbrown::HashMap;

use super::pool::LruList;
use super::{lock, regenerate, CallerId, Entry};
use crate::{FontRegistry, GenerationError, GenerationSettings, LayoutContextPool, LayoutResult};

/// Called with the previous owner of a result whose buffers were recycled.
pub type EvictionListener = Box<dyn Fn(CallerId) + Send + Sync>;

#[derive(Debug)]
struct TemporaryEntry {
    entry: Entry,
    last_frame: u64,
}

/// Where the buffer for a generation came from.
enum Source {
    /// The caller's own entry, restored if generation fails.
    Owned { hash: u64, dirty: bool, last_frame: u64 },
    /// Another caller's stale entry.
    Recycled(CallerId),
    Fresh,
}

#[derive(Debug, Default)]
struct Inner {
    /// Most recently touched first, so the back is the stalest entry.
    entries: LruList<TemporaryEntry>,
    owners: HashMap<CallerId, usize>,
    frame: u64,
}

impl Inner {
    fn lookup(&mut self, id: CallerId, hash: u64) -> Option<Arc<LayoutResult>> {
        let handle = *self.owners.get(&id)?;
        let entry = self.entries.get_mut(handle)?;
        if !entry.entry.is_valid(hash) {
            return None;
        }
        entry.last_frame = self.frame;
        let result = entry.entry.result.clone();
        self.entries.touch(handle);
        Some(result)
    }

    /// Takes a buffer to generate into for `id`: its own, a stale one, or a new one.
    fn take_buffer(&mut self, id: CallerId, min_frames: u64) -> (Arc<LayoutResult>, Source) {
        if let Some(old) = self
            .owners
            .remove(&id)
            .and_then(|handle| self.entries.remove(handle))
        {
            let source = Source::Owned {
                hash: old.entry.hash,
                dirty: old.entry.dirty,
                last_frame: old.last_frame,
            };
            return (old.entry.result, source);
        }
        let frame = self.frame;
        let stale = self
            .entries
            .back()
            .filter(|(_, entry)| frame.saturating_sub(entry.last_frame) >= min_frames)
            .map(|(handle, _)| handle);
        if let Some(old) = stale.and_then(|handle| self.entries.remove(handle)) {
            let owner = old.entry.owner;
            self.owners.remove(&owner);
            log::debug!(
                "recycling layout of caller {} for caller {}, untouched since frame {}",
                owner.to_u64(),
                id.to_u64(),
                old.last_frame
            );
            return (old.entry.result, Source::Recycled(owner));
        }
        (Arc::new(LayoutResult::new()), Source::Fresh)
    }

    /// Binds `entry` to its owner, ordered among the other entries by
    /// `last_frame` so that the back stays the stalest.
    fn insert(&mut self, entry: Entry, last_frame: u64) {
        let owner = entry.owner;
        if let Some(handle) = self.owners.remove(&owner) {
            self.entries.remove(handle);
        }
        let next = self
            .entries
            .iter_mru()
            .find(|(_, other)| other.last_frame <= last_frame)
            .map(|(handle, _)| handle);
        let handle = self
            .entries
            .insert_before(next, TemporaryEntry { entry, last_frame });
        self.owners.insert(owner, handle);
    }
}

/// A cache of layouts that stay bound to their caller only while it keeps
/// asking for them.
///
/// Time is counted in frames, advanced with [`begin_frame`](Self::begin_frame).
/// An entry that has not been touched for `min_frames` frames may have its
/// buffers handed to another caller that misses; the previous owner is told
/// through the [`EvictionListener`].
pub struct TemporaryCache {
    inner: Mutex<Inner>,
    min_frames: u64,
    listener: Option<EvictionListener>,
}

impl core::fmt::Debug for TemporaryCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TemporaryCache")
            .field("inner", &self.inner)
            .field("min_frames", &self.min_frames)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl Default for TemporaryCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_FRAMES)
    }
}

impl TemporaryCache {
    /// Frames an entry is kept for its caller by default.
    pub const DEFAULT_MIN_FRAMES: u64 = 2;

    /// Creates a cache whose entries may be recycled after `min_frames` frames
    /// without use.
    pub fn new(min_frames: u64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            min_frames,
            listener: None,
        }
    }

    /// Sets the function told about recycled entries.
    pub fn set_eviction_listener(&mut self, listener: impl Fn(CallerId) + Send + Sync + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Frames an entry is kept for its caller.
    pub fn min_frames(&self) -> u64 {
        self.min_frames
    }

    /// Advances the frame counter to `frame`.
    ///
    /// Calling this again with the same or an older frame has no effect.
    pub fn begin_frame(&self, frame: u64) {
        let mut inner = lock(&self.inner);
        inner.frame = inner.frame.max(frame);
    }

    /// The current frame.
    pub fn frame(&self) -> u64 {
        lock(&self.inner).frame
    }

    /// Number of cached results.
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the result cached for `id` if it was generated from settings
    /// hashing to `hash` and has not been marked dirty since.
    pub fn get(&self, id: CallerId, hash: u64) -> Option<Arc<LayoutResult>> {
        lock(&self.inner).lookup(id, hash)
    }

    /// Returns the cached result for `id`, or calls `generate` to fill one in.
    ///
    /// Generation runs without the cache locked. Its buffer is the caller's
    /// previous result if there is one, otherwise a stale entry of another
    /// caller, otherwise a new result. If `generate` fails, the caller's previous
    /// entry is kept as it was.
    pub fn get_or_generate(
        &self,
        id: CallerId,
        hash: u64,
        generate: impl FnOnce(&mut LayoutResult) -> Result<(), GenerationError>,
    ) -> Result<Arc<LayoutResult>, GenerationError> {
        let (mut buffer, source) = {
            let mut inner = lock(&self.inner);
            if let Some(result) = inner.lookup(id, hash) {
                return Ok(result);
            }
            inner.take_buffer(id, self.min_frames)
        };
        if let (Source::Recycled(owner), Some(listener)) = (&source, &self.listener) {
            listener(*owner);
        }

        if let Err(error) = regenerate(&mut buffer, generate) {
            if let Source::Owned {
                hash,
                dirty,
                last_frame,
            } = source
            {
                let entry = Entry {
                    owner: id,
                    hash,
                    dirty,
                    result: buffer,
                };
                lock(&self.inner).insert(entry, last_frame);
            }
            return Err(error);
        }

        let mut inner = lock(&self.inner);
        let frame = inner.frame;
        let entry = Entry {
            owner: id,
            hash,
            dirty: false,
            result: buffer.clone(),
        };
        inner.insert(entry, frame);
        Ok(buffer)
    }

    /// Lays out `settings` for `id` on the current thread's context of `contexts`,
    /// unless an up to date result is cached.
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
    /// Returns `false` if nothing is cached for `id`.
    pub fn mark_dirty(&self, id: CallerId) -> bool {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        let Some(&handle) = inner.owners.get(&id) else {
            return false;
        };
        match inner.entries.get_mut(handle) {
            Some(entry) => {
                entry.entry.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Drops the result cached for `id` without notifying the listener.
    pub fn remove(&self, id: CallerId) -> bool {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        inner
            .owners
            .remove(&id)
            .and_then(|handle| inner.entries.remove(handle))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::TemporaryCache;
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
    fn hit_returns_same_buffer() {
        let cache = TemporaryCache::new(2);
        let id = CallerId::new(1);
        let first = cache.get_or_generate(id, 7, fill(12.0)).unwrap();
        let second = cache
            .get_or_generate(id, 7, |_| panic!("should not regenerate"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &cache.get(id, 7).unwrap()));
    }

    #[test]
    fn hash_change_regenerates_in_place() {
        let cache = TemporaryCache::new(2);
        let id = CallerId::new(1);
        let first = cache.get_or_generate(id, 1, fill(10.0)).unwrap();
        let address = Arc::as_ptr(&first);
        drop(first);
        assert!(cache.get(id, 2).is_none());
        let second = cache.get_or_generate(id, 2, fill(20.0)).unwrap();
        assert_eq!(Arc::as_ptr(&second), address);
        assert_eq!(second.font_size(), 20.0);
        assert!(cache.get(id, 1).is_none());
    }

    #[test]
    fn held_result_is_not_overwritten() {
        let cache = TemporaryCache::new(2);
        let id = CallerId::new(1);
        let first = cache.get_or_generate(id, 1, fill(10.0)).unwrap();
        let second = cache.get_or_generate(id, 2, fill(20.0)).unwrap();
        assert_eq!(first.font_size(), 10.0);
        assert_eq!(second.font_size(), 20.0);
    }

    #[test]
    fn dirty_entry_misses() {
        let cache = TemporaryCache::new(2);
        let id = CallerId::new(3);
        cache.get_or_generate(id, 5, fill(10.0)).unwrap();
        assert!(cache.mark_dirty(id));
        assert!(cache.get(id, 5).is_none());
        let mut called = false;
        cache
            .get_or_generate(id, 5, |out| {
                called = true;
                fill(11.0)(out)
            })
            .unwrap();
        assert!(called);
        assert!(cache.get(id, 5).is_some());
        assert!(!cache.mark_dirty(CallerId::new(99)));
    }

    #[test]
    fn stale_entries_are_recycled() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let mut cache = TemporaryCache::new(2);
        let log = evicted.clone();
        cache.set_eviction_listener(move |id| log.lock().unwrap().push(id));

        let a = CallerId::new(1);
        let b = CallerId::new(2);
        let address = Arc::as_ptr(&cache.get_or_generate(a, 1, fill(10.0)).unwrap());

        // Too fresh to recycle.
        cache.begin_frame(1);
        let fresh = cache.get_or_generate(b, 1, fill(11.0)).unwrap();
        assert_ne!(Arc::as_ptr(&fresh), address);
        assert_eq!(cache.len(), 2);
        drop(fresh);
        cache.remove(b);

        cache.begin_frame(2);
        let c = CallerId::new(3);
        let recycled = cache.get_or_generate(c, 1, fill(12.0)).unwrap();
        assert_eq!(Arc::as_ptr(&recycled), address);
        assert_eq!(*evicted.lock().unwrap(), [a]);
        assert!(cache.get(a, 1).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn touching_keeps_entry_fresh() {
        let cache = TemporaryCache::new(2);
        let a = CallerId::new(1);
        cache.get_or_generate(a, 1, fill(10.0)).unwrap();
        cache.begin_frame(2);
        assert!(cache.get(a, 1).is_some());
        cache.get_or_generate(CallerId::new(2), 1, fill(10.0)).unwrap();
        assert!(cache.get(a, 1).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn begin_frame_is_idempotent() {
        let cache = TemporaryCache::default();
        cache.begin_frame(4);
        cache.begin_frame(4);
        cache.begin_frame(3);
        assert_eq!(cache.frame(), 4);
    }

    #[test]
    fn failed_generation_keeps_previous_entry() {
        let cache = TemporaryCache::new(2);
        let id = CallerId::new(1);
        cache.get_or_generate(id, 1, fill(10.0)).unwrap();
        let error = cache
            .get_or_generate(id, 2, |_| Err(GenerationError::NoFont))
            .unwrap_err();
        assert_eq!(error, GenerationError::NoFont);
        assert_eq!(cache.get(id, 1).unwrap().font_size(), 10.0);
    }

    #[test]
    fn failed_generation_keeps_entry_recyclable() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let mut cache = TemporaryCache::new(2);
        let log = evicted.clone();
        cache.set_eviction_listener(move |id| log.lock().unwrap().push(id));

        let a = CallerId::new(1);
        let b = CallerId::new(2);
        let address = Arc::as_ptr(&cache.get_or_generate(a, 1, fill(10.0)).unwrap());
        cache.begin_frame(1);
        cache.get_or_generate(b, 1, fill(11.0)).unwrap();

        // The failed attempt does not make the entry of `a` look recently used.
        cache.begin_frame(2);
        cache
            .get_or_generate(a, 2, |_| Err(GenerationError::NoFont))
            .unwrap_err();
        let c = CallerId::new(3);
        let recycled = cache.get_or_generate(c, 1, fill(12.0)).unwrap();
        assert_eq!(Arc::as_ptr(&recycled), address);
        assert_eq!(*evicted.lock().unwrap(), [a]);
        assert!(cache.get(b, 1).is_some());
    }
}
