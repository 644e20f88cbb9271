// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred texture upload and persistence notifications.

use std::sync::{Mutex, MutexGuard};

use hashbrown::HashSet;

use crate::{FontId, PageHandle};

/// Receives atlas pages whose pixels changed and need uploading.
///
/// Uploads are deferred: the store enqueues during packing and the owner flushes
/// once per update tick.
pub trait TextureUploadQueue: Send + Sync {
    /// Requests an upload of `page`.
    fn enqueue(&self, page: PageHandle);
}

/// Receives fonts whose tables changed and should be saved.
pub trait PersistenceQueue: Send + Sync {
    /// Marks `font` as needing persistence.
    fn mark_dirty(&self, font: FontId);
}

/// A [`TextureUploadQueue`] that collects unique page handles until flushed.
#[derive(Debug, Default)]
pub struct UploadQueue {
    pending: Mutex<Vec<PageHandle>>,
}

impl UploadQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages waiting for upload.
    pub fn len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Returns `true` if nothing is waiting for upload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes every pending page, leaving the queue empty.
    pub fn take_pending(&self) -> Vec<PageHandle> {
        core::mem::take(&mut *lock(&self.pending))
    }

    /// Hands every pending page to `upload` in the order it was first queued and
    /// returns how many were flushed.
    pub fn flush(&self, mut upload: impl FnMut(PageHandle)) -> usize {
        let pending = self.take_pending();
        let count = pending.len();
        for page in pending {
            upload(page);
        }
        count
    }
}

impl TextureUploadQueue for UploadQueue {
    fn enqueue(&self, page: PageHandle) {
        let mut pending = lock(&self.pending);
        if !pending.contains(&page) {
            pending.push(page);
        }
    }
}

/// A [`PersistenceQueue`] that remembers which fonts are dirty.
#[derive(Debug, Default)]
pub struct DirtyFontSet {
    fonts: Mutex<HashSet<FontId>>,
}

impl DirtyFontSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `font` is waiting to be saved.
    pub fn contains(&self, font: FontId) -> bool {
        lock(&self.fonts).contains(&font)
    }

    /// Takes every dirty font, sorted by id.
    pub fn take(&self) -> Vec<FontId> {
        let mut fonts: Vec<_> = lock(&self.fonts).drain().collect();
        fonts.sort_unstable();
        fonts
    }
}

impl PersistenceQueue for DirtyFontSet {
    fn mark_dirty(&self, font: FontId) {
        lock(&self.fonts).insert(font);
    }
}

/// Locks `mutex`, recovering the data if another thread panicked holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(font: u32, page: u32) -> PageHandle {
        PageHandle {
            font: FontId::new(font),
            page,
        }
    }

    #[test]
    fn uploads_are_deduplicated_until_flushed() {
        let queue = UploadQueue::new();
        queue.enqueue(handle(0, 0));
        queue.enqueue(handle(0, 1));
        queue.enqueue(handle(0, 0));
        assert_eq!(queue.len(), 2);
        let mut seen = Vec::new();
        assert_eq!(queue.flush(|page| seen.push(page)), 2);
        assert_eq!(seen, vec![handle(0, 0), handle(0, 1)]);
        assert!(queue.is_empty());
        queue.enqueue(handle(0, 0));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn dirty_fonts_are_taken_once() {
        let set = DirtyFontSet::new();
        set.mark_dirty(FontId::new(2));
        set.mark_dirty(FontId::new(1));
        set.mark_dirty(FontId::new(2));
        assert!(set.contains(FontId::new(1)));
        assert_eq!(set.take(), vec![FontId::new(1), FontId::new(2)]);
        assert!(set.take().is_empty());
    }

    #[test]
    fn poisoned_queues_keep_their_contents() {
        let queue = UploadQueue::new();
        queue.enqueue(handle(0, 3));
        let set = DirtyFontSet::new();
        set.mark_dirty(FontId::new(4));
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _pending = queue.pending.lock().unwrap();
            let _fonts = set.fonts.lock().unwrap();
            panic!("poison both locks");
        }));
        assert!(queue.pending.is_poisoned());
        assert!(set.fonts.is_poisoned());

        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
        assert!(set.contains(FontId::new(4)));
        assert_eq!(queue.take_pending(), vec![handle(0, 3)]);
        assert_eq!(set.take(), vec![FontId::new(4)]);
    }
}
