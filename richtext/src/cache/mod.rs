// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Caches of generated layouts, keyed by caller identity and settings hash.
//!
//! [`TemporaryCache`] holds results only while their caller keeps asking for
//! them: once a result has gone untouched for a number of frames, its buffers can
//! be recycled for another caller. [`PermanentCache`] binds a result to a caller
//! until it is explicitly released.
//!
//! Both hand out results as [`Arc<LayoutResult>`](std::sync::Arc). A buffer is
//! regenerated in place when the cache holds the only reference to it, so a
//! caller that drops its result before asking again never allocates.

mod permanent;
mod pool;
mod temporary;

use std::sync::{Arc, Mutex, MutexGuard};

pub use permanent::PermanentCache;
pub use temporary::{EvictionListener, TemporaryCache};

use crate::{GenerationError, LayoutResult};

/// Identity of a cache client.
///
/// The value is chosen by the caller, typically from a widget or entity id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerId(u64);

impl CallerId {
    /// Creates an identity from a raw value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub const fn to_u64(self) -> u64 {
        self.0
    }
}

/// A cached result and what it was generated from.
#[derive(Clone, Debug)]
struct Entry {
    owner: CallerId,
    hash: u64,
    dirty: bool,
    result: Arc<LayoutResult>,
}

impl Entry {
    fn is_valid(&self, hash: u64) -> bool {
        !self.dirty && self.hash == hash
    }
}

/// Generates into `buffer`, cloning it first if a caller still holds it.
fn regenerate(
    buffer: &mut Arc<LayoutResult>,
    generate: impl FnOnce(&mut LayoutResult) -> Result<(), GenerationError>,
) -> Result<(), GenerationError> {
    generate(Arc::make_mut(buffer))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
