// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Case-insensitive hashing of tag names and values.

const OFFSET_BASIS: u32 = 0x811C_9DC5;
const PRIME: u32 = 0x0100_0193;

const fn fold(hash: u32, unicode: u32) -> u32 {
    let unicode = if unicode >= 'A' as u32 && unicode <= 'Z' as u32 {
        unicode + 32
    } else {
        unicode
    };
    (hash ^ unicode).wrapping_mul(PRIME)
}

/// Hashes an ASCII tag name, ignoring ASCII case.
///
/// Agrees with [`TagHasher`] on ASCII input. Intended for building constant
/// tables of known tag names.
pub const fn tag_hash(name: &str) -> u32 {
    let bytes = name.as_bytes();
    let mut hash = OFFSET_BASIS;
    let mut i = 0;
    while i < bytes.len() {
        hash = fold(hash, bytes[i] as u32);
        i += 1;
    }
    hash
}

/// Incremental case-insensitive hasher over code points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagHasher(u32);

impl Default for TagHasher {
    fn default() -> Self {
        Self(OFFSET_BASIS)
    }
}

impl TagHasher {
    /// Creates an empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one code point.
    pub fn write(&mut self, unicode: u32) {
        self.0 = fold(self.0, unicode);
    }

    /// Returns the hash of everything written so far.
    pub fn finish(self) -> u32 {
        self.0
    }

    /// Hashes every code point of `text`.
    pub fn hash_str(text: &str) -> u32 {
        let mut hasher = Self::new();
        for c in text.chars() {
            hasher.write(c as u32);
        }
        hasher.finish()
    }
}
