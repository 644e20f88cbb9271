// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::TagHasher;

/// A named pair of markup snippets spliced in by `<style=name>` and `</style>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextStyle {
    name: String,
    hash: u32,
    opening: Vec<u32>,
    closing: Vec<u32>,
}

impl TextStyle {
    /// Creates a style from its opening and closing markup.
    pub fn new(name: &str, opening: &str, closing: &str) -> Self {
        Self {
            name: name.into(),
            hash: TagHasher::hash_str(name),
            opening: opening.chars().map(|c| c as u32).collect(),
            closing: closing.chars().map(|c| c as u32).collect(),
        }
    }

    /// The style name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive hash of the name.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Code points spliced in place of the opening tag.
    pub fn opening(&self) -> &[u32] {
        &self.opening
    }

    /// Code points spliced in place of the closing tag.
    pub fn closing(&self) -> &[u32] {
        &self.closing
    }
}

/// A registry of [`TextStyle`]s looked up by name hash.
#[derive(Clone, Debug, Default)]
pub struct StyleSheet {
    styles: Vec<TextStyle>,
    lookup: HashMap<u32, usize>,
}

impl StyleSheet {
    /// Creates an empty style sheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a style, returning the style it replaced.
    pub fn insert(&mut self, style: TextStyle) -> Option<TextStyle> {
        match self.lookup.get(&style.hash) {
            Some(&index) => Some(core::mem::replace(&mut self.styles[index], style)),
            None => {
                self.lookup.insert(style.hash, self.styles.len());
                self.styles.push(style);
                None
            }
        }
    }

    /// Removes the style with the given name.
    pub fn remove(&mut self, name: &str) -> Option<TextStyle> {
        let index = self.lookup.remove(&TagHasher::hash_str(name))?;
        let removed = self.styles.remove(index);
        for slot in self.lookup.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Position of the style with the given name hash.
    pub fn index_of(&self, hash: u32) -> Option<usize> {
        self.lookup.get(&hash).copied()
    }

    /// Returns the style with the given name hash.
    pub fn get(&self, hash: u32) -> Option<&TextStyle> {
        self.index_of(hash).map(|index| &self.styles[index])
    }

    /// Returns the style with the given name.
    pub fn get_by_name(&self, name: &str) -> Option<&TextStyle> {
        self.get(TagHasher::hash_str(name))
    }

    /// Returns the style at `index`.
    pub fn style(&self, index: usize) -> Option<&TextStyle> {
        self.styles.get(index)
    }

    /// Number of styles.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Returns `true` if no styles are registered.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Iterates over the styles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TextStyle> + '_ {
        self.styles.iter()
    }
}
