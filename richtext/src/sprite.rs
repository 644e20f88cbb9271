// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprite sheets: inline images addressed by name, index or code point.

use glyph_atlas::{AtlasRect, GlyphMetrics};
use hashbrown::HashMap;
use markup::TagHasher;

/// Identifies a sprite sheet within a [`FontRegistry`](crate::FontRegistry).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpriteSheetId(u32);

impl SpriteSheetId {
    /// Creates an id from its raw value.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

/// One image of a sprite sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    name: String,
    name_hash: u32,
    /// Code point this sprite stands in for, if any.
    pub unicode: Option<u32>,
    /// Location in the sheet texture.
    pub rect: AtlasRect,
    /// Metrics in the units of the sheet's point size.
    pub metrics: GlyphMetrics,
    /// Extra scale applied on top of the sheet scale.
    pub scale: f32,
}

impl Sprite {
    /// Creates a sprite whose metrics match its texture rectangle, sitting on the
    /// baseline.
    pub fn new(name: &str, rect: AtlasRect) -> Self {
        Self {
            name: name.into(),
            name_hash: TagHasher::hash_str(name),
            unicode: None,
            rect,
            metrics: GlyphMetrics {
                width: rect.width as f32,
                height: rect.height as f32,
                bearing_x: 0.0,
                bearing_y: rect.height as f32,
                advance: rect.width as f32,
            },
            scale: 1.0,
        }
    }

    /// Sets the code point this sprite stands in for.
    pub fn with_unicode(mut self, unicode: u32) -> Self {
        self.unicode = Some(unicode);
        self
    }

    /// Replaces the metrics.
    pub fn with_metrics(mut self, metrics: GlyphMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// The sprite name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive hash of the name.
    pub fn name_hash(&self) -> u32 {
        self.name_hash
    }
}

/// A texture holding a set of [`Sprite`]s.
///
/// Sprites are sized relative to `point_size`: a sprite as tall as the point size
/// renders as tall as the current font size.
#[derive(Clone, Debug)]
pub struct SpriteSheet {
    name: String,
    name_hash: u32,
    texture_width: u32,
    texture_height: u32,
    point_size: f32,
    sprites: Vec<Sprite>,
    by_name: HashMap<u32, usize>,
    by_unicode: HashMap<u32, usize>,
}

impl SpriteSheet {
    /// Creates an empty sheet backed by a texture of the given size.
    pub fn new(name: &str, texture_width: u32, texture_height: u32, point_size: f32) -> Self {
        Self {
            name: name.into(),
            name_hash: TagHasher::hash_str(name),
            texture_width,
            texture_height,
            point_size,
            sprites: Vec::new(),
            by_name: HashMap::new(),
            by_unicode: HashMap::new(),
        }
    }

    /// Appends a sprite and returns its index.
    ///
    /// A later sprite with the same name or code point shadows the earlier one in
    /// lookups.
    pub fn push(&mut self, sprite: Sprite) -> usize {
        let index = self.sprites.len();
        self.by_name.insert(sprite.name_hash, index);
        if let Some(unicode) = sprite.unicode {
            self.by_unicode.insert(unicode, index);
        }
        self.sprites.push(sprite);
        index
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_sprite(mut self, sprite: Sprite) -> Self {
        self.push(sprite);
        self
    }

    /// The sheet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive hash of the name.
    pub fn name_hash(&self) -> u32 {
        self.name_hash
    }

    /// Texture width in pixels.
    pub fn texture_width(&self) -> u32 {
        self.texture_width
    }

    /// Texture height in pixels.
    pub fn texture_height(&self) -> u32 {
        self.texture_height
    }

    /// Size that sprite metrics are expressed in.
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// All sprites in index order.
    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    /// The sprite at `index`.
    pub fn sprite(&self, index: usize) -> Option<&Sprite> {
        self.sprites.get(index)
    }

    /// Index of the sprite whose name hashes to `hash`.
    pub fn index_by_name_hash(&self, hash: u32) -> Option<usize> {
        self.by_name.get(&hash).copied()
    }

    /// Index of the sprite with the given name.
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.index_by_name_hash(TagHasher::hash_str(name))
    }

    /// Index of the sprite standing in for `unicode`.
    pub fn index_by_unicode(&self, unicode: u32) -> Option<usize> {
        self.by_unicode.get(&unicode).copied()
    }
}
