// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};
use glyph_atlas::FontId;

use crate::SpriteSheetId;

/// Quad vertices are written bottom-left, top-left, top-right, bottom-right.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

const MIN_QUAD_CAPACITY: usize = 4;

/// One vertex of a glyph quad, laid out for direct upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GlyphVertex {
    /// Position in layout units, y pointing down.
    pub position: [f32; 2],
    /// Normalized texture coordinates, v pointing down.
    pub uv: [f32; 2],
    /// Vertex color as 8-bit RGBA.
    pub color: [u8; 4],
    /// Glyph scale for distance field shaders. Negative for synthesized bold.
    pub scale: f32,
}

/// The texture a quad samples from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialKey {
    /// An atlas page of a font.
    Font {
        /// The font owning the atlas.
        font: FontId,
        /// Index of the page.
        page: u32,
    },
    /// A sprite sheet texture.
    Sprite {
        /// The sprite sheet.
        sheet: SpriteSheetId,
    },
}

/// Vertex and index buffers of every quad sampling one material.
///
/// Buffers hold a power-of-two number of quads. Slots past
/// [`quad_count`](Self::quad_count) are always zeroed, so the whole buffer can be
/// uploaded without drawing stale geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshGroup {
    key: MaterialKey,
    vertices: Vec<GlyphVertex>,
    indices: Vec<u32>,
    quads: usize,
}

impl MeshGroup {
    pub(crate) fn new(key: MaterialKey) -> Self {
        Self {
            key,
            vertices: Vec::new(),
            indices: Vec::new(),
            quads: 0,
        }
    }

    /// The material this group samples.
    pub fn key(&self) -> MaterialKey {
        self.key
    }

    /// Number of quads written.
    pub fn quad_count(&self) -> usize {
        self.quads
    }

    /// Number of quads the buffers can hold.
    pub fn capacity(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Vertices of the written quads.
    pub fn vertices(&self) -> &[GlyphVertex] {
        &self.vertices[..self.quads * 4]
    }

    /// Indices of the written quads.
    pub fn indices(&self) -> &[u32] {
        &self.indices[..self.quads * 6]
    }

    /// The whole vertex buffer, including the zeroed tail.
    pub fn vertex_buffer(&self) -> &[GlyphVertex] {
        &self.vertices
    }

    /// The whole index buffer, including the zeroed tail.
    pub fn index_buffer(&self) -> &[u32] {
        &self.indices
    }

    /// The whole vertex buffer as bytes.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Empties the group and rebinds it to `key`, keeping its buffers.
    pub(crate) fn reset(&mut self, key: MaterialKey) {
        let used = self.quads;
        self.vertices[..used * 4].fill(GlyphVertex::zeroed());
        self.indices[..used * 6].fill(0);
        self.quads = 0;
        self.key = key;
    }

    /// Appends a quad and returns its index within the group.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "a single layout never produces anywhere near u32::MAX vertices"
    )]
    pub(crate) fn push_quad(&mut self, quad: [GlyphVertex; 4]) -> usize {
        if self.quads == self.capacity() {
            let capacity = (self.quads + 1).next_power_of_two().max(MIN_QUAD_CAPACITY);
            self.vertices.resize(capacity * 4, GlyphVertex::zeroed());
            self.indices.resize(capacity * 6, 0);
        }
        let quad_index = self.quads;
        let base = quad_index * 4;
        self.vertices[base..base + 4].copy_from_slice(&quad);
        for (slot, offset) in self.indices[quad_index * 6..quad_index * 6 + 6]
            .iter_mut()
            .zip(QUAD_INDICES)
        {
            *slot = base as u32 + offset;
        }
        self.quads += 1;
        quad_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad(x: f32) -> [GlyphVertex; 4] {
        [GlyphVertex {
            position: [x, 0.0],
            uv: [0.0, 0.0],
            color: [255; 4],
            scale: 1.0,
        }; 4]
    }

    #[test]
    fn capacity_grows_in_powers_of_two() {
        let mut group = MeshGroup::new(MaterialKey::Sprite {
            sheet: SpriteSheetId::new(0),
        });
        for i in 0..5 {
            group.push_quad(quad(i as f32));
        }
        assert_eq!(group.quad_count(), 5);
        assert_eq!(group.capacity(), 8);
        assert_eq!(&group.indices()[24..], &[16, 17, 18, 18, 19, 16]);
        assert!(group.vertex_buffer()[20..]
            .iter()
            .all(|vertex| *vertex == GlyphVertex::zeroed()));
        assert_eq!(group.vertex_bytes().len(), 8 * 4 * 24);
    }

    #[test]
    fn reset_zeroes_and_keeps_capacity() {
        let key = MaterialKey::Font {
            font: FontId::new(1),
            page: 0,
        };
        let mut group = MeshGroup::new(key);
        for i in 0..3 {
            group.push_quad(quad(i as f32 + 1.0));
        }
        group.reset(key);
        assert_eq!(group.quad_count(), 0);
        assert_eq!(group.capacity(), 4);
        assert!(group.vertex_buffer().iter().all(|v| *v == GlyphVertex::zeroed()));
        assert!(group.index_buffer().iter().all(|i| *i == 0));
        group.push_quad(quad(9.0));
        assert_eq!(group.vertices()[0].position, [9.0, 0.0]);
        assert_eq!(group.indices(), &QUAD_INDICES);
    }
}
