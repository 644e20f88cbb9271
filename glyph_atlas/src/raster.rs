// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rasterizer capability consumed by the glyph store.

use crate::{AtlasRect, FaceInfo, GlyphMetrics, GlyphPairAdjustment, PageHandle, RenderMode};

bitflags::bitflags! {
    /// Options passed to the rasterizer when loading a glyph.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LoadFlags: u32 {
        /// Do not apply hinting.
        const NO_HINTING = 1 << 0;
        /// Render a one bit per pixel bitmap.
        const MONOCHROME = 1 << 1;
        /// Ignore embedded bitmap strikes.
        const NO_BITMAP = 1 << 2;
    }
}

/// A native font loader and rasterizer for one font face.
///
/// Implementations own the font file and the pixel storage of the atlas pages;
/// the glyph store decides where glyphs go and asks the rasterizer to draw them.
pub trait Rasterizer {
    /// Loads the face at `point_size`, returning its metrics.
    fn load_face(&mut self, point_size: f32, face_index: u32) -> Result<FaceInfo, RasterizerError>;

    /// Returns the glyph index for `unicode`, or 0 if the face has no glyph for it.
    fn glyph_index(&mut self, unicode: u32) -> u32;

    /// Loads the metrics of a glyph. Returns `None` if the glyph cannot be loaded.
    fn rasterize(&mut self, glyph_index: u32, flags: LoadFlags) -> Option<GlyphMetrics>;

    /// Draws a batch of packed glyphs into the pixel storage of `page`.
    fn render_glyphs(&mut self, page: PageHandle, mode: RenderMode, glyphs: &[(u32, AtlasRect)]);

    /// Returns the pair adjustments where the first glyph is in `first` and the
    /// second glyph is in `second`.
    fn pair_adjustments(&mut self, first: &[u32], second: &[u32]) -> Vec<GlyphPairAdjustment> {
        let _ = (first, second);
        Vec::new()
    }
}

/// Errors reported when loading a face.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RasterizerError {
    /// The font source could not be opened.
    SourceUnavailable,
    /// The requested face index does not exist in the source.
    InvalidFaceIndex(u32),
    /// The point size was zero, negative or not finite.
    InvalidPointSize,
}

impl core::fmt::Display for RasterizerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SourceUnavailable => write!(f, "font source unavailable"),
            Self::InvalidFaceIndex(index) => write!(f, "face index {index} does not exist"),
            Self::InvalidPointSize => write!(f, "invalid sampling point size"),
        }
    }
}

impl core::error::Error for RasterizerError {}
