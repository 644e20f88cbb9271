// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::LoadFlags;

/// How glyphs are rendered into the atlas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Hinted, aliased bitmap.
    Raster,
    /// Hinted, antialiased bitmap.
    Smooth,
    /// Signed distance field.
    #[default]
    Sdf,
}

impl RenderMode {
    /// Returns `true` for the bitmap modes, which are packed edge to edge.
    pub const fn is_bitmap(self) -> bool {
        matches!(self, Self::Raster | Self::Smooth)
    }

    /// Pixels kept free on the right and bottom page edges.
    ///
    /// Distance field glyphs sample past their box, so the last row and column of a
    /// page are never packed for them.
    pub const fn packing_modifier(self) -> u32 {
        if self.is_bitmap() { 0 } else { 1 }
    }

    /// Loader flags matching this render mode.
    pub fn load_flags(self) -> LoadFlags {
        match self {
            Self::Raster => LoadFlags::MONOCHROME,
            Self::Smooth => LoadFlags::empty(),
            Self::Sdf => LoadFlags::NO_HINTING,
        }
    }
}

/// When the glyph tables of a font may change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PopulationMode {
    /// Tables and atlas were baked ahead of time and never change.
    Static,
    /// Glyphs are rasterized and packed on demand.
    #[default]
    Dynamic,
}

/// Configuration of a font's glyph atlas.
#[derive(Clone, Debug, PartialEq)]
pub struct FontAssetSettings {
    /// The point size glyphs are sampled at.
    pub point_size: f32,
    /// Face index within a font collection.
    pub face_index: u32,
    /// Width of every atlas page in pixels.
    pub atlas_width: u32,
    /// Height of every atlas page in pixels.
    pub atlas_height: u32,
    /// Pixels of padding around each glyph.
    pub padding: u32,
    /// How glyphs are rendered.
    pub render_mode: RenderMode,
    /// Whether the tables may change at runtime.
    pub population_mode: PopulationMode,
    /// Whether a new page may be added when the current one is full.
    pub multi_atlas: bool,
    /// Number of tab width units in one tab stop.
    pub tab_multiple: u8,
}

impl Default for FontAssetSettings {
    fn default() -> Self {
        Self {
            point_size: 90.0,
            face_index: 0,
            atlas_width: 1024,
            atlas_height: 1024,
            padding: 9,
            render_mode: RenderMode::default(),
            population_mode: PopulationMode::default(),
            multi_atlas: false,
            tab_multiple: 10,
        }
    }
}
