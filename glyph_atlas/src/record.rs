// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph, character and face records.

use crate::AtlasRect;

/// Identifies a font registered with a font registry.
///
/// Characters refer to their font through this key rather than holding a
/// reference to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontId(u32);

impl FontId {
    /// Creates an id from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

/// Glyph metrics in the units of the face's sampling point size.
///
/// `bearing_y` is measured upwards from the baseline to the top of the glyph box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphMetrics {
    /// Width of the glyph box.
    pub width: f32,
    /// Height of the glyph box.
    pub height: f32,
    /// Offset from the pen position to the left edge of the glyph box.
    pub bearing_x: f32,
    /// Offset from the baseline to the top edge of the glyph box.
    pub bearing_y: f32,
    /// Horizontal pen advance.
    pub advance: f32,
}

impl GlyphMetrics {
    /// The atlas footprint of the glyph, rounded up to whole pixels.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "glyph boxes are far smaller than u32::MAX pixels"
    )]
    pub fn pixel_size(&self) -> crate::RectSize {
        crate::RectSize::new(
            self.width.max(0.0).ceil() as u32,
            self.height.max(0.0).ceil() as u32,
        )
    }
}

/// A rasterized glyph and its location in the atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphRecord {
    /// Font-local glyph index.
    pub index: u32,
    /// Metrics of the glyph.
    pub metrics: GlyphMetrics,
    /// Location in the atlas page, excluding padding.
    pub rect: AtlasRect,
    /// Index of the atlas page holding the glyph.
    pub page: u32,
    /// Scale the glyph was rendered at relative to the face.
    pub scale: f32,
}

/// Maps a code point onto a glyph of a font.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterRecord {
    /// The Unicode code point.
    pub unicode: u32,
    /// Index of the glyph rendering this character.
    pub glyph_index: u32,
    /// Scale relative to the glyph, used for synthesized characters.
    pub scale: f32,
    /// The font owning this character.
    pub font: FontId,
}

/// Face-wide metrics at the sampling point size.
///
/// Vertical values are measured upwards from the baseline, so descenders and
/// underline offsets are usually negative.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceInfo {
    /// Family name reported by the face.
    pub family_name: String,
    /// Style name reported by the face.
    pub style_name: String,
    /// The point size glyphs are sampled at.
    pub point_size: f32,
    /// Scale applied to every glyph of the face.
    pub scale: f32,
    /// Distance between consecutive baselines.
    pub line_height: f32,
    /// Ascender line.
    pub ascent_line: f32,
    /// Cap height line.
    pub cap_line: f32,
    /// x-height line.
    pub mean_line: f32,
    /// Baseline, usually zero.
    pub baseline: f32,
    /// Descender line.
    pub descent_line: f32,
    /// Offset of the superscript baseline.
    pub superscript_offset: f32,
    /// Relative size of superscript glyphs.
    pub superscript_size: f32,
    /// Offset of the subscript baseline.
    pub subscript_offset: f32,
    /// Relative size of subscript glyphs.
    pub subscript_size: f32,
    /// Offset of the underline.
    pub underline_offset: f32,
    /// Thickness of the underline.
    pub underline_thickness: f32,
    /// Offset of the strikethrough.
    pub strikethrough_offset: f32,
    /// Thickness of the strikethrough.
    pub strikethrough_thickness: f32,
    /// Width of a tab stop unit.
    pub tab_width: f32,
}

impl FaceInfo {
    /// Space between the descender of one line and the ascender of the next.
    pub fn line_gap(&self) -> f32 {
        self.line_height - (self.ascent_line - self.descent_line)
    }
}

/// Position and advance adjustments applied to one glyph of a pair.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphAdjustment {
    /// Horizontal placement offset.
    pub x_placement: f32,
    /// Vertical placement offset.
    pub y_placement: f32,
    /// Change to the horizontal advance.
    pub x_advance: f32,
    /// Change to the vertical advance.
    pub y_advance: f32,
}

/// A kerning-like adjustment between two consecutive glyphs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphPairAdjustment {
    /// Glyph index of the first glyph.
    pub first: u32,
    /// Glyph index of the second glyph.
    pub second: u32,
    /// Adjustment applied to the first glyph.
    pub first_adjustment: GlyphAdjustment,
    /// Adjustment applied to the second glyph.
    pub second_adjustment: GlyphAdjustment,
}
