// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Richtext Dev
//!
//! This crate provides utilities for developing Richtext: a deterministic
//! [`Rasterizer`] that needs no font files, and text samples.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glyph_atlas::{
    AtlasRect, FaceInfo, FontAssetSettings, FontGlyphStore, FontId, GlyphAdjustment,
    GlyphMetrics, GlyphPairAdjustment, LoadFlags, PageHandle, Rasterizer, RasterizerError,
    RenderMode,
};

/// Horizontal advance of most glyphs, in ems.
pub const ADVANCE: f32 = 0.6;
/// Advance of spaces, in ems.
pub const SPACE_ADVANCE: f32 = 0.25;
/// Advance of CJK ideographs, kana, Hangul and ideographic spaces, in ems.
pub const WIDE_ADVANCE: f32 = 1.0;
/// Ascender, in ems.
pub const ASCENT: f32 = 0.8;
/// Descender, in ems. Negative, below the baseline.
pub const DESCENT: f32 = -0.2;
/// Distance between baselines, in ems.
pub const LINE_HEIGHT: f32 = 1.2;

/// Counts how often a [`SyntheticRasterizer`] was asked for work.
#[derive(Debug, Default)]
pub struct RasterCounters {
    lookups: AtomicUsize,
    rasterized: AtomicUsize,
    rendered: AtomicUsize,
}

impl RasterCounters {
    /// Number of glyph index lookups.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Number of glyphs whose metrics were loaded.
    pub fn rasterized(&self) -> usize {
        self.rasterized.load(Ordering::Relaxed)
    }

    /// Number of glyphs drawn into atlas pages.
    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::Relaxed)
    }
}

/// A rasterizer with made-up, fully predictable metrics.
///
/// The glyph index of a code point is the code point plus one. At the sampling
/// point size `p`, glyphs advance by [`ADVANCE`]` * p`, spaces by
/// [`SPACE_ADVANCE`]` * p` and wide characters by [`WIDE_ADVANCE`]` * p`.
/// Controls have neither a box nor an advance.
#[derive(Debug)]
pub struct SyntheticRasterizer {
    point_size: f32,
    missing: Vec<u32>,
    aliases: Vec<(u32, u32)>,
    kerning: Vec<(u32, u32, f32)>,
    fail: bool,
    counters: Arc<RasterCounters>,
}

impl Default for SyntheticRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticRasterizer {
    /// Creates a rasterizer that has a glyph for every code point.
    pub fn new() -> Self {
        Self {
            point_size: 0.0,
            missing: Vec::new(),
            aliases: Vec::new(),
            kerning: Vec::new(),
            fail: false,
            counters: Arc::new(RasterCounters::default()),
        }
    }

    /// Makes the face report no glyph for `chars`.
    pub fn with_missing(mut self, chars: impl IntoIterator<Item = char>) -> Self {
        self.missing.extend(chars.into_iter().map(u32::from));
        self
    }

    /// Makes `from` render with the glyph of `to`.
    pub fn with_alias(mut self, from: char, to: char) -> Self {
        self.aliases.push((from.into(), to.into()));
        self
    }

    /// Adds `adjustment` (in ems) to the advance of `first` when followed by
    /// `second`.
    pub fn with_kerning(mut self, first: char, second: char, adjustment: f32) -> Self {
        self.kerning.push((first.into(), second.into(), adjustment));
        self
    }

    /// Makes loading the face fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// The counters of this rasterizer, shared with every clone of the handle.
    pub fn counters(&self) -> Arc<RasterCounters> {
        self.counters.clone()
    }

    /// Builds a dynamic glyph store for `id` on this rasterizer.
    pub fn into_store(self, id: FontId, settings: FontAssetSettings) -> FontGlyphStore {
        FontGlyphStore::dynamic(id, settings, Box::new(self))
    }

    fn unicode_of(&self, glyph_index: u32) -> u32 {
        glyph_index.saturating_sub(1)
    }
}

/// Atlas settings sampling at `point_size` with a small single page.
pub fn font_settings(point_size: f32) -> FontAssetSettings {
    FontAssetSettings {
        point_size,
        atlas_width: 512,
        atlas_height: 512,
        padding: 1,
        render_mode: RenderMode::Smooth,
        ..FontAssetSettings::default()
    }
}

fn is_wide(unicode: u32) -> bool {
    matches!(
        unicode,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFF01..=0xFF60
    )
}

fn is_space(unicode: u32) -> bool {
    matches!(unicode, 0x20 | 0xA0 | 0x2000..=0x200A | 0x202F | 0x205F)
}

impl Rasterizer for SyntheticRasterizer {
    fn load_face(&mut self, point_size: f32, _: u32) -> Result<FaceInfo, RasterizerError> {
        if self.fail {
            return Err(RasterizerError::SourceUnavailable);
        }
        if !point_size.is_finite() || point_size <= 0.0 {
            return Err(RasterizerError::InvalidPointSize);
        }
        self.point_size = point_size;
        let p = point_size;
        Ok(FaceInfo {
            family_name: "Synthetic".into(),
            style_name: "Regular".into(),
            point_size: p,
            scale: 1.0,
            line_height: LINE_HEIGHT * p,
            ascent_line: ASCENT * p,
            cap_line: 0.7 * p,
            mean_line: 0.5 * p,
            baseline: 0.0,
            descent_line: DESCENT * p,
            superscript_offset: 0.4 * p,
            superscript_size: 0.5,
            subscript_offset: -0.1 * p,
            subscript_size: 0.5,
            underline_offset: -0.1 * p,
            underline_thickness: 0.05 * p,
            strikethrough_offset: 0.25 * p,
            strikethrough_thickness: 0.05 * p,
            tab_width: SPACE_ADVANCE * p,
        })
    }

    fn glyph_index(&mut self, unicode: u32) -> u32 {
        self.counters.lookups.fetch_add(1, Ordering::Relaxed);
        if self.missing.contains(&unicode) {
            return 0;
        }
        let unicode = self
            .aliases
            .iter()
            .find(|(from, _)| *from == unicode)
            .map_or(unicode, |(_, to)| *to);
        unicode.saturating_add(1)
    }

    fn rasterize(&mut self, glyph_index: u32, _: LoadFlags) -> Option<GlyphMetrics> {
        self.counters.rasterized.fetch_add(1, Ordering::Relaxed);
        let p = self.point_size;
        let unicode = self.unicode_of(glyph_index);
        let metrics = if unicode < 0x20 || (0x7F..0xA0).contains(&unicode) {
            GlyphMetrics::default()
        } else if unicode == 0x3000 {
            GlyphMetrics {
                advance: WIDE_ADVANCE * p,
                ..GlyphMetrics::default()
            }
        } else if is_space(unicode) {
            GlyphMetrics {
                advance: SPACE_ADVANCE * p,
                ..GlyphMetrics::default()
            }
        } else if is_wide(unicode) {
            GlyphMetrics {
                width: 0.9 * p,
                height: 0.9 * p,
                bearing_x: 0.05 * p,
                bearing_y: 0.8 * p,
                advance: WIDE_ADVANCE * p,
            }
        } else {
            GlyphMetrics {
                width: 0.5 * p,
                height: 0.7 * p,
                bearing_x: 0.05 * p,
                bearing_y: 0.7 * p,
                advance: ADVANCE * p,
            }
        };
        Some(metrics)
    }

    fn render_glyphs(&mut self, _: PageHandle, _: RenderMode, glyphs: &[(u32, AtlasRect)]) {
        self.counters
            .rendered
            .fetch_add(glyphs.len(), Ordering::Relaxed);
    }

    fn pair_adjustments(&mut self, first: &[u32], second: &[u32]) -> Vec<GlyphPairAdjustment> {
        let p = self.point_size;
        self.kerning
            .iter()
            .map(|&(a, b, adjustment)| (a + 1, b + 1, adjustment))
            .filter(|(a, b, _)| first.contains(a) && second.contains(b))
            .map(|(a, b, adjustment)| GlyphPairAdjustment {
                first: a,
                second: b,
                first_adjustment: GlyphAdjustment {
                    x_advance: adjustment * p,
                    ..GlyphAdjustment::default()
                },
                second_adjustment: GlyphAdjustment::default(),
            })
            .collect()
    }
}

/// A sample to be used for development.
#[derive(Debug)]
pub struct Sample {
    /// The name of the sample.
    pub name: &'static str,
    /// The text of the sample.
    pub text: &'static str,
}

/// A collection of text samples.
#[derive(Debug)]
pub struct TextSamples {
    /// The Latin text sample.
    pub latin: Sample,
    /// The Japanese text sample.
    pub japanese: Sample,
    /// The Korean text sample.
    pub korean: Sample,
    /// A Latin sample using inline markup.
    pub markup: Sample,
}

impl TextSamples {
    /// Creates a new collection of text samples.
    pub const fn new() -> Self {
        Self {
            latin: Sample {
                name: "latin",
                text: include_str!("../assets/text_samples/latin.txt"),
            },
            japanese: Sample {
                name: "japanese",
                text: include_str!("../assets/text_samples/japanese.txt"),
            },
            korean: Sample {
                name: "korean",
                text: include_str!("../assets/text_samples/korean.txt"),
            },
            markup: Sample {
                name: "markup",
                text: include_str!("../assets/text_samples/markup.txt"),
            },
        }
    }
}

impl Default for TextSamples {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_scale_with_point_size() {
        let mut raster = SyntheticRasterizer::new();
        let face = raster.load_face(10.0, 0).unwrap();
        assert_eq!(face.ascent_line, 8.0);
        assert_eq!(face.line_gap(), 2.0);
        let a = raster.glyph_index('A'.into());
        assert_eq!(a, 'A' as u32 + 1);
        assert_eq!(raster.rasterize(a, LoadFlags::empty()).unwrap().advance, 6.0);
        let space = raster.glyph_index(' '.into());
        let metrics = raster.rasterize(space, LoadFlags::empty()).unwrap();
        assert_eq!((metrics.width, metrics.advance), (0.0, 2.5));
    }

    #[test]
    fn missing_and_aliased_code_points() {
        let mut raster = SyntheticRasterizer::new()
            .with_missing(['x'])
            .with_alias('y', 'z');
        raster.load_face(10.0, 0).unwrap();
        assert_eq!(raster.glyph_index('x'.into()), 0);
        assert_eq!(raster.glyph_index('y'.into()), raster.glyph_index('z'.into()));
        assert_eq!(raster.counters().lookups(), 3);
    }

    #[test]
    fn failing_face() {
        let mut raster = SyntheticRasterizer::new().failing();
        assert_eq!(
            raster.load_face(10.0, 0),
            Err(RasterizerError::SourceUnavailable)
        );
    }
}
