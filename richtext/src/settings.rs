// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generation settings.

use core::hash::{BuildHasher, Hasher};

use foldhash::fast::FixedState;
use glyph_atlas::FontId;
use peniko::color::palette::css;

use crate::{Color, FontStyle};

const HASH_SEED: u64 = 0x7269_6368_7465_7874;

/// Horizontal placement of each line within the container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HorizontalAlignment {
    /// Lines start at the left edge.
    #[default]
    Left,
    /// Lines are centered.
    Center,
    /// Lines end at the right edge.
    Right,
    /// Interior spaces are stretched so wrapped lines fill the width. The last
    /// line of a paragraph is left aligned.
    Justified,
    /// Like [`Justified`](Self::Justified), but the last line is stretched too.
    Flush,
}

/// Vertical placement of the text block within the container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VerticalAlignment {
    /// The first line's ascender touches the top edge.
    #[default]
    Top,
    /// The block of line boxes is centered.
    Middle,
    /// The last line's descender touches the bottom edge.
    Bottom,
    /// The first line's baseline is centered.
    Baseline,
    /// The visible glyph bounds are centered.
    Midline,
}

/// Horizontal and vertical alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Alignment {
    /// Horizontal alignment of lines.
    pub horizontal: HorizontalAlignment,
    /// Vertical alignment of the text block.
    pub vertical: VerticalAlignment,
}

impl Alignment {
    /// Creates an alignment from both axes.
    pub const fn new(horizontal: HorizontalAlignment, vertical: VerticalAlignment) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }
}

/// What happens to text that does not fit in the container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OverflowMode {
    /// Text extends past the container.
    #[default]
    Overflow,
    /// Text is cut at the first overflowing line and an ellipsis is appended.
    Ellipsis,
    /// Text is cut at the first overflowing line.
    Truncate,
    /// Geometry is kept as with [`Overflow`](Self::Overflow); the renderer clips
    /// it to the container.
    Masking,
}

/// Padding between the container edges and the text.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Margins {
    /// Left margin.
    pub left: f32,
    /// Top margin.
    pub top: f32,
    /// Right margin.
    pub right: f32,
    /// Bottom margin.
    pub bottom: f32,
}

impl Margins {
    /// The same margin on every side.
    pub const fn uniform(margin: f32) -> Self {
        Self {
            left: margin,
            top: margin,
            right: margin,
            bottom: margin,
        }
    }
}

/// Font weight on the usual 100 to 900 scale.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontWeight(pub u16);

impl FontWeight {
    /// Regular weight.
    pub const NORMAL: Self = Self(400);
    /// Bold weight.
    pub const BOLD: Self = Self(700);
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Range of sizes searched when auto-sizing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoSize {
    /// Smallest acceptable font size.
    pub min: f32,
    /// Largest acceptable font size.
    pub max: f32,
    /// Cap on the number of search steps.
    pub max_iterations: u32,
}

impl AutoSize {
    /// Creates a range with the default iteration cap.
    pub const fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            max_iterations: 32,
        }
    }
}

/// Everything a generation call depends on.
///
/// Spacing values are in hundredths of an em, so `character_spacing: 10.0` adds a
/// tenth of the font size after every character.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    /// The text, possibly with inline markup.
    pub text: String,
    /// The primary font.
    pub font: Option<FontId>,
    /// Font size in layout units.
    pub font_size: f32,
    /// Search for the largest size in this range that fits the container.
    pub auto_size: Option<AutoSize>,
    /// Interpret inline tags.
    pub rich_text: bool,
    /// Decode backslash escapes such as `\n`.
    pub parse_control_characters: bool,
    /// Width of the container.
    pub container_width: f32,
    /// Height of the container.
    pub container_height: f32,
    /// Padding inside the container.
    pub margins: Margins,
    /// Alignment of the text within the container.
    pub alignment: Alignment,
    /// Wrap lines at the container width.
    pub word_wrap: bool,
    /// Handling of text that does not fit.
    pub overflow: OverflowMode,
    /// Extra space after every character.
    pub character_spacing: f32,
    /// Extra space after every space character.
    pub word_spacing: f32,
    /// Extra space between lines.
    pub line_spacing: f32,
    /// Extra space between paragraphs.
    pub paragraph_spacing: f32,
    /// Base text color.
    pub color: Color,
    /// Base style flags applied to the whole text.
    pub font_style: FontStyle,
    /// Base font weight.
    pub font_weight: FontWeight,
    /// Apply pair adjustments between consecutive glyphs.
    pub kerning: bool,
    /// Write vertex colors in linear space.
    pub linear_color: bool,
    /// Name of a style wrapped around the whole text.
    pub default_style: Option<String>,
    /// Pad bitmap glyph quads with the atlas padding too. Distance field glyphs
    /// are always padded and sprites never are.
    pub extra_padding: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: None,
            font_size: 36.0,
            auto_size: None,
            rich_text: true,
            parse_control_characters: true,
            container_width: 200.0,
            container_height: 50.0,
            margins: Margins::default(),
            alignment: Alignment::default(),
            word_wrap: true,
            overflow: OverflowMode::default(),
            character_spacing: 0.0,
            word_spacing: 0.0,
            line_spacing: 0.0,
            paragraph_spacing: 0.0,
            color: css::WHITE,
            font_style: FontStyle::empty(),
            font_weight: FontWeight::NORMAL,
            kerning: true,
            linear_color: false,
            default_style: None,
            extra_padding: false,
        }
    }
}

impl GenerationSettings {
    /// Creates settings for `text` in `font`.
    pub fn new(text: impl Into<String>, font: FontId) -> Self {
        Self {
            text: text.into(),
            font: Some(font),
            ..Self::default()
        }
    }

    /// Stable hash of every field, used as the cache key for generated results.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = FixedState::with_seed(HASH_SEED).build_hasher();
        hasher.write(self.text.as_bytes());
        hasher.write_u8(0xFF);
        match self.font {
            Some(font) => {
                hasher.write_u8(1);
                hasher.write_u32(font.to_u32());
            }
            None => hasher.write_u8(0),
        }
        write_f32(&mut hasher, self.font_size);
        match self.auto_size {
            Some(auto_size) => {
                hasher.write_u8(1);
                write_f32(&mut hasher, auto_size.min);
                write_f32(&mut hasher, auto_size.max);
                hasher.write_u32(auto_size.max_iterations);
            }
            None => hasher.write_u8(0),
        }
        hasher.write_u8(u8::from(self.rich_text));
        hasher.write_u8(u8::from(self.parse_control_characters));
        for value in [
            self.container_width,
            self.container_height,
            self.margins.left,
            self.margins.top,
            self.margins.right,
            self.margins.bottom,
            self.character_spacing,
            self.word_spacing,
            self.line_spacing,
            self.paragraph_spacing,
        ] {
            write_f32(&mut hasher, value);
        }
        hasher.write_u8(self.alignment.horizontal as u8);
        hasher.write_u8(self.alignment.vertical as u8);
        hasher.write_u8(u8::from(self.word_wrap));
        hasher.write_u8(self.overflow as u8);
        for component in self.color.components {
            write_f32(&mut hasher, component);
        }
        hasher.write_u16(self.font_style.bits());
        hasher.write_u16(self.font_weight.0);
        hasher.write_u8(u8::from(self.kerning));
        hasher.write_u8(u8::from(self.linear_color));
        hasher.write_u8(u8::from(self.extra_padding));
        match &self.default_style {
            Some(style) => {
                hasher.write_u8(1);
                hasher.write(style.as_bytes());
            }
            None => hasher.write_u8(0),
        }
        hasher.finish()
    }
}

fn write_f32(hasher: &mut impl Hasher, value: f32) {
    // Normalize -0.0 so equal settings hash equally.
    let value = if value == 0.0 { 0.0 } else { value };
    hasher.write_u32(value.to_bits());
}
