// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::ops::Range;

use glyph_atlas::FontId;

use super::mesh::{MaterialKey, MeshGroup};
use crate::{Color, Diagnostic, FontStyle, HorizontalAlignment, SpriteSheetId};

/// An axis-aligned rectangle in layout units, y pointing down.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Extents {
    /// Left edge.
    pub x0: f32,
    /// Top edge.
    pub y0: f32,
    /// Right edge.
    pub x1: f32,
    /// Bottom edge.
    pub y1: f32,
}

impl Extents {
    /// Creates extents from two corners.
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// The smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// What a character renders as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// A glyph from a font atlas.
    Character {
        /// The font the glyph came from, which may be a fallback.
        font: FontId,
        /// Font-local glyph index.
        glyph_index: u32,
    },
    /// An inline sprite.
    Sprite {
        /// The sprite sheet.
        sheet: SpriteSheetId,
        /// Index of the sprite in its sheet.
        index: u32,
    },
    /// A code point no font could render. It takes no space.
    Placeholder,
    /// A control character such as a line feed.
    Control,
}

/// One character of a generated layout.
#[derive(Clone, Debug, PartialEq)]
pub struct CharacterInfo {
    /// What the character renders as.
    pub element: ElementKind,
    /// The code point after case transforms.
    pub unicode: u32,
    /// Offset of the character in the input, in UTF-16 code units.
    pub source_index: u32,
    /// Number of input code units the character came from. Zero for characters
    /// inserted by styles or overflow handling.
    pub source_len: u32,
    /// Whether the character produced a quad.
    pub visible: bool,
    /// Index of the line holding the character.
    pub line: u32,
    /// Pen position.
    pub x: f32,
    /// Baseline position.
    pub baseline: f32,
    /// Horizontal advance, including spacing.
    pub advance: f32,
    /// Glyph box, excluding atlas padding, before italic shear and rotation.
    pub bounds: Extents,
    /// Distance from the baseline up to the ascender line.
    pub ascent: f32,
    /// Distance from the baseline down to the descender line.
    pub descent: f32,
    /// Effective font size.
    pub font_size: f32,
    /// Scale from glyph metrics to layout units.
    pub scale: f32,
    /// Vertex color.
    pub color: Color,
    /// Style flags in effect.
    pub style: FontStyle,
    /// Index of the mesh group holding the quad.
    pub material: Option<u32>,
}

impl CharacterInfo {
    /// Returns `true` if the character has the given style flag.
    pub fn has_style(&self, flag: FontStyle) -> bool {
        self.style.contains(flag)
    }
}

/// Why a line ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BreakReason {
    /// The text ended.
    #[default]
    None,
    /// A line feed or paragraph separator.
    Newline,
    /// Wrapped at a break opportunity.
    Wrap,
    /// Wrapped inside a run that had no break opportunity.
    Emergency,
}

/// One line of a generated layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineRecord {
    /// Characters on the line, including hidden and control characters.
    pub chars: Range<usize>,
    /// First character that produced a quad.
    pub first_visible: Option<usize>,
    /// Last character that produced a quad.
    pub last_visible: Option<usize>,
    /// Distance from the baseline to the highest ascender line on the line.
    pub ascent: f32,
    /// Distance from the baseline to the lowest descender line on the line.
    pub descent: f32,
    /// Baseline position.
    pub baseline: f32,
    /// Width of the content, excluding trailing whitespace.
    pub width: f32,
    /// Position of the line start, after alignment.
    pub offset: f32,
    /// Width available to the line.
    pub max_width: f32,
    /// Union of the glyph boxes on the line.
    pub extents: Extents,
    /// Alignment applied to the line.
    pub alignment: HorizontalAlignment,
    /// Why the line ended.
    pub break_reason: BreakReason,
    /// Spaces between the first and last visible character.
    pub num_spaces: usize,
}

/// Kind of a [`Decoration`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecorationKind {
    /// Below the baseline.
    Underline,
    /// Through the middle of the glyphs.
    Strikethrough,
    /// Behind the line box.
    Highlight,
}

/// A line drawn under, through or behind a run of characters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decoration {
    /// What is drawn.
    pub kind: DecorationKind,
    /// Line holding the run.
    pub line: u32,
    /// Rectangle to fill.
    pub rect: Extents,
    /// Fill color.
    pub color: Color,
}

/// A run of characters inside a `<link>` tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkInfo {
    /// The value of the tag.
    pub id: String,
    /// Index of the first character.
    pub first_char: usize,
    /// Number of characters.
    pub char_count: usize,
}

/// The output of a generation call.
///
/// Results are meant to be regenerated in place: vectors are cleared rather than
/// dropped, and mesh groups keep their buffers, so laying out text of a similar
/// length again does not allocate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutResult {
    pub(crate) characters: Vec<CharacterInfo>,
    pub(crate) lines: Vec<LineRecord>,
    pub(crate) groups: Vec<MeshGroup>,
    pub(crate) active_groups: usize,
    pub(crate) decorations: Vec<Decoration>,
    pub(crate) links: Vec<LinkInfo>,
    pub(crate) missing: Vec<u32>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) preferred_size: (f32, f32),
    pub(crate) bounds: Extents,
    pub(crate) font_size: f32,
    pub(crate) truncated: bool,
}

impl LayoutResult {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every character, in text order.
    pub fn characters(&self) -> &[CharacterInfo] {
        &self.characters
    }

    /// Every line, top to bottom.
    pub fn lines(&self) -> &[LineRecord] {
        &self.lines
    }

    /// Mesh groups in order of first use.
    pub fn mesh_groups(&self) -> &[MeshGroup] {
        &self.groups[..self.active_groups]
    }

    /// Decorations in text order.
    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    /// Link runs in text order.
    pub fn links(&self) -> &[LinkInfo] {
        &self.links
    }

    /// Code points no font or sprite sheet could render, in order of first use.
    pub fn missing(&self) -> &[u32] {
        &self.missing
    }

    /// Non-fatal problems found while generating.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Size the text needs, including margins.
    pub fn preferred_size(&self) -> (f32, f32) {
        self.preferred_size
    }

    /// Union of every visible glyph box.
    pub fn bounds(&self) -> Extents {
        self.bounds
    }

    /// The font size used, which differs from the requested one when auto-sizing.
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Returns `true` if overflow handling hid part of the text.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Number of characters that produced a quad.
    pub fn visible_count(&self) -> usize {
        self.characters.iter().filter(|c| c.visible).count()
    }

    /// The text of the visible characters and spaces of each line, one string
    /// per line.
    pub fn line_texts(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| {
                let end = line.last_visible.map_or(line.chars.start, |last| last + 1);
                self.characters[line.chars.start..end]
                    .iter()
                    .filter(|c| c.element != ElementKind::Control)
                    .filter_map(|c| char::from_u32(c.unicode))
                    .collect()
            })
            .collect()
    }

    /// Empties the result, keeping its allocations.
    pub(crate) fn clear(&mut self) {
        self.characters.clear();
        self.lines.clear();
        for group in &mut self.groups[..self.active_groups] {
            group.reset(group.key());
        }
        self.active_groups = 0;
        self.decorations.clear();
        self.links.clear();
        self.missing.clear();
        self.diagnostics.clear();
        self.preferred_size = (0.0, 0.0);
        self.bounds = Extents::default();
        self.font_size = 0.0;
        self.truncated = false;
    }

    /// Index of the mesh group for `key`, activating a spare group if needed.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "a layout holds a handful of materials"
    )]
    pub(crate) fn group_for(&mut self, key: MaterialKey) -> u32 {
        if let Some(index) = self.groups[..self.active_groups]
            .iter()
            .position(|group| group.key() == key)
        {
            return index as u32;
        }
        let index = self.active_groups;
        if index < self.groups.len() {
            self.groups[index].reset(key);
        } else {
            self.groups.push(MeshGroup::new(key));
        }
        self.active_groups += 1;
        index as u32
    }

    pub(crate) fn group_mut(&mut self, index: u32) -> &mut MeshGroup {
        &mut self.groups[index as usize]
    }
}
