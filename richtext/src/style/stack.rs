// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use glyph_atlas::FontId;
use smallvec::SmallVec;

use super::StyleCounts;
use crate::tags::{Attr, AttrKind, TagOp};
use crate::{Color, FontStyle, FontWeight, GenerationSettings, HorizontalAlignment};

/// Slant used by `<i>` when no angle is given, in degrees.
pub(crate) const DEFAULT_ITALIC_ANGLE: f32 = 14.0;

/// A value with a base and the values pushed by open tags.
///
/// Popping an empty stack is a no-op, so stray closing tags are harmless.
#[derive(Clone, Debug)]
pub(crate) struct AttrStack<T> {
    base: T,
    stack: SmallVec<[T; 4]>,
}

impl<T: Copy> AttrStack<T> {
    pub(crate) fn new(base: T) -> Self {
        Self {
            base,
            stack: SmallVec::new(),
        }
    }

    pub(crate) fn current(&self) -> T {
        self.stack.last().copied().unwrap_or(self.base)
    }

    pub(crate) fn push(&mut self, value: T) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) {
        self.stack.pop();
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Sizes that relative tag values resolve against.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StyleEnv {
    /// Font size of the pass, which auto-sizing varies.
    pub(crate) font_size: f32,
    /// Width of the container inside its margins.
    pub(crate) content_width: f32,
    /// Natural line height of the primary font at `font_size`.
    pub(crate) line_height: f32,
}

/// Every attribute stack of one layout pass.
#[derive(Clone, Debug)]
pub(crate) struct StyleState {
    pub(crate) counts: StyleCounts,
    pub(crate) size: AttrStack<f32>,
    pub(crate) color: AttrStack<Color>,
    pub(crate) alpha: AttrStack<f32>,
    pub(crate) highlight: AttrStack<Color>,
    pub(crate) voffset: AttrStack<f32>,
    pub(crate) cspace: AttrStack<f32>,
    pub(crate) mspace: AttrStack<f32>,
    pub(crate) indent: AttrStack<f32>,
    pub(crate) line_indent: AttrStack<f32>,
    pub(crate) line_height: AttrStack<Option<f32>>,
    pub(crate) margins: AttrStack<(f32, f32)>,
    pub(crate) align: AttrStack<HorizontalAlignment>,
    pub(crate) weight: AttrStack<FontWeight>,
    pub(crate) font: AttrStack<FontId>,
    pub(crate) italic_angle: AttrStack<f32>,
    pub(crate) width: AttrStack<Option<f32>>,
    pub(crate) rotate: AttrStack<f32>,
    /// Item index of the open `<link>` tag.
    pub(crate) link: AttrStack<Option<usize>>,
    pub(crate) nobr: u32,
}

fn default_highlight() -> Color {
    Color::from_rgba8(0xFF, 0xFF, 0x00, 0x40)
}

impl StyleState {
    pub(crate) fn new(settings: &GenerationSettings, primary: FontId, env: &StyleEnv) -> Self {
        Self {
            counts: StyleCounts::from_flags(settings.font_style),
            size: AttrStack::new(env.font_size),
            color: AttrStack::new(settings.color),
            alpha: AttrStack::new(1.0),
            highlight: AttrStack::new(default_highlight()),
            voffset: AttrStack::new(0.0),
            cspace: AttrStack::new(0.0),
            mspace: AttrStack::new(0.0),
            indent: AttrStack::new(0.0),
            line_indent: AttrStack::new(0.0),
            line_height: AttrStack::new(None),
            margins: AttrStack::new((0.0, 0.0)),
            align: AttrStack::new(settings.alignment.horizontal),
            weight: AttrStack::new(settings.font_weight),
            font: AttrStack::new(primary),
            italic_angle: AttrStack::new(DEFAULT_ITALIC_ANGLE),
            width: AttrStack::new(None),
            rotate: AttrStack::new(0.0),
            link: AttrStack::new(None),
            nobr: 0,
        }
    }

    /// The flags currently in effect.
    pub(crate) fn flags(&self) -> FontStyle {
        self.counts.flags()
    }

    /// The weight requested for the next character, taking `<b>` into account.
    pub(crate) fn effective_weight(&self) -> FontWeight {
        let weight = self.weight.current();
        if self.counts.count(FontStyle::BOLD) > 0 {
            weight.max(FontWeight::BOLD)
        } else {
            weight
        }
    }

    /// The color for the next character, with the `<alpha>` override applied.
    pub(crate) fn effective_color(&self) -> Color {
        self.color.current().multiply_alpha(self.alpha.current())
    }

    /// Applies a tag. `item` is the position of the tag in the item stream.
    ///
    /// Tags that move the pen rather than change the style are ignored here.
    pub(crate) fn apply(&mut self, op: &TagOp, env: &StyleEnv, item: usize) {
        match op {
            TagOp::OpenFlags(flags) => self.counts.open(*flags),
            TagOp::CloseFlags(flags) => self.counts.close(*flags),
            TagOp::Italic { angle } => {
                self.counts.open(FontStyle::ITALIC);
                self.italic_angle
                    .push(angle.unwrap_or(DEFAULT_ITALIC_ANGLE));
            }
            TagOp::CloseItalic => {
                if self.counts.count(FontStyle::ITALIC) > 0 {
                    self.italic_angle.pop();
                }
                self.counts.close(FontStyle::ITALIC);
            }
            TagOp::Highlight(color) => {
                self.counts.open(FontStyle::HIGHLIGHT);
                self.highlight.push(color.unwrap_or_else(default_highlight));
            }
            TagOp::CloseHighlight => {
                if self.counts.count(FontStyle::HIGHLIGHT) > 0 {
                    self.highlight.pop();
                }
                self.counts.close(FontStyle::HIGHLIGHT);
            }
            TagOp::NoBreak(true) => self.nobr += 1,
            TagOp::NoBreak(false) => self.nobr = self.nobr.saturating_sub(1),
            TagOp::Push(attr) => self.push(attr, env, item),
            TagOp::Pop(kind) => self.pop(*kind),
            TagOp::Pos(_) | TagOp::Space(_) | TagOp::NoParse | TagOp::Sprite(_) => {}
        }
    }

    fn push(&mut self, attr: &Attr, env: &StyleEnv, item: usize) {
        let size = self.size.current();
        match attr {
            Attr::Size(length) => {
                let resolved = length.resolve(env.font_size, size);
                let value = if length.relative {
                    size + resolved
                } else {
                    resolved
                };
                self.size.push(value.max(0.0));
            }
            Attr::Color(color) => self.color.push(*color),
            Attr::Alpha(alpha) => self.alpha.push(*alpha),
            Attr::VOffset(length) => self.voffset.push(length.resolve(size, size)),
            Attr::CSpace(length) => self
                .cspace
                .push(length.resolve(size, env.content_width)),
            Attr::MSpace(length) => self
                .mspace
                .push(length.resolve(size, env.content_width)),
            Attr::Indent(length) => self
                .indent
                .push(length.resolve(size, env.content_width)),
            Attr::LineIndent(length) => self
                .line_indent
                .push(length.resolve(size, env.content_width)),
            Attr::LineHeight(length) => self
                .line_height
                .push(Some(length.resolve(size, env.line_height))),
            Attr::Margin { left, right } => {
                let (current_left, current_right) = self.margins.current();
                let resolve = |length: &Option<crate::tags::Length>, current| {
                    length.map_or(current, |length| length.resolve(size, env.content_width))
                };
                self.margins
                    .push((resolve(left, current_left), resolve(right, current_right)));
            }
            Attr::Align(align) => self.align.push(*align),
            Attr::Weight(weight) => self.weight.push(*weight),
            Attr::Font(font) => {
                let font = font.unwrap_or(self.font.base);
                self.font.push(font);
            }
            Attr::Width(length) => self
                .width
                .push(Some(length.resolve(size, env.content_width))),
            Attr::Rotate(degrees) => self.rotate.push(*degrees),
            Attr::Link(_) => self.link.push(Some(item)),
        }
    }

    fn pop(&mut self, kind: AttrKind) {
        match kind {
            AttrKind::Size => self.size.pop(),
            AttrKind::Color => self.color.pop(),
            AttrKind::Alpha => self.alpha.pop(),
            AttrKind::VOffset => self.voffset.pop(),
            AttrKind::CSpace => self.cspace.pop(),
            AttrKind::MSpace => self.mspace.pop(),
            AttrKind::Indent => self.indent.pop(),
            AttrKind::LineIndent => self.line_indent.pop(),
            AttrKind::LineHeight => self.line_height.pop(),
            AttrKind::Margin => self.margins.pop(),
            AttrKind::Align => self.align.pop(),
            AttrKind::Weight => self.weight.pop(),
            AttrKind::Font => self.font.pop(),
            AttrKind::Width => self.width.pop(),
            AttrKind::Rotate => self.rotate.pop(),
            AttrKind::Link => self.link.pop(),
        }
    }
}
