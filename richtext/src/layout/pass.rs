// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One layout pass at a fixed font size: pen advance and greedy line breaking.

use core::ops::Range;

use glyph_atlas::RenderMode;

use crate::layout::{CharItem, Element, FontInfo, Item, Specials};
use crate::line_break::LineBreakClassifier;
use crate::style::{StyleEnv, StyleState};
use crate::tags::{Attr, AttrKind, TagOp};
use crate::{BreakReason, Color, Extents, FontStyle, GenerationSettings, LineRecord};

const EPSILON: f32 = 0.001;
/// Extra advance of synthesized bold, in hundredths of an em.
const BOLD_SPACING: f32 = 7.0;
/// Size of superscript and subscript glyphs when the face does not say.
const DEFAULT_SCRIPT_SIZE: f32 = 0.58;

const TAB: u32 = 0x09;
const LINE_FEED: u32 = 0x0A;
const VERTICAL_TAB: u32 = 0x0B;
const LINE_SEPARATOR: u32 = 0x2028;
const PARAGRAPH_SEPARATOR: u32 = 0x2029;
const ZERO_WIDTH_SPACE: u32 = 0x200B;
pub(crate) const SOFT_HYPHEN: u32 = 0x00AD;
const HYPHEN_MINUS: u32 = 0x002D;
const HYPHEN: u32 = 0x2010;

/// Spaces that may hang past the end of a line.
fn is_breaking_space(unicode: u32) -> bool {
    matches!(unicode, 0x20 | 0x3000 | TAB | ZERO_WIDTH_SPACE)
}

/// Spaces stretched by justification and ignored at the end of a line.
pub(crate) fn is_space(unicode: u32) -> bool {
    matches!(unicode, 0x20 | 0xA0 | 0x3000 | TAB)
}

fn breaks_after(unicode: u32) -> bool {
    is_breaking_space(unicode) || matches!(unicode, SOFT_HYPHEN | HYPHEN_MINUS | HYPHEN)
}

fn ends_line(unicode: u32) -> bool {
    matches!(
        unicode,
        LINE_FEED | VERTICAL_TAB | LINE_SEPARATOR | PARAGRAPH_SEPARATOR
    )
}

/// A character placed by a pass. Positions are relative to the content box and
/// the line baseline; alignment and geometry turn them into final coordinates.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PlacedChar {
    pub(crate) item: usize,
    pub(crate) unicode: u32,
    pub(crate) element: Element,
    pub(crate) font: usize,
    pub(crate) source_index: u32,
    pub(crate) source_len: u32,
    pub(crate) pen_x: f32,
    pub(crate) advance: f32,
    /// Glyph box relative to the pen, y pointing up.
    pub(crate) left: f32,
    pub(crate) right: f32,
    pub(crate) top: f32,
    pub(crate) bottom: f32,
    /// Atlas padding in layout units.
    pub(crate) padding: f32,
    /// Raise above the baseline from `<voffset>`, `<sup>` and `<sub>`.
    pub(crate) y_shift: f32,
    pub(crate) ascent: f32,
    pub(crate) descent: f32,
    pub(crate) gap: f32,
    pub(crate) font_size: f32,
    pub(crate) scale: f32,
    pub(crate) color: Color,
    pub(crate) highlight: Color,
    pub(crate) flags: FontStyle,
    /// Horizontal shear of synthesized italics.
    pub(crate) shear: f32,
    pub(crate) rotate: f32,
    pub(crate) synthetic_bold: bool,
    pub(crate) link: Option<usize>,
    pub(crate) visible: bool,
    /// Cut by overflow handling.
    pub(crate) hidden: bool,
    pub(crate) line: u32,
}

impl PlacedChar {
    /// Counts toward line width.
    pub(crate) fn is_content(&self) -> bool {
        !is_space(self.unicode) && !matches!(self.element, Element::Control)
    }
}

/// Summary of the characters of one line.
pub(crate) struct LineStats {
    pub(crate) first_visible: Option<usize>,
    pub(crate) last_visible: Option<usize>,
    pub(crate) width: f32,
    pub(crate) num_spaces: usize,
}

impl LineStats {
    /// Measures `placed[range]`, ignoring characters cut by overflow handling.
    pub(crate) fn measure(placed: &[PlacedChar], range: Range<usize>, start_x: f32) -> Self {
        let start = range.start;
        let chars = &placed[range];
        let shown = |c: &PlacedChar| !c.hidden;
        let first_content = chars.iter().position(|c| shown(c) && c.is_content());
        let last_content = chars.iter().rposition(|c| shown(c) && c.is_content());
        let width = last_content.map_or(0.0, |last| {
            chars[last].pen_x + chars[last].advance - start_x
        });
        let num_spaces = match (first_content, last_content) {
            (Some(first), Some(last)) => chars[first..last]
                .iter()
                .filter(|c| is_space(c.unicode) && c.unicode != TAB)
                .count(),
            _ => 0,
        };
        Self {
            first_visible: chars
                .iter()
                .position(|c| c.visible && shown(c))
                .map(|i| start + i),
            last_visible: chars
                .iter()
                .rposition(|c| c.visible && shown(c))
                .map(|i| start + i),
            width,
            num_spaces,
        }
    }
}

/// Everything a pass reads.
pub(crate) struct PassInput<'a> {
    pub(crate) items: &'a [Item],
    pub(crate) fonts: &'a [FontInfo],
    pub(crate) specials: &'a Specials,
    pub(crate) settings: &'a GenerationSettings,
    pub(crate) classifier: &'a dyn LineBreakClassifier,
    pub(crate) content_width: f32,
}

/// Lines and characters produced by a pass.
#[derive(Debug, Default)]
pub(crate) struct PassOutput {
    pub(crate) placed: Vec<PlacedChar>,
    pub(crate) lines: Vec<LineRecord>,
    pub(crate) emergency_breaks: usize,
    pub(crate) font_size: f32,
}

impl PassOutput {
    pub(crate) fn clear(&mut self) {
        self.placed.clear();
        self.lines.clear();
        self.emergency_breaks = 0;
        self.font_size = 0.0;
    }

    /// Distance from the top of the first line box to the bottom of the last.
    pub(crate) fn block_height(&self) -> f32 {
        self.lines
            .last()
            .map_or(0.0, |line| line.baseline + line.descent)
    }

    /// Whether the pass fits a content box of the given height. Lines only have
    /// to fit horizontally when wrapping is off, since wrapping guarantees it
    /// except for emergency breaks.
    pub(crate) fn fits(&self, content_height: f32, word_wrap: bool) -> bool {
        if self.block_height() > content_height + EPSILON || self.emergency_breaks > 0 {
            return false;
        }
        word_wrap
            || self
                .lines
                .iter()
                .all(|line| line.width <= line.max_width + EPSILON)
    }
}

#[derive(Clone, Copy, Debug)]
struct LineState {
    start_char: usize,
    start_x: f32,
    limit: f32,
    ascent: f32,
    descent: f32,
    gap: f32,
    has_metrics: bool,
    paragraph_start: bool,
}

impl LineState {
    fn new(start_char: usize, style: &StyleState, content_width: f32, paragraph_start: bool) -> Self {
        let mut line = Self {
            start_char,
            start_x: 0.0,
            limit: 0.0,
            ascent: 0.0,
            descent: 0.0,
            gap: 0.0,
            has_metrics: false,
            paragraph_start,
        };
        line.update_bounds(style, content_width);
        line
    }

    /// Recomputes the start and end of the line from the margin, indent and
    /// width stacks.
    fn update_bounds(&mut self, style: &StyleState, content_width: f32) {
        let (left, right) = style.margins.current();
        let mut start = left + style.indent.current();
        if self.paragraph_start {
            start += style.line_indent.current();
        }
        let end = match style.width.current() {
            Some(width) => (left + width).min(content_width),
            None => content_width,
        };
        self.start_x = start;
        self.limit = end - right;
    }

    fn include(&mut self, placed: &PlacedChar) {
        if self.has_metrics {
            self.ascent = self.ascent.max(placed.ascent);
            self.descent = self.descent.max(placed.descent);
            self.gap = self.gap.max(placed.gap);
        } else {
            self.ascent = placed.ascent;
            self.descent = placed.descent;
            self.gap = placed.gap;
            self.has_metrics = true;
        }
    }
}

/// Resumable position of a pass. Cloned at every break opportunity so that an
/// overflowing line can be rewound to it.
#[derive(Clone, Debug)]
struct Cursor {
    item: usize,
    chars: usize,
    pen_x: f32,
    prev_unicode: u32,
    style: StyleState,
    line: LineState,
}

#[derive(Clone, Copy, Debug)]
struct PrevLine {
    baseline: f32,
    descent: f32,
    reason: BreakReason,
}

struct Breaker<'a, 'b> {
    input: &'b PassInput<'a>,
    env: StyleEnv,
    out: &'b mut PassOutput,
    prev_line: Option<PrevLine>,
}

/// Lays out `input` at `font_size` into `out`.
pub(crate) fn run(input: &PassInput<'_>, font_size: f32, out: &mut PassOutput) {
    out.clear();
    out.font_size = font_size;
    let primary = &input.fonts[0];
    let env = StyleEnv {
        font_size,
        content_width: input.content_width,
        line_height: primary.face.line_height * primary.em_scale(font_size),
    };
    let style = StyleState::new(input.settings, primary.id, &env);
    let line = LineState::new(0, &style, input.content_width, true);
    let mut cursor = Cursor {
        item: 0,
        chars: 0,
        pen_x: line.start_x,
        prev_unicode: 0,
        style,
        line,
    };
    let mut breaker = Breaker {
        input,
        env,
        out,
        prev_line: None,
    };
    breaker.run(&mut cursor);
}

impl Breaker<'_, '_> {
    fn run(&mut self, cursor: &mut Cursor) {
        let mut snapshot: Option<Cursor> = None;
        let wrap = self.input.settings.word_wrap;
        loop {
            let Some(item) = self.input.items.get(cursor.item) else {
                self.finish_line(cursor, BreakReason::None);
                return;
            };
            let ch = match item {
                Item::Tag(op) => {
                    self.apply_tag(cursor, op);
                    cursor.item += 1;
                    continue;
                }
                Item::Char(ch) => ch,
            };

            let line_has_chars = cursor.chars > cursor.line.start_char;
            if ends_line(ch.unicode) {
                let placed = self.measure(ch, cursor);
                self.push(cursor, placed);
                cursor.item += 1;
                self.finish_line(cursor, BreakReason::Newline);
                snapshot = None;
                continue;
            }

            if wrap
                && line_has_chars
                && cursor.style.nobr == 0
                && !is_breaking_space(ch.unicode)
                && !is_breaking_space(cursor.prev_unicode)
                && self
                    .input
                    .classifier
                    .can_break_before(ch.unicode, cursor.prev_unicode)
                && self.hyphen_fits(cursor)
            {
                snapshot = Some(cursor.clone());
            }

            let placed = self.measure(ch, cursor);
            let overflows = wrap
                && line_has_chars
                && !is_breaking_space(ch.unicode)
                && placed.pen_x + placed.advance > cursor.line.limit + EPSILON;
            if overflows {
                if let Some(rewind) = snapshot.take() {
                    *cursor = rewind;
                    self.out.placed.truncate(cursor.chars);
                    self.finish_line(cursor, BreakReason::Wrap);
                } else {
                    self.out.emergency_breaks += 1;
                    self.finish_line(cursor, BreakReason::Emergency);
                }
                continue;
            }

            self.push(cursor, placed);
            cursor.item += 1;
            if wrap
                && cursor.style.nobr == 0
                && breaks_after(ch.unicode)
                && self.hyphen_fits(cursor)
            {
                snapshot = Some(cursor.clone());
            }
        }
    }

    fn apply_tag(&self, cursor: &mut Cursor, op: &TagOp) {
        let size = cursor.style.size.current();
        match op {
            TagOp::Pos(length) => {
                cursor.pen_x = cursor.line.start_x + length.resolve(size, self.env.content_width);
            }
            TagOp::Space(length) => {
                cursor.pen_x += length.resolve(size, self.env.content_width);
            }
            _ => {}
        }
        cursor.style.apply(op, &self.env, cursor.item);
        let moves_line_start = match op {
            TagOp::Push(attr) => matches!(
                attr,
                Attr::Margin { .. } | Attr::Indent(_) | Attr::LineIndent(_) | Attr::Width(_)
            ),
            TagOp::Pop(kind) => matches!(
                kind,
                AttrKind::Margin | AttrKind::Indent | AttrKind::LineIndent | AttrKind::Width
            ),
            _ => false,
        };
        if moves_line_start {
            let at_line_start = cursor.chars == cursor.line.start_char;
            let old_start = cursor.line.start_x;
            cursor
                .line
                .update_bounds(&cursor.style, self.env.content_width);
            if at_line_start {
                cursor.pen_x += cursor.line.start_x - old_start;
            } else {
                cursor.line.start_x = old_start;
            }
        }
    }

    fn push(&mut self, cursor: &mut Cursor, placed: PlacedChar) {
        cursor.line.include(&placed);
        cursor.pen_x = placed.pen_x + placed.advance;
        cursor.prev_unicode = placed.unicode;
        cursor.chars += 1;
        self.out.placed.push(placed);
    }

    /// Places `ch` at the cursor without advancing it.
    fn measure(&self, ch: &CharItem, cursor: &Cursor) -> PlacedChar {
        let style = &cursor.style;
        let settings = self.input.settings;
        let info = &self.input.fonts[ch.font];
        let size = style.size.current();
        let flags = style.flags();

        let mut font_size = size * ch.case_scale;
        let mut y_shift = style.voffset.current();
        let base_em = info.em_scale(size);
        if flags.contains(FontStyle::SUPERSCRIPT) {
            y_shift += info.face.superscript_offset * base_em;
            font_size *= script_size(info.face.superscript_size);
        } else if flags.contains(FontStyle::SUBSCRIPT) {
            y_shift += info.face.subscript_offset * base_em;
            font_size *= script_size(info.face.subscript_size);
        }
        let em = info.em_scale(font_size);

        let mut placed = PlacedChar {
            item: cursor.item,
            unicode: ch.unicode,
            element: ch.element,
            font: ch.font,
            source_index: ch.source_index,
            source_len: ch.source_len,
            pen_x: cursor.pen_x,
            advance: 0.0,
            left: 0.0,
            right: 0.0,
            top: 0.0,
            bottom: 0.0,
            padding: 0.0,
            y_shift,
            ascent: info.face.ascent_line * em + y_shift,
            descent: -info.face.descent_line * em - y_shift,
            gap: info.face.line_gap().max(0.0) * em,
            font_size,
            scale: em,
            color: style.effective_color(),
            highlight: style.highlight.current(),
            flags,
            shear: 0.0,
            rotate: style.rotate.current(),
            synthetic_bold: ch.synthetic_bold,
            link: style.link.current(),
            visible: false,
            hidden: false,
            line: 0,
        };
        if ch.synthetic_italic {
            placed.shear = style.italic_angle.current().to_radians().tan();
        }

        let (metrics, scale) = match ch.element {
            Element::Glyph { glyph, scale } => {
                if info.render_mode == RenderMode::Sdf || settings.extra_padding {
                    placed.padding = info.padding as f32 * em * scale;
                }
                (Some(glyph.metrics), em * scale)
            }
            Element::Sprite {
                metrics, scale, ..
            } => (Some(metrics), font_size * scale),
            Element::Placeholder | Element::Control => (None, em),
        };
        placed.scale = scale;
        if let Some(metrics) = metrics {
            placed.left = metrics.bearing_x * scale;
            placed.right = placed.left + metrics.width * scale;
            placed.top = metrics.bearing_y * scale;
            placed.bottom = placed.top - metrics.height * scale;
            placed.advance = (metrics.advance + ch.kern) * scale;
            placed.visible = metrics.width > 0.0 && metrics.height > 0.0;
            if matches!(ch.element, Element::Sprite { .. }) {
                placed.ascent = placed.ascent.max(placed.top + y_shift);
            }
        }

        if ch.unicode == TAB {
            let stop = info.face.tab_width * f32::from(info.tab_multiple) * em;
            let stop = if stop > 0.0 { stop } else { size };
            let offset = cursor.pen_x - cursor.line.start_x;
            placed.advance = ((offset / stop).floor() + 1.0) * stop - offset;
            return placed;
        }
        if matches!(ch.element, Element::Control) {
            return placed;
        }

        let mspace = style.mspace.current();
        if mspace > 0.0 {
            let shift = (mspace - placed.advance) * 0.5;
            placed.left += shift;
            placed.right += shift;
            placed.advance = mspace;
        }
        placed.advance += style.cspace.current() + settings.character_spacing * size / 100.0;
        if is_space(ch.unicode) {
            placed.advance += settings.word_spacing * size / 100.0;
        }
        if ch.synthetic_bold {
            placed.advance += BOLD_SPACING * size / 100.0;
        }
        placed
    }

    fn finish_line(&mut self, cursor: &mut Cursor, reason: BreakReason) {
        let start = cursor.line.start_char;
        let end = cursor.chars;
        if reason == BreakReason::Wrap && end > start {
            self.hyphenate(cursor, end - 1);
        }

        let settings = self.input.settings;
        let line_state = cursor.line;
        let (ascent, descent, gap) = if line_state.has_metrics {
            (line_state.ascent, line_state.descent, line_state.gap)
        } else {
            let info = &self.input.fonts[0];
            let em = info.em_scale(cursor.style.size.current());
            (
                info.face.ascent_line * em,
                -info.face.descent_line * em,
                info.face.line_gap().max(0.0) * em,
            )
        };
        let baseline = match self.prev_line {
            None => ascent,
            Some(prev) => match cursor.style.line_height.current() {
                Some(line_height) => prev.baseline + line_height,
                None => {
                    let mut spacing = settings.line_spacing * self.env.font_size / 100.0;
                    if prev.reason == BreakReason::Newline {
                        spacing += settings.paragraph_spacing * self.env.font_size / 100.0;
                    }
                    prev.baseline + prev.descent + ascent + gap + spacing
                }
            },
        };

        #[expect(
            clippy::cast_possible_truncation,
            reason = "a layout never holds u32::MAX lines"
        )]
        let index = self.out.lines.len() as u32;
        for c in &mut self.out.placed[start..end] {
            c.line = index;
        }
        let stats = LineStats::measure(&self.out.placed, start..end, line_state.start_x);

        self.out.lines.push(LineRecord {
            chars: start..end,
            first_visible: stats.first_visible,
            last_visible: stats.last_visible,
            ascent,
            descent,
            baseline,
            width: stats.width,
            offset: line_state.start_x,
            max_width: line_state.limit - line_state.start_x,
            extents: Extents::default(),
            alignment: cursor.style.align.current(),
            break_reason: reason,
            num_spaces: stats.num_spaces,
        });
        self.prev_line = Some(PrevLine {
            baseline,
            descent,
            reason,
        });
        cursor.line = LineState::new(
            end,
            &cursor.style,
            self.env.content_width,
            reason == BreakReason::Newline,
        );
        cursor.pen_x = cursor.line.start_x;
        cursor.prev_unicode = 0;
    }

    /// Whether the line may break at `cursor`. Breaking after a soft hyphen
    /// shows a hyphen, which has to fit the line as well.
    fn hyphen_fits(&self, cursor: &Cursor) -> bool {
        if cursor.chars == cursor.line.start_char {
            return true;
        }
        match self.hyphen_at(cursor, cursor.chars - 1) {
            Some(hyphen) => hyphen.pen_x + hyphen.advance <= cursor.line.limit + EPSILON,
            None => true,
        }
    }

    /// Renders a soft hyphen the line broke at as a real hyphen.
    fn hyphenate(&mut self, cursor: &Cursor, index: usize) {
        if let Some(placed) = self.hyphen_at(cursor, index) {
            self.out.placed[index] = placed;
        }
    }

    /// The hyphen that replaces the placed soft hyphen at `index`, if it is one.
    fn hyphen_at(&self, cursor: &Cursor, index: usize) -> Option<PlacedChar> {
        let shy = self.out.placed.get(index)?;
        if shy.unicode != SOFT_HYPHEN {
            return None;
        }
        let (font, element) = self.input.specials.hyphen?;
        let Some(Item::Char(item)) = self.input.items.get(shy.item) else {
            return None;
        };
        let hyphen = CharItem {
            unicode: HYPHEN_MINUS,
            font,
            element,
            kern: 0.0,
            ..*item
        };
        let at = Cursor {
            item: shy.item,
            pen_x: shy.pen_x,
            ..cursor.clone()
        };
        let mut placed = self.measure(&hyphen, &at);
        placed.line = shy.line;
        Some(placed)
    }
}

fn script_size(size: f32) -> f32 {
    if size > 0.0 {
        size
    } else {
        DEFAULT_SCRIPT_SIZE
    }
}
