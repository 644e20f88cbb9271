// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Truncation and ellipsis insertion for text that does not fit its container.

use glyph_atlas::RenderMode;

use super::pass::{LineStats, PassInput, PassOutput, PlacedChar};
use super::{Element, FontInfo};
use crate::{GenerationSettings, OverflowMode};

const EPSILON: f32 = 0.001;
const ELLIPSIS: u32 = 0x2026;

/// Where the text is cut: the last line kept and the first character hidden.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Cut {
    line: usize,
    char: usize,
}

fn find_cut(pass: &PassOutput, content_height: f32, word_wrap: bool) -> Option<Cut> {
    let vertical = pass
        .lines
        .iter()
        .position(|line| line.baseline + line.descent > content_height + EPSILON)
        .map(|index| {
            let char = pass.lines[index].chars.start;
            Cut {
                line: index.saturating_sub(1),
                char,
            }
        });
    if word_wrap {
        return vertical;
    }
    let horizontal = pass.lines.iter().enumerate().find_map(|(index, line)| {
        let limit = line.offset + line.max_width + EPSILON;
        pass.placed[line.chars.clone()]
            .iter()
            .position(|c| c.is_content() && c.pen_x + c.advance > limit)
            .map(|offset| Cut {
                line: index,
                char: line.chars.start + offset,
            })
    });
    match (vertical, horizontal) {
        (Some(v), Some(h)) => Some(if h.char < v.char { h } else { v }),
        (v, h) => v.or(h),
    }
}

/// Applies the overflow mode of `input`, returning whether anything was hidden.
pub(crate) fn apply(input: &PassInput<'_>, pass: &mut PassOutput, content_height: f32) -> bool {
    let settings = input.settings;
    if matches!(settings.overflow, OverflowMode::Overflow | OverflowMode::Masking) {
        return false;
    }
    let Some(mut cut) = find_cut(pass, content_height, settings.word_wrap) else {
        return false;
    };

    let line_start = pass.lines[cut.line].chars.start;
    if cut.char == line_start && cut.line == 0 {
        // Not even the first line fits.
        hide_from(pass, 0, 0);
        return true;
    }

    if settings.overflow == OverflowMode::Ellipsis {
        if let Some((font, element)) = input.specials.ellipsis {
            cut.char = insert_ellipsis(input, pass, cut, font, element);
            hide_from(pass, cut.line, cut.char + 1);
            return true;
        }
    }
    hide_from(pass, cut.line, cut.char);
    true
}

/// Hides every character from `first_hidden` on and folds them into line
/// `last_line`, dropping the lines after it.
fn hide_from(pass: &mut PassOutput, last_line: usize, first_hidden: usize) {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "line indices come from a u32 line count"
    )]
    let line_index = last_line as u32;
    for c in &mut pass.placed[first_hidden..] {
        c.hidden = true;
        c.line = line_index;
    }
    pass.lines.truncate(last_line + 1);
    let end = pass.placed.len();
    if let Some(line) = pass.lines.last_mut() {
        line.chars.end = end;
        let stats = LineStats::measure(&pass.placed, line.chars.clone(), line.offset);
        line.first_visible = stats.first_visible;
        line.last_visible = stats.last_visible;
        line.width = stats.width;
        line.num_spaces = stats.num_spaces;
    }
}

/// Inserts an ellipsis on line `cut.line`, backing off until it fits, and returns
/// its index.
fn insert_ellipsis(
    input: &PassInput<'_>,
    pass: &mut PassOutput,
    cut: Cut,
    font: usize,
    element: Element,
) -> usize {
    let line = &pass.lines[cut.line];
    let start = line.chars.start;
    let limit = line.offset + line.max_width + EPSILON;
    let mut at = cut.char;
    let ellipsis = loop {
        let template_index = at.checked_sub(1).filter(|&i| i >= start).unwrap_or(at);
        let template = pass
            .placed
            .get(template_index)
            .or_else(|| pass.placed.last())
            .copied();
        let pen_x = if at > start {
            let previous = &pass.placed[at - 1];
            previous.pen_x + previous.advance
        } else {
            line.offset
        };
        let ellipsis = match template {
            Some(template) => restyle(&template, font, element, &input.fonts[font], input.settings, pen_x),
            None => return at,
        };
        let trailing_space = at > start && !pass.placed[at - 1].is_content();
        if (pen_x + ellipsis.advance <= limit && !trailing_space) || at == start {
            break ellipsis;
        }
        at -= 1;
    };
    let mut ellipsis = ellipsis;
    ellipsis.source_index = pass
        .placed
        .get(at)
        .map_or(ellipsis.source_index + ellipsis.source_len, |c| c.source_index);
    ellipsis.source_len = 0;
    ellipsis.hidden = false;
    #[expect(
        clippy::cast_possible_truncation,
        reason = "line indices come from a u32 line count"
    )]
    let line_index = cut.line as u32;
    ellipsis.line = line_index;
    pass.placed.insert(at, ellipsis);
    at
}

/// Builds a character in place of `template` that renders `element` from `font`.
fn restyle(
    template: &PlacedChar,
    font: usize,
    element: Element,
    info: &FontInfo,
    settings: &GenerationSettings,
    pen_x: f32,
) -> PlacedChar {
    let em = info.em_scale(template.font_size);
    let mut placed = PlacedChar {
        unicode: ELLIPSIS,
        element,
        font,
        pen_x,
        ascent: info.face.ascent_line * em + template.y_shift,
        descent: -info.face.descent_line * em - template.y_shift,
        gap: info.face.line_gap().max(0.0) * em,
        visible: false,
        padding: 0.0,
        advance: 0.0,
        left: 0.0,
        right: 0.0,
        top: 0.0,
        bottom: 0.0,
        scale: em,
        synthetic_bold: false,
        shear: 0.0,
        ..*template
    };
    if let Element::Glyph { glyph, scale } = element {
        let scale = em * scale;
        let metrics = glyph.metrics;
        placed.scale = scale;
        placed.left = metrics.bearing_x * scale;
        placed.right = placed.left + metrics.width * scale;
        placed.top = metrics.bearing_y * scale;
        placed.bottom = placed.top - metrics.height * scale;
        placed.advance = metrics.advance * scale;
        placed.visible = metrics.width > 0.0 && metrics.height > 0.0;
        if info.render_mode == RenderMode::Sdf || settings.extra_padding {
            placed.padding = info.padding as f32 * scale;
        }
    }
    placed
}
