// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Final coordinates, mesh quads, decorations and link runs.

use peniko::color::palette::css;
use peniko::color::LinearSrgb;

use super::pass::{PassInput, PassOutput, PlacedChar};
use super::{Element, Item};
use crate::tags::{Attr, TagOp};
use crate::{
    CharacterInfo, Color, Decoration, DecorationKind, ElementKind, Extents, FontStyle,
    GlyphVertex, LayoutResult, LineRecord, LinkInfo, MaterialKey,
};

#[expect(
    clippy::cast_possible_truncation,
    reason = "the value is clamped to the u8 range first"
)]
fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 8-bit vertex color, optionally converted to linear space first.
fn vertex_color(color: Color, linear: bool) -> [u8; 4] {
    let components = if linear {
        color.convert::<LinearSrgb>().components
    } else {
        color.components
    };
    components.map(quantize)
}

/// Writes the characters and lines of `pass` into `out`, offset by the margins
/// and by `dy` vertically.
pub(crate) fn emit(input: &PassInput<'_>, pass: &PassOutput, dy: f32, out: &mut LayoutResult) {
    let margins = input.settings.margins;
    let left = margins.left;
    let top = margins.top + dy;
    let mut bounds: Option<Extents> = None;

    for line in &pass.lines {
        let baseline = top + line.baseline;
        let mut extents: Option<Extents> = None;
        for c in &pass.placed[line.chars.clone()] {
            let x = left + c.pen_x;
            let glyph_box = Extents::new(
                x + c.left,
                baseline - (c.top + c.y_shift),
                x + c.right,
                baseline - (c.bottom + c.y_shift),
            );
            let visible = c.visible && !c.hidden;
            let material = if visible {
                extents = Some(extents.map_or(glyph_box, |e| e.union(&glyph_box)));
                push_quad(input, c, &glyph_box, baseline, out)
            } else {
                None
            };
            out.characters.push(CharacterInfo {
                element: element_kind(input, c),
                unicode: c.unicode,
                source_index: c.source_index,
                source_len: c.source_len,
                visible: material.is_some(),
                line: c.line,
                x,
                baseline,
                advance: c.advance,
                bounds: glyph_box,
                ascent: c.ascent,
                descent: c.descent,
                font_size: c.font_size,
                scale: c.scale,
                color: c.color,
                style: c.flags,
                material,
            });
        }
        let start = left + line.offset;
        let extents = extents.unwrap_or(Extents::new(
            start,
            baseline - line.ascent,
            start,
            baseline + line.descent,
        ));
        if line.first_visible.is_some() {
            bounds = Some(bounds.map_or(extents, |b| b.union(&extents)));
        }
        let mut record = line.clone();
        record.offset = start;
        record.baseline = baseline;
        record.extents = extents;
        out.lines.push(record);
    }
    out.bounds = bounds.unwrap_or(Extents::new(left, margins.top, left, margins.top));

    emit_decorations(input, pass, left, top, out);
    emit_links(input, pass, out);
}

fn element_kind(input: &PassInput<'_>, c: &PlacedChar) -> ElementKind {
    match c.element {
        Element::Glyph { glyph, .. } => ElementKind::Character {
            font: input.fonts[c.font].id,
            glyph_index: glyph.index,
        },
        Element::Sprite { sprite, .. } => ElementKind::Sprite {
            sheet: sprite.sheet,
            index: u32::try_from(sprite.index).unwrap_or(u32::MAX),
        },
        Element::Placeholder => ElementKind::Placeholder,
        Element::Control => ElementKind::Control,
    }
}

/// Writes the quad of a visible character and returns its mesh group.
fn push_quad(
    input: &PassInput<'_>,
    c: &PlacedChar,
    glyph_box: &Extents,
    baseline: f32,
    out: &mut LayoutResult,
) -> Option<u32> {
    let (key, uv, color) = match c.element {
        Element::Glyph { glyph, .. } => {
            let info = &input.fonts[c.font];
            let padding = if c.padding > 0.0 {
                info.padding as f32
            } else {
                0.0
            };
            let width = info.atlas_width.max(1) as f32;
            let height = info.atlas_height.max(1) as f32;
            let rect = glyph.rect;
            let uv = [
                (rect.x as f32 - padding) / width,
                (rect.y as f32 - padding) / height,
                ((rect.x + rect.width) as f32 + padding) / width,
                ((rect.y + rect.height) as f32 + padding) / height,
            ];
            let key = MaterialKey::Font {
                font: info.id,
                page: glyph.page,
            };
            (key, uv, c.color)
        }
        Element::Sprite {
            sprite,
            rect,
            texture,
            ..
        } => {
            let width = texture.0.max(1) as f32;
            let height = texture.1.max(1) as f32;
            let uv = [
                rect.x as f32 / width,
                rect.y as f32 / height,
                (rect.x + rect.width) as f32 / width,
                (rect.y + rect.height) as f32 / height,
            ];
            let color = match sprite.color {
                Some(color) => color,
                None if sprite.tint => c.color,
                None => css::WHITE.with_alpha(c.color.components[3]),
            };
            (MaterialKey::Sprite { sheet: sprite.sheet }, uv, color)
        }
        Element::Placeholder | Element::Control => return None,
    };

    let pad = c.padding;
    let (x0, y0, x1, y1) = (
        glyph_box.x0 - pad,
        glyph_box.y0 - pad,
        glyph_box.x1 + pad,
        glyph_box.y1 + pad,
    );
    // Bottom-left, top-left, top-right, bottom-right.
    let mut corners = [[x0, y1], [x0, y0], [x1, y0], [x1, y1]];
    if c.shear != 0.0 {
        let axis = baseline - c.y_shift;
        for corner in &mut corners {
            corner[0] += c.shear * (axis - corner[1]);
        }
    }
    if c.rotate != 0.0 {
        let (sin, cos) = c.rotate.to_radians().sin_cos();
        let (cx, cy) = ((x0 + x1) * 0.5, (y0 + y1) * 0.5);
        for corner in &mut corners {
            let (dx, dy) = (corner[0] - cx, corner[1] - cy);
            *corner = [cx + dx * cos + dy * sin, cy - dx * sin + dy * cos];
        }
    }
    let uvs = [[uv[0], uv[3]], [uv[0], uv[1]], [uv[2], uv[1]], [uv[2], uv[3]]];
    let color = vertex_color(color, input.settings.linear_color);
    let scale = if c.synthetic_bold { -c.scale } else { c.scale };
    let quad = [0, 1, 2, 3].map(|i| GlyphVertex {
        position: corners[i],
        uv: uvs[i],
        color,
        scale,
    });
    let group = out.group_for(key);
    out.group_mut(group).push_quad(quad);
    Some(group)
}

/// A run of characters sharing a decoration.
struct Run {
    x0: f32,
    x1: Option<f32>,
    color: Color,
    font: usize,
    font_size: f32,
}

fn emit_decorations(input: &PassInput<'_>, pass: &PassOutput, left: f32, top: f32, out: &mut LayoutResult) {
    const KINDS: [(DecorationKind, FontStyle); 3] = [
        (DecorationKind::Highlight, FontStyle::HIGHLIGHT),
        (DecorationKind::Underline, FontStyle::UNDERLINE),
        (DecorationKind::Strikethrough, FontStyle::STRIKETHROUGH),
    ];
    for (index, line) in pass.lines.iter().enumerate() {
        let line_index = u32::try_from(index).unwrap_or(u32::MAX);
        let baseline = top + line.baseline;
        for (kind, flag) in KINDS {
            let mut run: Option<Run> = None;
            for c in &pass.placed[line.chars.clone()] {
                let active = !c.hidden
                    && c.flags.contains(flag)
                    && !matches!(c.element, Element::Control);
                let color = if kind == DecorationKind::Highlight {
                    c.highlight
                } else {
                    c.color
                };
                let x = left + c.pen_x;
                if let Some(current) = run.as_mut().filter(|run| active && run.color == color) {
                    if c.is_content() {
                        current.x1 = Some(x + c.advance);
                        current.font_size = current.font_size.max(c.font_size);
                    }
                    continue;
                }
                if let Some(finished) = run.take() {
                    push_decoration(input, finished, kind, line_index, baseline, line, out);
                }
                if active {
                    run = Some(Run {
                        x0: x,
                        x1: c.is_content().then_some(x + c.advance),
                        color,
                        font: c.font,
                        font_size: c.font_size,
                    });
                }
            }
            if let Some(finished) = run {
                push_decoration(input, finished, kind, line_index, baseline, line, out);
            }
        }
    }
}

fn push_decoration(
    input: &PassInput<'_>,
    run: Run,
    kind: DecorationKind,
    line: u32,
    baseline: f32,
    record: &LineRecord,
    out: &mut LayoutResult,
) {
    let Some(x1) = run.x1 else {
        return;
    };
    let info = &input.fonts[run.font];
    let em = info.em_scale(run.font_size);
    let stroke = |offset: f32, thickness: f32| {
        let y = baseline - offset * em;
        let half = (thickness * em).max(1.0) * 0.5;
        Extents::new(run.x0, y - half, x1, y + half)
    };
    let rect = match kind {
        DecorationKind::Underline => {
            stroke(info.face.underline_offset, info.face.underline_thickness)
        }
        DecorationKind::Strikethrough => stroke(
            info.face.strikethrough_offset,
            info.face.strikethrough_thickness,
        ),
        DecorationKind::Highlight => Extents::new(
            run.x0,
            baseline - record.ascent,
            x1,
            baseline + record.descent,
        ),
    };
    out.decorations.push(Decoration {
        kind,
        line,
        rect,
        color: run.color,
    });
}

/// Groups consecutive characters of a line inside the same `<link>` tag.
fn emit_links(input: &PassInput<'_>, pass: &PassOutput, out: &mut LayoutResult) {
    let flush = |run: (usize, usize, usize), out: &mut LayoutResult| {
        let (item, first_char, char_count) = run;
        let id = match input.items.get(item) {
            Some(Item::Tag(TagOp::Push(Attr::Link(id)))) => id.clone(),
            _ => String::new(),
        };
        out.links.push(LinkInfo {
            id,
            first_char,
            char_count,
        });
    };
    for line in &pass.lines {
        let mut current: Option<(usize, usize, usize)> = None;
        for index in line.chars.clone() {
            let c = &pass.placed[index];
            let link = c.link.filter(|_| !c.hidden);
            match (current.as_mut(), link) {
                (Some((item, _, count)), Some(link)) if *item == link => *count += 1,
                (_, link) => {
                    if let Some(run) = current.take() {
                        flush(run, out);
                    }
                    current = link.map(|item| (item, index, 1));
                }
            }
        }
        if let Some(run) = current {
            flush(run, out);
        }
    }
}
