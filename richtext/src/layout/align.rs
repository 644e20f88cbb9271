// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::pass::{is_space, PassOutput};
use crate::{BreakReason, GenerationSettings, HorizontalAlignment, VerticalAlignment};

/// Aligns every line horizontally and returns the vertical offset of the block
/// within the content box.
pub(crate) fn apply(pass: &mut PassOutput, settings: &GenerationSettings, content_height: f32) -> f32 {
    let PassOutput { placed, lines, .. } = pass;
    for line in lines.iter_mut() {
        let free = line.max_width - line.width;
        let stretch = match line.alignment {
            HorizontalAlignment::Justified => line.break_reason == BreakReason::Wrap,
            HorizontalAlignment::Flush => true,
            _ => false,
        };
        if stretch && line.num_spaces > 0 && free > 0.0 {
            let extra = free / line.num_spaces as f32;
            let chars = &mut placed[line.chars.clone()];
            let first = chars.iter().position(|c| !c.hidden && c.is_content());
            let last = chars.iter().rposition(|c| !c.hidden && c.is_content());
            if let (Some(first), Some(last)) = (first, last) {
                let mut shift = 0.0;
                for c in &mut chars[first..=last] {
                    c.pen_x += shift;
                    if is_space(c.unicode) && c.unicode != 0x09 {
                        c.advance += extra;
                        shift += extra;
                    }
                }
                for c in &mut chars[last + 1..] {
                    c.pen_x += shift;
                }
                line.width += free;
            }
            continue;
        }
        let shift = match line.alignment {
            HorizontalAlignment::Center => free * 0.5,
            HorizontalAlignment::Right => free,
            _ => 0.0,
        };
        if shift != 0.0 {
            for c in &mut placed[line.chars.clone()] {
                c.pen_x += shift;
            }
            line.offset += shift;
        }
    }

    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return 0.0;
    };
    let block_height = last.baseline + last.descent;
    match settings.alignment.vertical {
        VerticalAlignment::Top => 0.0,
        VerticalAlignment::Middle => (content_height - block_height) * 0.5,
        VerticalAlignment::Bottom => content_height - block_height,
        VerticalAlignment::Baseline => content_height * 0.5 - first.baseline,
        VerticalAlignment::Midline => {
            let mut top = f32::INFINITY;
            let mut bottom = f32::NEG_INFINITY;
            for line in lines.iter() {
                for c in &placed[line.chars.clone()] {
                    if c.visible && !c.hidden {
                        top = top.min(line.baseline - (c.top + c.y_shift));
                        bottom = bottom.max(line.baseline - (c.bottom + c.y_shift));
                    }
                }
            }
            if top > bottom {
                (content_height - block_height) * 0.5
            } else {
                content_height * 0.5 - (top + bottom) * 0.5
            }
        }
    }
}
