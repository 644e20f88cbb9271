// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layout engine: glyph resolution, line breaking, auto-sizing and mesh
//! generation.

mod align;
mod geometry;
mod overflow;
mod pass;
mod resolve;

use glyph_atlas::{AtlasRect, FaceInfo, FontGlyphStore, FontId, GlyphMetrics, GlyphRecord, RenderMode};
use markup::SourceChar;

use self::pass::{PassInput, PassOutput};
use crate::line_break::LineBreakClassifier;
use crate::tags::{SpriteRef, TagOp};
use crate::{AutoSize, Diagnostic, FontRegistry, GenerationError, GenerationSettings, LayoutResult};

/// Auto-sizing stops once the candidate range is narrower than this.
pub(crate) const AUTO_SIZE_EPSILON: f32 = 0.05;

/// Metrics of a font used by a layout, copied out of its store so that passes
/// run without holding its lock.
#[derive(Clone, Debug)]
pub(crate) struct FontInfo {
    pub(crate) id: FontId,
    pub(crate) face: FaceInfo,
    pub(crate) atlas_width: u32,
    pub(crate) atlas_height: u32,
    pub(crate) padding: u32,
    pub(crate) render_mode: RenderMode,
    pub(crate) tab_multiple: u8,
}

impl FontInfo {
    fn from_store(store: &FontGlyphStore) -> Option<Self> {
        let settings = store.settings();
        Some(Self {
            id: store.id(),
            face: store.face()?.clone(),
            atlas_width: settings.atlas_width,
            atlas_height: settings.atlas_height,
            padding: settings.padding,
            render_mode: settings.render_mode,
            tab_multiple: settings.tab_multiple,
        })
    }

    /// Scale from the face's sampled pixels to layout units at `font_size`.
    pub(crate) fn em_scale(&self, font_size: f32) -> f32 {
        if self.face.point_size <= 0.0 {
            return 0.0;
        }
        let face_scale = if self.face.scale > 0.0 {
            self.face.scale
        } else {
            1.0
        };
        font_size / self.face.point_size * face_scale
    }
}

/// What a character renders as.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Element {
    Glyph {
        glyph: GlyphRecord,
        /// Character scale times glyph scale.
        scale: f32,
    },
    Sprite {
        sprite: SpriteRef,
        rect: AtlasRect,
        metrics: GlyphMetrics,
        /// Sprite scale over the sheet's point size.
        scale: f32,
        texture: (u32, u32),
    },
    Placeholder,
    Control,
}

/// A resolved character of the item stream.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CharItem {
    pub(crate) unicode: u32,
    pub(crate) source_index: u32,
    pub(crate) source_len: u32,
    /// Index into the layout's font list.
    pub(crate) font: usize,
    pub(crate) element: Element,
    /// Size multiplier from `<smallcaps>`.
    pub(crate) case_scale: f32,
    /// Pair adjustment with the next character, in glyph units.
    pub(crate) kern: f32,
    pub(crate) synthetic_bold: bool,
    pub(crate) synthetic_italic: bool,
}

/// One entry of the item stream a pass walks.
#[derive(Clone, Debug)]
pub(crate) enum Item {
    Char(CharItem),
    Tag(TagOp),
}

/// Glyphs inserted by line breaking and overflow handling.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Specials {
    pub(crate) hyphen: Option<(usize, Element)>,
    pub(crate) ellipsis: Option<(usize, Element)>,
}

/// Working memory of the layout engine.
///
/// Every buffer is cleared rather than dropped between calls, so a context that
/// lays out text of similar length again does not allocate. One set of scratch
/// buffers serves one generation at a time; see
/// [`LayoutContextPool`](crate::LayoutContextPool) for one per thread.
#[derive(Debug, Default)]
pub struct ScratchBuffers {
    items: Vec<Item>,
    fonts: Vec<FontInfo>,
    specials: Specials,
    pass: PassOutput,
    missing: Vec<u32>,
    diagnostics: Vec<Diagnostic>,
    resolve: resolve::ResolveScratch,
}

impl ScratchBuffers {
    /// Creates empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties every buffer, keeping its capacity.
    pub fn reset(&mut self) {
        self.items.clear();
        self.fonts.clear();
        self.specials = Specials::default();
        self.pass.clear();
        self.missing.clear();
        self.diagnostics.clear();
        self.resolve.clear();
    }

    /// Makes room for a text of `chars` characters.
    pub fn ensure_capacity(&mut self, chars: usize) {
        let target = chars.next_power_of_two();
        reserve_to(&mut self.items, target);
        reserve_to(&mut self.pass.placed, target);
    }

    /// Number of characters the buffers hold without growing.
    pub fn capacity(&self) -> usize {
        self.items.capacity().min(self.pass.placed.capacity())
    }
}

fn reserve_to<T>(buffer: &mut Vec<T>, capacity: usize) {
    if buffer.capacity() < capacity {
        buffer.reserve(capacity - buffer.len());
    }
}

/// Lays out tokenized text into `out`.
///
/// `out` is only touched once the primary font has been validated, so on error
/// it still holds the previous layout.
pub(crate) fn generate(
    chars: &[SourceChar],
    scratch: &mut ScratchBuffers,
    classifier: &dyn LineBreakClassifier,
    registry: &FontRegistry,
    settings: &GenerationSettings,
    out: &mut LayoutResult,
) -> Result<(), GenerationError> {
    scratch.reset();
    scratch.ensure_capacity(chars.len());
    resolve::resolve(chars, registry, settings, scratch)?;

    let margins = settings.margins;
    let content_width = (settings.container_width - margins.left - margins.right).max(0.0);
    let content_height = (settings.container_height - margins.top - margins.bottom).max(0.0);
    let ScratchBuffers {
        items,
        fonts,
        specials,
        pass,
        missing,
        diagnostics,
        ..
    } = scratch;
    let input = PassInput {
        items: items.as_slice(),
        fonts: fonts.as_slice(),
        specials: &*specials,
        settings,
        classifier,
        content_width,
    };

    let font_size = match settings.auto_size {
        Some(range) => auto_size(&input, range, content_height, pass, diagnostics),
        None => {
            pass::run(&input, settings.font_size, pass);
            settings.font_size
        }
    };

    out.clear();
    out.font_size = font_size;
    out.missing.extend_from_slice(missing);
    out.diagnostics.extend_from_slice(diagnostics);
    out.truncated = overflow::apply(&input, pass, content_height);
    let needed_width = pass
        .lines
        .iter()
        .map(|line| line.offset + line.width)
        .fold(0.0_f32, f32::max);
    out.preferred_size = (
        needed_width + margins.left + margins.right,
        pass.block_height() + margins.top + margins.bottom,
    );
    let dy = align::apply(pass, settings, content_height);
    geometry::emit(&input, pass, dy, out);
    Ok(())
}

/// Searches `range` for the largest size at which the text fits, leaving the
/// pass for the chosen size in `pass`.
fn auto_size(
    input: &PassInput<'_>,
    range: AutoSize,
    content_height: f32,
    pass: &mut PassOutput,
    diagnostics: &mut Vec<Diagnostic>,
) -> f32 {
    let wrap = input.settings.word_wrap;
    let min = range.min.max(0.0);
    let max = range.max.max(min);
    pass::run(input, max, pass);
    if pass.fits(content_height, wrap) {
        return max;
    }

    let (mut lo, mut hi) = (min, max);
    let mut iterations = 0;
    while hi - lo >= AUTO_SIZE_EPSILON {
        if iterations == range.max_iterations {
            log::warn!(
                "auto-size stopped after {iterations} iterations, using size {lo}"
            );
            diagnostics.push(Diagnostic::AutoSizeNonConvergence {
                iterations,
                font_size: lo,
            });
            break;
        }
        iterations += 1;
        let candidate = (lo + hi) * 0.5;
        pass::run(input, candidate, pass);
        let fits = pass.fits(content_height, wrap);
        log::trace!("auto-size iteration {iterations}: size {candidate} fits={fits}");
        if fits {
            lo = candidate;
        } else {
            hi = candidate;
        }
    }
    if pass.font_size != lo {
        pass::run(input, lo, pass);
    }
    lo
}
