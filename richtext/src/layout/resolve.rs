// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Turns the tokenized text into an item stream: tags are interpreted, and every
//! character is resolved to a glyph, a sprite or a placeholder.

use glyph_atlas::{EnsureStatus, FontGlyphStore, FontId, PopulationMode};
use hashbrown::{HashMap, HashSet};
use markup::{parse_tag, tag_hash, SourceChar};

use super::{CharItem, Element, FontInfo, Item, ScratchBuffers, Specials};
use crate::style::{StyleEnv, StyleState};
use crate::tags::{interpret, SpriteRef, TagOp};
use crate::{
    Diagnostic, FontRegistry, FontStyle, FontWeight, GenerationError, GenerationSettings,
};

const NOPARSE: u32 = tag_hash("noparse");
const LESS_THAN: u32 = '<' as u32;
const HYPHEN_MINUS: u32 = 0x2D;
const ELLIPSIS: u32 = 0x2026;
/// Stand-in code point of sprites that do not name one.
const OBJECT_REPLACEMENT: u32 = 0xFFFC;
/// Size of lowercase letters under `<smallcaps>`.
const SMALLCAPS_SCALE: f32 = 0.8;

/// Code points laid out without a glyph.
fn is_control(unicode: u32) -> bool {
    matches!(
        unicode,
        0x00..=0x1F | 0x7F | 0xAD | 0x200B | 0x200D | 0x2028 | 0x2029 | 0x2060 | 0xFEFF
    )
}

fn single_char_map<I: Iterator<Item = char>>(unicode: u32, map: impl FnOnce(char) -> I) -> u32 {
    let Some(c) = char::from_u32(unicode) else {
        return unicode;
    };
    let mut mapped = map(c);
    match (mapped.next(), mapped.next()) {
        (Some(single), None) => single as u32,
        _ => unicode,
    }
}

fn to_upper(unicode: u32) -> u32 {
    single_char_map(unicode, char::to_uppercase)
}

fn to_lower(unicode: u32) -> u32 {
    single_char_map(unicode, char::to_lowercase)
}

/// Lookup tables reused between calls.
#[derive(Debug, Default)]
pub(crate) struct ResolveScratch {
    /// Characters waiting for a glyph: item index and requested font.
    pending: Vec<(usize, FontId)>,
    /// Resolved elements by requested font and code point.
    resolved: HashMap<(FontId, u32), (usize, Element)>,
    requests: Vec<u32>,
    seen: HashSet<u32>,
    missing: HashSet<u32>,
}

impl ResolveScratch {
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.resolved.clear();
        self.requests.clear();
        self.seen.clear();
        self.missing.clear();
    }
}

/// Returns the slot of `store`'s font in `fonts`, adding it if needed.
fn slot_of(fonts: &mut Vec<FontInfo>, store: &FontGlyphStore) -> Option<usize> {
    if let Some(slot) = fonts.iter().position(|font| font.id == store.id()) {
        return Some(slot);
    }
    fonts.push(FontInfo::from_store(store)?);
    Some(fonts.len() - 1)
}

/// Returns the slot of font `id`, or the primary font if it cannot be used.
fn slot_for(registry: &FontRegistry, fonts: &mut Vec<FontInfo>, id: FontId) -> usize {
    if let Some(slot) = fonts.iter().position(|font| font.id == id) {
        return slot;
    }
    registry
        .lock(id)
        .and_then(|store| slot_of(fonts, &store))
        .unwrap_or(0)
}

/// Picks the face for a weight and slant, falling back to synthesis when no
/// variant is registered.
fn select_font(
    registry: &FontRegistry,
    base: FontId,
    weight: FontWeight,
    italic: bool,
) -> (FontId, bool, bool) {
    let bold = weight >= FontWeight::BOLD;
    if weight == FontWeight::NORMAL && !italic {
        return (base, false, false);
    }
    if let Some(variant) = registry.variant(base, weight, italic) {
        return (variant, false, false);
    }
    if italic && weight != FontWeight::NORMAL {
        if let Some(variant) = registry.variant(base, weight, false) {
            return (variant, false, true);
        }
        if let Some(variant) = registry.variant(base, FontWeight::NORMAL, true) {
            return (variant, bold, false);
        }
    }
    (base, bold, italic)
}

/// Builds the item stream, the font list and the special glyphs.
pub(crate) fn resolve(
    chars: &[SourceChar],
    registry: &FontRegistry,
    settings: &GenerationSettings,
    scratch: &mut ScratchBuffers,
) -> Result<(), GenerationError> {
    let Some(primary) = settings.font else {
        log::warn!("layout requested without a font");
        return Err(GenerationError::NoFont);
    };
    let Some(store) = registry.lock(primary) else {
        log::warn!("layout requested with unregistered font {}", primary.to_u32());
        return Err(GenerationError::UnknownFont(primary));
    };
    let Some(info) = FontInfo::from_store(&store) else {
        log::warn!("font {} has no loaded face", primary.to_u32());
        return Err(GenerationError::FontNotReady(primary));
    };
    drop(store);
    scratch.fonts.push(info);

    build_items(chars, registry, settings, primary, scratch);
    resolve_glyphs(registry, settings, scratch);
    if settings.kerning {
        apply_kerning(registry, &scratch.fonts, &mut scratch.items);
    }
    scratch.specials = Specials {
        hyphen: resolve_special(registry, settings, scratch, primary, HYPHEN_MINUS),
        ellipsis: resolve_special(registry, settings, scratch, primary, ELLIPSIS),
    };
    Ok(())
}

fn build_items(
    chars: &[SourceChar],
    registry: &FontRegistry,
    settings: &GenerationSettings,
    primary: FontId,
    scratch: &mut ScratchBuffers,
) {
    let env = StyleEnv {
        font_size: settings.font_size,
        content_width: settings.container_width,
        line_height: settings.font_size,
    };
    let mut style = StyleState::new(settings, primary, &env);
    let mut noparse = false;
    let mut index = 0;
    while index < chars.len() {
        let c = chars[index];
        if settings.rich_text && c.unicode == LESS_THAN {
            if let Some(tag) = parse_tag(chars, index) {
                let op = if noparse {
                    (tag.is_closing && tag.name_hash == NOPARSE).then_some(TagOp::NoParse)
                } else {
                    interpret(&tag, registry)
                };
                if let Some(op) = op {
                    let span = &chars[index..index + tag.len];
                    index += tag.len;
                    match op {
                        TagOp::NoParse => noparse = !noparse,
                        TagOp::Sprite(sprite) => {
                            let source_len = span.iter().map(|c| c.source_len).sum();
                            push_sprite(
                                registry,
                                &style,
                                sprite,
                                c.source_index,
                                source_len,
                                scratch,
                            );
                        }
                        op => {
                            style.apply(&op, &env, scratch.items.len());
                            scratch.items.push(Item::Tag(op));
                        }
                    }
                    continue;
                }
            }
        }
        push_char(registry, &style, c, scratch);
        index += 1;
    }
}

fn push_sprite(
    registry: &FontRegistry,
    style: &StyleState,
    sprite: SpriteRef,
    source_index: u32,
    source_len: u32,
    scratch: &mut ScratchBuffers,
) {
    let Some(element) = sprite_element(registry, sprite) else {
        return;
    };
    let unicode = registry
        .sprite_sheet(sprite.sheet)
        .and_then(|sheet| sheet.sprite(sprite.index))
        .and_then(|sprite| sprite.unicode)
        .unwrap_or(OBJECT_REPLACEMENT);
    let font = slot_for(registry, &mut scratch.fonts, style.font.current());
    scratch.items.push(Item::Char(CharItem {
        unicode,
        source_index,
        source_len,
        font,
        element,
        case_scale: 1.0,
        kern: 0.0,
        synthetic_bold: false,
        synthetic_italic: false,
    }));
}

fn sprite_element(registry: &FontRegistry, sprite: SpriteRef) -> Option<Element> {
    let sheet = registry.sprite_sheet(sprite.sheet)?;
    let image = sheet.sprite(sprite.index)?;
    let point_size = sheet.point_size();
    let sheet_scale = if point_size > 0.0 { 1.0 / point_size } else { 0.0 };
    Some(Element::Sprite {
        sprite,
        rect: image.rect,
        metrics: image.metrics,
        scale: image.scale * sheet_scale,
        texture: (sheet.texture_width(), sheet.texture_height()),
    })
}

fn push_char(
    registry: &FontRegistry,
    style: &StyleState,
    c: SourceChar,
    scratch: &mut ScratchBuffers,
) {
    let flags = style.flags();
    let mut unicode = c.unicode;
    let mut case_scale = 1.0;
    if flags.contains(FontStyle::UPPERCASE) {
        unicode = to_upper(unicode);
    } else if flags.contains(FontStyle::LOWERCASE) {
        unicode = to_lower(unicode);
    } else if flags.contains(FontStyle::SMALLCAPS) {
        let upper = to_upper(unicode);
        if upper != unicode {
            unicode = upper;
            case_scale = SMALLCAPS_SCALE;
        }
    }

    let (font, synthetic_bold, synthetic_italic) = select_font(
        registry,
        style.font.current(),
        style.effective_weight(),
        flags.contains(FontStyle::ITALIC),
    );
    let slot = slot_for(registry, &mut scratch.fonts, font);
    let control = is_control(unicode);
    if !control {
        scratch.resolve.pending.push((scratch.items.len(), font));
    }
    scratch.items.push(Item::Char(CharItem {
        unicode,
        source_index: c.source_index,
        source_len: c.source_len,
        font: slot,
        element: if control {
            Element::Control
        } else {
            Element::Placeholder
        },
        case_scale,
        kern: 0.0,
        synthetic_bold,
        synthetic_italic,
    }));
}

/// Resolves `unicodes` in `font` and its fallbacks, recording the results in
/// `resolved`. Code points no font has are left out.
fn resolve_in_chain(
    registry: &FontRegistry,
    settings: &GenerationSettings,
    fonts: &mut Vec<FontInfo>,
    resolved: &mut HashMap<(FontId, u32), (usize, Element)>,
    diagnostics: &mut Vec<Diagnostic>,
    font: FontId,
    unicodes: &mut Vec<u32>,
) {
    for candidate in registry.fallback_chain(font) {
        if unicodes.is_empty() {
            return;
        }
        let Some(mut store) = registry.lock(candidate) else {
            continue;
        };
        if !store.is_ready() {
            continue;
        }
        let absent: Vec<u32> = unicodes
            .iter()
            .copied()
            .filter(|unicode| store.character(*unicode).is_none())
            .collect();
        if !absent.is_empty() && store.settings().population_mode == PopulationMode::Dynamic {
            let outcome = store.ensure_characters(&absent, settings.kerning);
            if outcome.status == EnsureStatus::Partial {
                let exhausted: Vec<u32> = outcome
                    .missing
                    .iter()
                    .copied()
                    .filter(|unicode| !store.is_missing_from_source(*unicode))
                    .collect();
                if !exhausted.is_empty() {
                    log::warn!(
                        "font {}: atlas full, {} characters could not be added",
                        candidate.to_u32(),
                        exhausted.len()
                    );
                    diagnostics.push(Diagnostic::AtlasExhausted {
                        font: candidate,
                        code_points: exhausted,
                    });
                }
            }
        }
        let Some(slot) = slot_of(fonts, &store) else {
            continue;
        };
        unicodes.retain(|&unicode| match store.resolve(unicode) {
            Some((character, glyph)) => {
                let element = Element::Glyph {
                    glyph: *glyph,
                    scale: character.scale * glyph.scale,
                };
                resolved.insert((font, unicode), (slot, element));
                false
            }
            None => true,
        });
    }
}

fn resolve_glyphs(registry: &FontRegistry, settings: &GenerationSettings, scratch: &mut ScratchBuffers) {
    let ScratchBuffers {
        items,
        fonts,
        missing,
        diagnostics,
        resolve,
        ..
    } = scratch;
    let ResolveScratch {
        pending,
        resolved,
        requests,
        seen,
        missing: missing_seen,
    } = resolve;

    let mut fonts_done: Vec<FontId> = Vec::new();
    for &(_, font) in pending.iter() {
        if fonts_done.contains(&font) {
            continue;
        }
        fonts_done.push(font);
        requests.clear();
        seen.clear();
        for &(item, requested) in pending.iter() {
            if requested != font {
                continue;
            }
            if let Item::Char(ch) = &items[item] {
                if seen.insert(ch.unicode) {
                    requests.push(ch.unicode);
                }
            }
        }
        resolve_in_chain(registry, settings, fonts, resolved, diagnostics, font, requests);
    }

    let default_sheet = registry.default_sprite_sheet();
    for &(item, font) in pending.iter() {
        let Item::Char(ch) = &mut items[item] else {
            continue;
        };
        if let Some(&(slot, element)) = resolved.get(&(font, ch.unicode)) {
            ch.font = slot;
            ch.element = element;
            continue;
        }
        let sprite = default_sheet.and_then(|sheet| {
            let index = registry.sprite_sheet(sheet)?.index_by_unicode(ch.unicode)?;
            sprite_element(
                registry,
                SpriteRef {
                    sheet,
                    index,
                    tint: false,
                    color: None,
                },
            )
        });
        match sprite {
            Some(element) => ch.element = element,
            None => {
                if missing_seen.insert(ch.unicode) {
                    missing.push(ch.unicode);
                }
            }
        }
    }
}

/// Adds pair adjustments between consecutive glyphs of the same font.
fn apply_kerning(registry: &FontRegistry, fonts: &[FontInfo], items: &mut [Item]) {
    for (slot, info) in fonts.iter().enumerate() {
        let Some(store) = registry.lock(info.id) else {
            continue;
        };
        if store.pair_adjustments().is_empty() {
            continue;
        }
        let mut previous: Option<(&mut CharItem, u32)> = None;
        for item in items.iter_mut() {
            let Item::Char(ch) = item else {
                continue;
            };
            let glyph = match ch.element {
                Element::Glyph { glyph, .. } if ch.font == slot => glyph.index,
                _ => {
                    previous = None;
                    continue;
                }
            };
            if let Some((first, first_glyph)) = previous.take() {
                if let Some(pair) = store.pair_adjustment(first_glyph, glyph) {
                    first.kern += pair.first_adjustment.x_advance + pair.second_adjustment.x_placement;
                }
            }
            previous = Some((ch, glyph));
        }
    }
}

/// Resolves a glyph inserted by the engine. Such glyphs never count as missing.
fn resolve_special(
    registry: &FontRegistry,
    settings: &GenerationSettings,
    scratch: &mut ScratchBuffers,
    primary: FontId,
    unicode: u32,
) -> Option<(usize, Element)> {
    if let Some(found) = scratch.resolve.resolved.get(&(primary, unicode)) {
        return Some(*found);
    }
    let mut request = vec![unicode];
    resolve_in_chain(
        registry,
        settings,
        &mut scratch.fonts,
        &mut scratch.resolve.resolved,
        &mut scratch.diagnostics,
        primary,
        &mut request,
    );
    scratch.resolve.resolved.get(&(primary, unicode)).copied()
}
