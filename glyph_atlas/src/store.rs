// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-font glyph and character tables with on-demand population.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use crate::{
    AtlasPageSet, AtlasRect, CharacterRecord, FaceInfo, FontAssetSettings, FontId,
    GlyphMetrics, GlyphPairAdjustment, GlyphRecord, PageHandle, PersistenceQueue,
    PopulationMode, Rasterizer, RectSize, TextureUploadQueue,
};

/// Why an [`FontGlyphStore::ensure_characters`] call was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refusal {
    /// The font's atlas was baked ahead of time and cannot change.
    StaticAtlas,
    /// No rasterizer is attached or its face failed to load.
    RasterizerUnavailable,
}

impl core::fmt::Display for Refusal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::StaticAtlas => write!(f, "font atlas is static"),
            Self::RasterizerUnavailable => write!(f, "no rasterizer available for font face"),
        }
    }
}

impl core::error::Error for Refusal {}

/// Overall result of an [`FontGlyphStore::ensure_characters`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureStatus {
    /// Every requested code point is now in the character table.
    Complete,
    /// Some code points could not be added and are listed as missing.
    Partial,
    /// Nothing was attempted.
    Refused(Refusal),
}

/// What [`FontGlyphStore::ensure_characters`] changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnsureOutcome {
    /// Code points newly added to the character table, in request order.
    pub added: Vec<u32>,
    /// Code points that are still absent, in request order.
    pub missing: Vec<u32>,
    /// Overall status.
    pub status: EnsureStatus,
}

impl EnsureOutcome {
    /// Returns `true` if every requested code point is now present.
    pub fn is_complete(&self) -> bool {
        self.status == EnsureStatus::Complete
    }
}

/// Pre-packed tables of a font whose atlas was built ahead of time.
#[derive(Clone, Debug, Default)]
pub struct BakedFont {
    /// Atlas settings the font was baked with.
    pub settings: FontAssetSettings,
    /// Face metrics.
    pub face: FaceInfo,
    /// Packed glyphs.
    pub glyphs: Vec<GlyphRecord>,
    /// Characters as `(code point, glyph index)` pairs.
    pub characters: Vec<(u32, u32)>,
    /// Baked pair adjustments.
    pub pair_adjustments: Vec<GlyphPairAdjustment>,
}

/// Fallback code points tried when a face has no glyph for a character.
fn substitute(unicode: u32) -> Option<u32> {
    match unicode {
        // No-break space and figure space.
        0x00A0 | 0x2007 => Some(0x0020),
        // Soft hyphen and non-breaking hyphen.
        0x00AD | 0x2011 => Some(0x002D),
        _ => None,
    }
}

/// A glyph waiting to be packed and the code points that resolve to it.
struct PendingGlyph {
    index: u32,
    metrics: GlyphMetrics,
    characters: SmallVec<[(usize, u32); 1]>,
}

/// The glyph and character tables of one font, plus its atlas pages.
///
/// Dynamic stores rasterize and pack glyphs on demand through a [`Rasterizer`].
/// Static stores are built from a [`BakedFont`] and refuse to change.
pub struct FontGlyphStore {
    id: FontId,
    settings: FontAssetSettings,
    face: Option<FaceInfo>,
    rasterizer: Option<Box<dyn Rasterizer + Send>>,
    glyphs: Vec<GlyphRecord>,
    glyph_lookup: HashMap<u32, usize>,
    characters: Vec<CharacterRecord>,
    character_lookup: HashMap<u32, usize>,
    missing_from_source: HashSet<u32>,
    pair_adjustments: Vec<GlyphPairAdjustment>,
    pair_lookup: HashMap<(u32, u32), usize>,
    pages: AtlasPageSet,
    upload_queue: Option<Arc<dyn TextureUploadQueue>>,
    persistence_queue: Option<Arc<dyn PersistenceQueue>>,
}

impl core::fmt::Debug for FontGlyphStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FontGlyphStore")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("glyphs", &self.glyphs.len())
            .field("characters", &self.characters.len())
            .field("pages", &self.pages.len())
            .field("has_rasterizer", &self.rasterizer.is_some())
            .finish_non_exhaustive()
    }
}

impl FontGlyphStore {
    /// Creates a store that populates itself through `rasterizer`.
    ///
    /// The face is loaded immediately. If that fails the store is still created,
    /// but every later [`ensure_characters`](Self::ensure_characters) call is refused.
    pub fn dynamic(
        id: FontId,
        settings: FontAssetSettings,
        mut rasterizer: Box<dyn Rasterizer + Send>,
    ) -> Self {
        let face = match rasterizer.load_face(settings.point_size, settings.face_index) {
            Ok(face) => Some(face),
            Err(err) => {
                log::warn!("font {}: failed to load face: {err}", id.to_u32());
                None
            }
        };
        let mut settings = settings;
        settings.population_mode = PopulationMode::Dynamic;
        let pages = AtlasPageSet::new(
            id,
            settings.atlas_width,
            settings.atlas_height,
            settings.render_mode,
        );
        Self {
            id,
            settings,
            face,
            rasterizer: Some(rasterizer),
            glyphs: Vec::new(),
            glyph_lookup: HashMap::new(),
            characters: Vec::new(),
            character_lookup: HashMap::new(),
            missing_from_source: HashSet::new(),
            pair_adjustments: Vec::new(),
            pair_lookup: HashMap::new(),
            pages,
            upload_queue: None,
            persistence_queue: None,
        }
    }

    /// Creates a static store from baked tables.
    pub fn from_baked(id: FontId, baked: BakedFont) -> Self {
        let BakedFont {
            mut settings,
            face,
            glyphs,
            characters,
            pair_adjustments,
        } = baked;
        settings.population_mode = PopulationMode::Static;
        let mut pages = AtlasPageSet::empty(
            id,
            settings.atlas_width,
            settings.atlas_height,
            settings.render_mode,
        );
        let mut glyph_lookup = HashMap::with_capacity(glyphs.len());
        for (slot, glyph) in glyphs.iter().enumerate() {
            glyph_lookup.insert(glyph.index, slot);
            pages.reserve_packed(glyph.page, &[glyph.rect], settings.padding);
        }
        pages.ensure_nonempty();
        let mut store = Self {
            id,
            settings,
            face: Some(face),
            rasterizer: None,
            glyphs,
            glyph_lookup,
            characters: Vec::with_capacity(characters.len()),
            character_lookup: HashMap::with_capacity(characters.len()),
            missing_from_source: HashSet::new(),
            pair_adjustments: Vec::new(),
            pair_lookup: HashMap::new(),
            pages,
            upload_queue: None,
            persistence_queue: None,
        };
        for (unicode, glyph_index) in characters {
            if store.glyph_lookup.contains_key(&glyph_index) {
                store.insert_character(unicode, glyph_index);
            } else {
                log::warn!(
                    "font {}: baked character U+{unicode:04X} refers to unknown glyph {glyph_index}",
                    id.to_u32()
                );
            }
        }
        store.insert_pairs(pair_adjustments);
        store
    }

    /// Attaches the queue that receives pages needing upload.
    pub fn with_upload_queue(mut self, queue: Arc<dyn TextureUploadQueue>) -> Self {
        self.upload_queue = Some(queue);
        self
    }

    /// Attaches the queue that receives persistence notifications.
    pub fn with_persistence_queue(mut self, queue: Arc<dyn PersistenceQueue>) -> Self {
        self.persistence_queue = Some(queue);
        self
    }

    /// The id of this font.
    pub fn id(&self) -> FontId {
        self.id
    }

    /// The atlas settings.
    pub fn settings(&self) -> &FontAssetSettings {
        &self.settings
    }

    /// Face metrics, if the face is loaded.
    pub fn face(&self) -> Option<&FaceInfo> {
        self.face.as_ref()
    }

    /// Returns `true` if the lookup tables can be used for layout.
    pub fn is_ready(&self) -> bool {
        self.face.is_some()
    }

    /// The atlas pages.
    pub fn pages(&self) -> &AtlasPageSet {
        &self.pages
    }

    /// Every glyph in insertion order.
    pub fn glyphs(&self) -> &[GlyphRecord] {
        &self.glyphs
    }

    /// Every character in insertion order.
    pub fn characters(&self) -> &[CharacterRecord] {
        &self.characters
    }

    /// Looks up a character by code point.
    pub fn character(&self, unicode: u32) -> Option<&CharacterRecord> {
        self.character_lookup
            .get(&unicode)
            .map(|&slot| &self.characters[slot])
    }

    /// Looks up a glyph by glyph index.
    pub fn glyph(&self, glyph_index: u32) -> Option<&GlyphRecord> {
        self.glyph_lookup
            .get(&glyph_index)
            .map(|&slot| &self.glyphs[slot])
    }

    /// Looks up a character and the glyph it renders with.
    pub fn resolve(&self, unicode: u32) -> Option<(&CharacterRecord, &GlyphRecord)> {
        let character = self.character(unicode)?;
        let glyph = self.glyph(character.glyph_index)?;
        Some((character, glyph))
    }

    /// Returns the adjustment applied between two consecutive glyphs.
    pub fn pair_adjustment(&self, first: u32, second: u32) -> Option<&GlyphPairAdjustment> {
        self.pair_lookup
            .get(&(first, second))
            .map(|&slot| &self.pair_adjustments[slot])
    }

    /// Every pair adjustment in insertion order.
    pub fn pair_adjustments(&self) -> &[GlyphPairAdjustment] {
        &self.pair_adjustments
    }

    /// Returns `true` if `unicode` was found to have no glyph in the face.
    pub fn is_missing_from_source(&self, unicode: u32) -> bool {
        self.missing_from_source.contains(&unicode)
    }

    /// Returns the code points of `unicodes` absent from the character table, adding
    /// them first when `try_add` is set.
    pub fn has_characters(&mut self, unicodes: &[u32], try_add: bool) -> Vec<u32> {
        if try_add {
            return self.ensure_characters(unicodes, false).missing;
        }
        let mut seen = HashSet::new();
        unicodes
            .iter()
            .copied()
            .filter(|unicode| seen.insert(*unicode) && !self.character_lookup.contains_key(unicode))
            .collect()
    }

    /// Makes sure every code point in `unicodes` has a character record,
    /// rasterizing and packing glyphs as needed.
    ///
    /// Glyphs that fit are committed even when others in the same call do not;
    /// the latter are reported in [`EnsureOutcome::missing`]. With
    /// `include_features`, pair adjustments involving the new glyphs are fetched.
    pub fn ensure_characters(&mut self, unicodes: &[u32], include_features: bool) -> EnsureOutcome {
        let mut seen = HashSet::with_capacity(unicodes.len());
        let requested: Vec<u32> = unicodes
            .iter()
            .copied()
            .filter(|unicode| seen.insert(*unicode))
            .collect();

        if self.settings.population_mode == PopulationMode::Static {
            log::warn!(
                "font {}: refusing to add characters to a static atlas",
                self.id.to_u32()
            );
            let missing = requested
                .into_iter()
                .filter(|unicode| !self.character_lookup.contains_key(unicode))
                .collect();
            return EnsureOutcome {
                added: Vec::new(),
                missing,
                status: EnsureStatus::Refused(Refusal::StaticAtlas),
            };
        }
        if self.face.is_none() || self.rasterizer.is_none() {
            log::warn!(
                "font {}: refusing to add characters without a rasterizer",
                self.id.to_u32()
            );
            return EnsureOutcome {
                added: Vec::new(),
                missing: requested,
                status: EnsureStatus::Refused(Refusal::RasterizerUnavailable),
            };
        }

        let mut added: Vec<(usize, u32)> = Vec::new();
        let mut missing: Vec<(usize, u32)> = Vec::new();
        let mut pending: Vec<PendingGlyph> = Vec::new();
        let flags = self.settings.render_mode.load_flags();

        for (order, unicode) in requested.into_iter().enumerate() {
            if self.character_lookup.contains_key(&unicode) {
                continue;
            }
            if self.missing_from_source.contains(&unicode) {
                missing.push((order, unicode));
                continue;
            }
            let Some(rasterizer) = self.rasterizer.as_mut() else {
                missing.push((order, unicode));
                continue;
            };
            let mut glyph_index = rasterizer.glyph_index(unicode);
            if glyph_index == 0 {
                if let Some(fallback) = substitute(unicode) {
                    glyph_index = rasterizer.glyph_index(fallback);
                }
            }
            if glyph_index == 0 {
                self.missing_from_source.insert(unicode);
                missing.push((order, unicode));
                continue;
            }
            if self.glyph_lookup.contains_key(&glyph_index) {
                self.insert_character(unicode, glyph_index);
                added.push((order, unicode));
                continue;
            }
            if let Some(glyph) = pending.iter_mut().find(|glyph| glyph.index == glyph_index) {
                glyph.characters.push((order, unicode));
                continue;
            }
            match rasterizer.rasterize(glyph_index, flags) {
                Some(metrics) => pending.push(PendingGlyph {
                    index: glyph_index,
                    metrics,
                    characters: SmallVec::from_elem((order, unicode), 1),
                }),
                None => {
                    self.missing_from_source.insert(unicode);
                    missing.push((order, unicode));
                }
            }
        }

        let placements = self.pack(&pending);
        let mut new_glyphs = Vec::new();
        let mut rendered: SmallVec<[(u32, Vec<(u32, AtlasRect)>); 2]> = SmallVec::new();
        let mut exhausted = 0_usize;
        for (glyph, placement) in pending.into_iter().zip(placements) {
            let Some((page, rect)) = placement else {
                exhausted += 1;
                missing.extend(glyph.characters);
                continue;
            };
            self.glyph_lookup.insert(glyph.index, self.glyphs.len());
            self.glyphs.push(GlyphRecord {
                index: glyph.index,
                metrics: glyph.metrics,
                rect,
                page,
                scale: 1.0,
            });
            new_glyphs.push(glyph.index);
            for (order, unicode) in glyph.characters {
                self.insert_character(unicode, glyph.index);
                added.push((order, unicode));
            }
            if !rect.is_empty() {
                match rendered.iter_mut().find(|(index, _)| *index == page) {
                    Some((_, batch)) => batch.push((glyph.index, rect)),
                    None => rendered.push((page, vec![(glyph.index, rect)])),
                }
            }
        }
        if exhausted > 0 {
            log::warn!(
                "font {}: atlas exhausted, {exhausted} glyphs could not be packed",
                self.id.to_u32()
            );
        }

        if let Some(rasterizer) = self.rasterizer.as_mut() {
            for (page, batch) in &rendered {
                let handle = PageHandle {
                    font: self.id,
                    page: *page,
                };
                rasterizer.render_glyphs(handle, self.settings.render_mode, batch);
                if let Some(queue) = &self.upload_queue {
                    queue.enqueue(handle);
                }
            }
        }

        if include_features && !new_glyphs.is_empty() {
            self.update_pair_adjustments(&new_glyphs);
        }
        if !added.is_empty() {
            if let Some(queue) = &self.persistence_queue {
                queue.mark_dirty(self.id);
            }
            log::debug!(
                "font {}: added {} characters, {} new glyphs across {} pages",
                self.id.to_u32(),
                added.len(),
                new_glyphs.len(),
                rendered.len()
            );
        }

        added.sort_unstable_by_key(|(order, _)| *order);
        missing.sort_unstable_by_key(|(order, _)| *order);
        let status = if missing.is_empty() {
            EnsureStatus::Complete
        } else {
            EnsureStatus::Partial
        };
        EnsureOutcome {
            added: added.into_iter().map(|(_, unicode)| unicode).collect(),
            missing: missing.into_iter().map(|(_, unicode)| unicode).collect(),
            status,
        }
    }

    /// Packs pending glyphs starting with the current page, adding pages while
    /// multi-page growth is enabled.
    fn pack(&mut self, pending: &[PendingGlyph]) -> Vec<Option<(u32, AtlasRect)>> {
        let mut placements = vec![None; pending.len()];
        if pending.is_empty() {
            return placements;
        }
        let sizes: Vec<RectSize> = pending
            .iter()
            .map(|glyph| glyph.metrics.pixel_size())
            .collect();
        let padding = self.settings.padding;
        let mut remaining: Vec<usize> = (0..pending.len()).collect();
        let mut page_index = self.pages.current_index();
        loop {
            let page = self.pages.ensure_page(page_index);
            let fresh = page.allocator().used_rects().is_empty();
            let request: Vec<RectSize> = remaining.iter().map(|&slot| sizes[slot]).collect();
            let placed = page.allocator_mut().allocate(&request, padding);
            let mut unplaced = Vec::new();
            let mut placed_any = false;
            for (slot, rect) in remaining.into_iter().zip(placed) {
                match rect {
                    Some(rect) => {
                        placements[slot] = Some((page_index, rect));
                        placed_any = true;
                    }
                    None => unplaced.push(slot),
                }
            }
            remaining = unplaced;
            if remaining.is_empty() || !self.settings.multi_atlas {
                break;
            }
            if fresh && !placed_any {
                log::warn!(
                    "font {}: {} glyphs are larger than an empty {}x{} page",
                    self.id.to_u32(),
                    remaining.len(),
                    self.pages.width(),
                    self.pages.height()
                );
                break;
            }
            page_index = self.pages.add_page();
        }
        placements
    }

    fn update_pair_adjustments(&mut self, new_glyphs: &[u32]) {
        let Some(rasterizer) = self.rasterizer.as_mut() else {
            return;
        };
        let new: HashSet<u32> = new_glyphs.iter().copied().collect();
        let all: Vec<u32> = self.glyphs.iter().map(|glyph| glyph.index).collect();
        let existing: Vec<u32> = all
            .iter()
            .copied()
            .filter(|index| !new.contains(index))
            .collect();
        let mut pairs = rasterizer.pair_adjustments(new_glyphs, &all);
        if !existing.is_empty() {
            pairs.extend(rasterizer.pair_adjustments(&existing, new_glyphs));
        }
        self.insert_pairs(pairs);
    }

    fn insert_pairs(&mut self, pairs: Vec<GlyphPairAdjustment>) {
        for pair in pairs {
            let key = (pair.first, pair.second);
            if self.pair_lookup.contains_key(&key) {
                continue;
            }
            self.pair_lookup.insert(key, self.pair_adjustments.len());
            self.pair_adjustments.push(pair);
        }
    }

    fn insert_character(&mut self, unicode: u32, glyph_index: u32) {
        self.character_lookup.insert(unicode, self.characters.len());
        self.characters.push(CharacterRecord {
            unicode,
            glyph_index,
            scale: 1.0,
            font: self.id,
        });
    }

    /// Drops every character, glyph and pair adjustment, and resets the atlas
    /// to a single empty page.
    pub fn clear(&mut self) -> Result<(), Refusal> {
        if self.settings.population_mode == PopulationMode::Static {
            return Err(Refusal::StaticAtlas);
        }
        self.glyphs.clear();
        self.glyph_lookup.clear();
        self.characters.clear();
        self.character_lookup.clear();
        self.missing_from_source.clear();
        self.pair_adjustments.clear();
        self.pair_lookup.clear();
        self.pages.clear();
        if let Some(queue) = &self.upload_queue {
            queue.enqueue(PageHandle {
                font: self.id,
                page: 0,
            });
        }
        if let Some(queue) = &self.persistence_queue {
            queue.mark_dirty(self.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DirtyFontSet, GlyphAdjustment, LoadFlags, RasterizerError, RenderMode, UploadQueue,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        lookups: AtomicUsize,
        renders: AtomicUsize,
    }

    /// Glyph index is the code point plus one; every glyph is 8x10.
    struct BoxRasterizer {
        missing: Vec<u32>,
        aliases: Vec<(u32, u32)>,
        kerning: Vec<(u32, u32)>,
        counters: Arc<Counters>,
        fail: bool,
    }

    impl BoxRasterizer {
        fn new() -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            (
                Self {
                    missing: Vec::new(),
                    aliases: Vec::new(),
                    kerning: Vec::new(),
                    counters: counters.clone(),
                    fail: false,
                },
                counters,
            )
        }
    }

    impl Rasterizer for BoxRasterizer {
        fn load_face(&mut self, point_size: f32, _: u32) -> Result<FaceInfo, RasterizerError> {
            if self.fail {
                return Err(RasterizerError::SourceUnavailable);
            }
            Ok(FaceInfo {
                point_size,
                scale: 1.0,
                line_height: 12.0,
                ascent_line: 10.0,
                descent_line: -2.0,
                ..FaceInfo::default()
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
            unicode + 1
        }

        fn rasterize(&mut self, _: u32, _: LoadFlags) -> Option<GlyphMetrics> {
            Some(GlyphMetrics {
                width: 8.0,
                height: 10.0,
                bearing_x: 0.0,
                bearing_y: 10.0,
                advance: 9.0,
            })
        }

        fn render_glyphs(&mut self, _: PageHandle, _: RenderMode, glyphs: &[(u32, AtlasRect)]) {
            self.counters.renders.fetch_add(glyphs.len(), Ordering::Relaxed);
        }

        fn pair_adjustments(&mut self, first: &[u32], second: &[u32]) -> Vec<GlyphPairAdjustment> {
            self.kerning
                .iter()
                .filter(|(a, b)| first.contains(&(a + 1)) && second.contains(&(b + 1)))
                .map(|(a, b)| GlyphPairAdjustment {
                    first: a + 1,
                    second: b + 1,
                    first_adjustment: GlyphAdjustment {
                        x_advance: -1.0,
                        ..GlyphAdjustment::default()
                    },
                    second_adjustment: GlyphAdjustment::default(),
                })
                .collect()
        }
    }

    fn settings(size: u32, multi_atlas: bool) -> FontAssetSettings {
        FontAssetSettings {
            point_size: 10.0,
            atlas_width: size,
            atlas_height: size,
            padding: 1,
            render_mode: RenderMode::Smooth,
            multi_atlas,
            ..FontAssetSettings::default()
        }
    }

    fn store(size: u32, multi_atlas: bool) -> FontGlyphStore {
        let (rasterizer, _) = BoxRasterizer::new();
        FontGlyphStore::dynamic(FontId::new(0), settings(size, multi_atlas), Box::new(rasterizer))
    }

    fn ascii(count: u32) -> Vec<u32> {
        (0x21..0x21 + count).collect()
    }

    fn assert_packing_invariant(store: &FontGlyphStore) {
        for page in store.pages().iter() {
            let allocator = page.allocator();
            let used = allocator.used_rects();
            for (i, a) in used.iter().enumerate() {
                assert!(allocator.bounds().contains(a));
                for b in &used[i + 1..] {
                    assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
                }
            }
        }
        for glyph in store.glyphs() {
            let page = store.pages().page(glyph.page).unwrap();
            let holders = page
                .allocator()
                .used_rects()
                .iter()
                .filter(|used| used.contains(&glyph.rect))
                .count();
            assert_eq!(holders, 1, "glyph {} is not in exactly one slot", glyph.index);
        }
    }

    #[test]
    fn adds_characters_and_packs_them() {
        let mut store = store(256, false);
        let outcome = store.ensure_characters(&ascii(20), false);
        assert!(outcome.is_complete());
        assert_eq!(outcome.added, ascii(20));
        assert!(outcome.missing.is_empty());
        assert_eq!(store.glyphs().len(), 20);
        assert_packing_invariant(&store);
    }

    #[test]
    fn second_call_is_idempotent() {
        let mut store = store(256, false);
        let text = [0x41, 0x42, 0x10FFFF];
        let first = store.ensure_characters(&text, false);
        let glyphs = store.glyphs().len();
        let pages = store.pages().len();
        let second = store.ensure_characters(&text, false);
        assert!(second.added.is_empty());
        assert_eq!(second.missing, first.missing);
        assert_eq!(store.glyphs().len(), glyphs);
        assert_eq!(store.pages().len(), pages);
    }

    #[test]
    fn added_characters_round_trip() {
        let mut store = store(256, false);
        store.ensure_characters(&[0x61, 0x62], false);
        let (character, glyph) = store.resolve(0x61).unwrap();
        assert_eq!(character.unicode, 0x61);
        assert_eq!(character.glyph_index, 0x62);
        assert_eq!(glyph.index, 0x62);
        let rect = glyph.rect;
        store.ensure_characters(&ascii(30), false);
        assert_eq!(store.resolve(0x61).unwrap().1.rect, rect);
    }

    #[test]
    fn grows_pages_when_enabled() {
        let mut store = store(48, true);
        let outcome = store.ensure_characters(&ascii(40), false);
        assert!(outcome.is_complete());
        assert!(store.pages().len() > 1);
        assert_packing_invariant(&store);
    }

    #[test]
    fn single_page_commits_what_fits() {
        let mut store = store(48, false);
        let outcome = store.ensure_characters(&ascii(40), false);
        assert_eq!(outcome.status, EnsureStatus::Partial);
        assert!(!outcome.added.is_empty());
        assert!(!outcome.missing.is_empty());
        assert_eq!(outcome.added.len() + outcome.missing.len(), 40);
        assert_eq!(store.pages().len(), 1);
        for unicode in &outcome.added {
            assert!(store.character(*unicode).is_some());
        }
        assert_packing_invariant(&store);
    }

    #[test]
    fn missing_code_points_are_cached() {
        let (mut rasterizer, counters) = BoxRasterizer::new();
        rasterizer.missing.push(0x4E00);
        let mut store =
            FontGlyphStore::dynamic(FontId::new(0), settings(256, false), Box::new(rasterizer));
        let outcome = store.ensure_characters(&[0x4E00, 0x41], false);
        assert_eq!(outcome.missing, vec![0x4E00]);
        assert_eq!(outcome.status, EnsureStatus::Partial);
        assert!(store.is_missing_from_source(0x4E00));
        let lookups = counters.lookups.load(Ordering::Relaxed);
        store.ensure_characters(&[0x4E00], false);
        assert_eq!(counters.lookups.load(Ordering::Relaxed), lookups);
    }

    #[test]
    fn no_break_space_falls_back_to_space() {
        let (mut rasterizer, _) = BoxRasterizer::new();
        rasterizer.missing.push(0xA0);
        let mut store =
            FontGlyphStore::dynamic(FontId::new(0), settings(256, false), Box::new(rasterizer));
        let outcome = store.ensure_characters(&[0x20, 0xA0], false);
        assert!(outcome.is_complete());
        assert_eq!(store.character(0xA0).unwrap().glyph_index, 0x21);
        assert_eq!(store.glyphs().len(), 1);
    }

    #[test]
    fn shared_glyphs_are_packed_once() {
        let (mut rasterizer, counters) = BoxRasterizer::new();
        rasterizer.aliases.push((0x212B, 0xC5));
        let mut store =
            FontGlyphStore::dynamic(FontId::new(0), settings(256, false), Box::new(rasterizer));
        let outcome = store.ensure_characters(&[0xC5, 0x212B], false);
        assert_eq!(outcome.added, vec![0xC5, 0x212B]);
        assert_eq!(store.glyphs().len(), 1);
        assert_eq!(counters.renders.load(Ordering::Relaxed), 1);
        assert_eq!(
            store.character(0xC5).unwrap().glyph_index,
            store.character(0x212B).unwrap().glyph_index
        );
    }

    #[test]
    fn static_fonts_refuse() {
        let baked = BakedFont {
            settings: settings(64, false),
            face: FaceInfo::default(),
            glyphs: vec![GlyphRecord {
                index: 0x42,
                metrics: GlyphMetrics::default(),
                rect: AtlasRect::new(1, 1, 8, 10),
                page: 0,
                scale: 1.0,
            }],
            characters: vec![(0x41, 0x42)],
            pair_adjustments: Vec::new(),
        };
        let mut store = FontGlyphStore::from_baked(FontId::new(1), baked);
        assert_eq!(store.settings().population_mode, PopulationMode::Static);
        assert!(store.character(0x41).is_some());
        assert_eq!(
            store.pages().page(0).unwrap().allocator().used_rects(),
            &[AtlasRect::new(0, 0, 10, 12)]
        );
        let outcome = store.ensure_characters(&[0x41, 0x43], false);
        assert_eq!(outcome.status, EnsureStatus::Refused(Refusal::StaticAtlas));
        assert_eq!(outcome.missing, vec![0x43]);
        assert_eq!(store.clear(), Err(Refusal::StaticAtlas));
    }

    #[test]
    fn failed_face_refuses_everything() {
        let (mut rasterizer, _) = BoxRasterizer::new();
        rasterizer.fail = true;
        let mut store =
            FontGlyphStore::dynamic(FontId::new(0), settings(64, false), Box::new(rasterizer));
        assert!(!store.is_ready());
        let outcome = store.ensure_characters(&[0x41, 0x42, 0x41], false);
        assert_eq!(
            outcome.status,
            EnsureStatus::Refused(Refusal::RasterizerUnavailable)
        );
        assert_eq!(outcome.missing, vec![0x41, 0x42]);
    }

    #[test]
    fn reports_uploads_and_persistence() {
        let uploads = Arc::new(UploadQueue::new());
        let dirty = Arc::new(DirtyFontSet::new());
        let mut store = store(48, true)
            .with_upload_queue(uploads.clone())
            .with_persistence_queue(dirty.clone());
        store.ensure_characters(&ascii(20), false);
        let pages = uploads.take_pending();
        assert_eq!(pages.len(), store.pages().len());
        assert!(dirty.contains(FontId::new(0)));
        dirty.take();
        store.ensure_characters(&ascii(20), false);
        assert!(uploads.is_empty());
        assert!(!dirty.contains(FontId::new(0)));
    }

    #[test]
    fn pair_adjustments_cover_the_delta() {
        let (mut rasterizer, _) = BoxRasterizer::new();
        rasterizer.kerning = vec![(0x41, 0x56), (0x56, 0x41), (0x54, 0x6F)];
        let mut store =
            FontGlyphStore::dynamic(FontId::new(0), settings(256, false), Box::new(rasterizer));
        store.ensure_characters(&[0x41], true);
        assert!(store.pair_adjustments().is_empty());
        store.ensure_characters(&[0x56], true);
        assert_eq!(store.pair_adjustments().len(), 2);
        let av = store.pair_adjustment(0x42, 0x57).unwrap();
        assert_eq!(av.first_adjustment.x_advance, -1.0);
        assert!(store.pair_adjustment(0x57, 0x42).is_some());
        store.ensure_characters(&[0x54, 0x6F], false);
        assert!(store.pair_adjustment(0x55, 0x70).is_none());
    }

    #[test]
    fn clear_resets_tables() {
        let mut store = store(48, true);
        store.ensure_characters(&ascii(40), false);
        store.clear().unwrap();
        assert!(store.characters().is_empty());
        assert!(store.glyphs().is_empty());
        assert_eq!(store.pages().len(), 1);
        assert!(store.ensure_characters(&[0x41], false).is_complete());
    }
}
