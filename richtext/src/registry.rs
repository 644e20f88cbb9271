// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The font and sprite sheet registry passed to every generation call.

use std::sync::{Mutex, MutexGuard};

use glyph_atlas::{FontGlyphStore, FontId};
use hashbrown::HashMap;
use markup::{StyleSheet, TagHasher, TextStyle};
use smallvec::SmallVec;

use crate::{FontWeight, RegistryError, SpriteSheet, SpriteSheetId};

/// Font ids tried in order when resolving a code point.
pub type FallbackChain = SmallVec<[FontId; 8]>;

#[derive(Debug)]
struct FontVariant {
    weight: FontWeight,
    italic: bool,
    font: FontId,
}

#[derive(Debug)]
struct FontEntry {
    id: FontId,
    name: String,
    store: Mutex<FontGlyphStore>,
    fallbacks: Vec<FontId>,
    variants: SmallVec<[FontVariant; 4]>,
}

/// Owns every font and sprite sheet a layout can reference.
///
/// Each font's glyph store sits behind its own mutex so layouts on different
/// threads only contend when they populate the same font. Registration takes
/// `&mut self`; lookups and population take `&self`.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: Vec<Option<FontEntry>>,
    font_names: HashMap<u32, FontId>,
    fallbacks: Vec<FontId>,
    sprite_sheets: Vec<Option<SpriteSheet>>,
    sprite_names: HashMap<u32, SpriteSheetId>,
    default_sprite_sheet: Option<SpriteSheetId>,
    styles: StyleSheet,
}

impl FontRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a font under `name`.
    ///
    /// `build` receives the id the font will have and returns its glyph store,
    /// which must be created with that id. Names are matched case-insensitively, the way `<font=name>` looks them up.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "registries never hold anywhere near u32::MAX fonts"
    )]
    pub fn add_font(
        &mut self,
        name: &str,
        build: impl FnOnce(FontId) -> FontGlyphStore,
    ) -> Result<FontId, RegistryError> {
        let hash = TagHasher::hash_str(name);
        if self.font_names.contains_key(&hash) {
            return Err(RegistryError::DuplicateName(name.into()));
        }
        let id = FontId::new(self.fonts.len() as u32);
        let store = build(id);
        if store.id() != id {
            return Err(RegistryError::MismatchedFontId {
                expected: id,
                found: store.id(),
            });
        }
        self.fonts.push(Some(FontEntry {
            id,
            name: name.into(),
            store: Mutex::new(store),
            fallbacks: Vec::new(),
            variants: SmallVec::new(),
        }));
        self.font_names.insert(hash, id);
        log::debug!("registered font {name:?} as {}", id.to_u32());
        Ok(id)
    }

    /// Unregisters a font and returns its glyph store.
    ///
    /// References to the font from fallback lists and variants are dropped too.
    /// The id is not reused.
    pub fn remove_font(&mut self, id: FontId) -> Result<FontGlyphStore, RegistryError> {
        let entry = self
            .fonts
            .get_mut(id.to_u32() as usize)
            .and_then(Option::take)
            .ok_or(RegistryError::UnknownFont(id))?;
        self.font_names.remove(&TagHasher::hash_str(&entry.name));
        self.fallbacks.retain(|font| *font != id);
        for other in self.fonts.iter_mut().flatten() {
            other.fallbacks.retain(|font| *font != id);
            other.variants.retain(|variant| variant.font != id);
        }
        Ok(into_store(entry.store))
    }

    fn entry(&self, id: FontId) -> Option<&FontEntry> {
        self.fonts.get(id.to_u32() as usize)?.as_ref()
    }

    fn entry_mut(&mut self, id: FontId) -> Result<&mut FontEntry, RegistryError> {
        self.fonts
            .get_mut(id.to_u32() as usize)
            .and_then(Option::as_mut)
            .ok_or(RegistryError::UnknownFont(id))
    }

    /// Returns `true` if `id` refers to a registered font.
    pub fn contains_font(&self, id: FontId) -> bool {
        self.entry(id).is_some()
    }

    /// Looks up a font by name.
    pub fn font_by_name(&self, name: &str) -> Option<FontId> {
        self.font_by_name_hash(TagHasher::hash_str(name))
    }

    /// Looks up a font by the case-insensitive hash of its name.
    pub fn font_by_name_hash(&self, hash: u32) -> Option<FontId> {
        self.font_names.get(&hash).copied()
    }

    /// The name a font was registered under.
    pub fn font_name(&self, id: FontId) -> Option<&str> {
        self.entry(id).map(|entry| entry.name.as_str())
    }

    /// Ids of every registered font.
    pub fn font_ids(&self) -> impl Iterator<Item = FontId> + '_ {
        self.fonts.iter().flatten().map(|entry| entry.id)
    }

    /// Locks the glyph store of a font.
    ///
    /// A store whose previous holder panicked is handed out as is; its tables are
    /// only ever appended to, so they stay consistent.
    pub fn lock(&self, id: FontId) -> Option<MutexGuard<'_, FontGlyphStore>> {
        self.entry(id).map(|entry| lock_store(&entry.store))
    }

    /// Sets the fonts tried after `id` when it lacks a code point.
    pub fn set_font_fallbacks(
        &mut self,
        id: FontId,
        fallbacks: Vec<FontId>,
    ) -> Result<(), RegistryError> {
        if let Some(unknown) = fallbacks.iter().find(|font| !self.contains_font(**font)) {
            return Err(RegistryError::UnknownFont(*unknown));
        }
        self.entry_mut(id)?.fallbacks = fallbacks;
        Ok(())
    }

    /// Sets the fonts tried after every font's own fallbacks.
    pub fn set_global_fallbacks(&mut self, fallbacks: Vec<FontId>) -> Result<(), RegistryError> {
        if let Some(unknown) = fallbacks.iter().find(|font| !self.contains_font(**font)) {
            return Err(RegistryError::UnknownFont(*unknown));
        }
        self.fallbacks = fallbacks;
        Ok(())
    }

    /// The registry-wide fallback fonts.
    pub fn global_fallbacks(&self) -> &[FontId] {
        &self.fallbacks
    }

    /// The fonts tried when resolving a code point in `id`: the font itself, its
    /// own fallbacks, then the global fallbacks, without repeats.
    pub fn fallback_chain(&self, id: FontId) -> FallbackChain {
        let mut chain = FallbackChain::new();
        let own = self.entry(id).map(|entry| entry.fallbacks.as_slice());
        for font in core::iter::once(id)
            .chain(own.unwrap_or_default().iter().copied())
            .chain(self.fallbacks.iter().copied())
        {
            if !chain.contains(&font) && self.contains_font(font) {
                chain.push(font);
            }
        }
        chain
    }

    /// Registers `variant` as the face of `base` with the given weight and slant.
    pub fn add_variant(
        &mut self,
        base: FontId,
        weight: FontWeight,
        italic: bool,
        variant: FontId,
    ) -> Result<(), RegistryError> {
        if !self.contains_font(variant) {
            return Err(RegistryError::UnknownFont(variant));
        }
        let entry = self.entry_mut(base)?;
        entry
            .variants
            .retain(|existing| existing.weight != weight || existing.italic != italic);
        entry.variants.push(FontVariant {
            weight,
            italic,
            font: variant,
        });
        Ok(())
    }

    /// The face of `base` with exactly the given weight and slant, if registered.
    pub fn variant(&self, base: FontId, weight: FontWeight, italic: bool) -> Option<FontId> {
        self.entry(base)?
            .variants
            .iter()
            .find(|variant| variant.weight == weight && variant.italic == italic)
            .map(|variant| variant.font)
    }

    /// Registers a sprite sheet.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "registries never hold anywhere near u32::MAX sprite sheets"
    )]
    pub fn add_sprite_sheet(&mut self, sheet: SpriteSheet) -> Result<SpriteSheetId, RegistryError> {
        if self.sprite_names.contains_key(&sheet.name_hash()) {
            return Err(RegistryError::DuplicateName(sheet.name().into()));
        }
        let id = SpriteSheetId::new(self.sprite_sheets.len() as u32);
        self.sprite_names.insert(sheet.name_hash(), id);
        self.sprite_sheets.push(Some(sheet));
        Ok(id)
    }

    /// Unregisters a sprite sheet and returns it.
    pub fn remove_sprite_sheet(&mut self, id: SpriteSheetId) -> Result<SpriteSheet, RegistryError> {
        let sheet = self
            .sprite_sheets
            .get_mut(id.to_u32() as usize)
            .and_then(Option::take)
            .ok_or(RegistryError::UnknownSpriteSheet(id))?;
        self.sprite_names.remove(&sheet.name_hash());
        if self.default_sprite_sheet == Some(id) {
            self.default_sprite_sheet = None;
        }
        Ok(sheet)
    }

    /// Returns a registered sprite sheet.
    pub fn sprite_sheet(&self, id: SpriteSheetId) -> Option<&SpriteSheet> {
        self.sprite_sheets.get(id.to_u32() as usize)?.as_ref()
    }

    /// Looks up a sprite sheet by the case-insensitive hash of its name.
    pub fn sprite_sheet_by_name_hash(&self, hash: u32) -> Option<SpriteSheetId> {
        self.sprite_names.get(&hash).copied()
    }

    /// Sets the sheet used by `<sprite>` tags without a sheet name and for code
    /// points no font can render.
    pub fn set_default_sprite_sheet(
        &mut self,
        id: Option<SpriteSheetId>,
    ) -> Result<(), RegistryError> {
        if let Some(id) = id {
            if self.sprite_sheet(id).is_none() {
                return Err(RegistryError::UnknownSpriteSheet(id));
            }
        }
        self.default_sprite_sheet = id;
        Ok(())
    }

    /// The default sprite sheet.
    pub fn default_sprite_sheet(&self) -> Option<SpriteSheetId> {
        self.default_sprite_sheet
    }

    /// Named styles available to `<style=name>`.
    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    /// Adds or replaces a named style.
    pub fn add_style(&mut self, style: TextStyle) -> Option<TextStyle> {
        self.styles.insert(style)
    }

    /// Removes a named style.
    pub fn remove_style(&mut self, name: &str) -> Option<TextStyle> {
        self.styles.remove(name)
    }
}

fn lock_store(store: &Mutex<FontGlyphStore>) -> MutexGuard<'_, FontGlyphStore> {
    store
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn into_store(store: Mutex<FontGlyphStore>) -> FontGlyphStore {
    store
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
