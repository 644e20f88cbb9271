// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The ordered atlas pages of one font.

use crate::{AtlasRect, FontId, GlyphRectAllocator, RenderMode};

/// Opaque identity of one page's pixel storage.
///
/// The pixel data itself lives with the rasterizer and the renderer; the handle
/// is what gets queued for upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageHandle {
    /// The font owning the page.
    pub font: FontId,
    /// Index of the page within the font's page set.
    pub page: u32,
}

/// One fixed-size atlas page and its packing state.
#[derive(Clone, Debug)]
pub struct AtlasPage {
    index: u32,
    handle: PageHandle,
    allocator: GlyphRectAllocator,
}

impl AtlasPage {
    fn new(font: FontId, index: u32, bounds: AtlasRect) -> Self {
        Self {
            index,
            handle: PageHandle { font, page: index },
            allocator: GlyphRectAllocator::new(bounds),
        }
    }

    /// Index of this page within its set.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Handle of this page's pixel storage.
    pub fn handle(&self) -> PageHandle {
        self.handle
    }

    /// The packing state of this page.
    pub fn allocator(&self) -> &GlyphRectAllocator {
        &self.allocator
    }

    /// Mutable packing state of this page.
    pub fn allocator_mut(&mut self) -> &mut GlyphRectAllocator {
        &mut self.allocator
    }
}

/// Ordered, growable collection of same-size atlas pages belonging to one font.
///
/// A new set always holds page 0. Adding a page never disturbs rectangles already
/// packed into earlier pages.
#[derive(Clone, Debug)]
pub struct AtlasPageSet {
    font: FontId,
    width: u32,
    height: u32,
    packing_modifier: u32,
    pages: Vec<AtlasPage>,
}

impl AtlasPageSet {
    /// Creates a page set holding a single empty page.
    pub fn new(font: FontId, width: u32, height: u32, render_mode: RenderMode) -> Self {
        let mut set = Self {
            font,
            width,
            height,
            packing_modifier: render_mode.packing_modifier(),
            pages: Vec::new(),
        };
        set.add_page();
        set
    }

    /// Creates an empty page set, used for baked atlases whose pages are
    /// reconstructed from their packed rectangles.
    pub(crate) fn empty(font: FontId, width: u32, height: u32, render_mode: RenderMode) -> Self {
        Self {
            font,
            width,
            height,
            packing_modifier: render_mode.packing_modifier(),
            pages: Vec::new(),
        }
    }

    fn page_bounds(&self) -> AtlasRect {
        AtlasRect::new(
            0,
            0,
            self.width.saturating_sub(self.packing_modifier),
            self.height.saturating_sub(self.packing_modifier),
        )
    }

    /// Width of every page in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of every page in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The font owning these pages.
    pub fn font(&self) -> FontId {
        self.font
    }

    /// Appends a fresh page and returns its index.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "page counts never approach u32::MAX"
    )]
    pub fn add_page(&mut self) -> u32 {
        let index = self.pages.len() as u32;
        if self.pages.len() == self.pages.capacity() {
            self.pages.reserve(self.pages.len().max(1));
        }
        let bounds = self.page_bounds();
        self.pages.push(AtlasPage::new(self.font, index, bounds));
        if index > 0 {
            log::debug!(
                "font {} atlas grew to {} pages of {}x{}",
                self.font.to_u32(),
                index + 1,
                self.width,
                self.height
            );
        }
        index
    }

    /// Makes sure pages up to and including `index` exist.
    pub fn ensure_page(&mut self, index: u32) -> &mut AtlasPage {
        while self.pages.len() <= index as usize {
            self.add_page();
        }
        &mut self.pages[index as usize]
    }

    /// Returns the page at `index`.
    pub fn page(&self, index: u32) -> Option<&AtlasPage> {
        self.pages.get(index as usize)
    }

    /// Returns the page at `index` mutably.
    pub fn page_mut(&mut self, index: u32) -> Option<&mut AtlasPage> {
        self.pages.get_mut(index as usize)
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if the set holds no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Index of the page new glyphs are packed into first.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "page counts never approach u32::MAX"
    )]
    pub fn current_index(&self) -> u32 {
        self.pages.len().saturating_sub(1) as u32
    }

    /// Drops every page except page 0 and resets page 0 to empty.
    pub fn clear(&mut self) {
        self.pages.truncate(1);
        match self.pages.first_mut() {
            Some(page) => page.allocator.reset(),
            None => {
                self.add_page();
            }
        }
    }

    /// Iterates over the pages in order.
    pub fn iter(&self) -> impl Iterator<Item = &AtlasPage> + '_ {
        self.pages.iter()
    }

    /// Claims the given rectangles on the page at `index` without packing,
    /// creating the page if needed.
    pub(crate) fn reserve_packed(&mut self, index: u32, rects: &[AtlasRect], padding: u32) {
        let page = self.ensure_page(index);
        for rect in rects {
            page.allocator.reserve(*rect, padding);
        }
    }

    /// Adds page 0 if the set is empty.
    pub(crate) fn ensure_nonempty(&mut self) {
        if self.pages.is_empty() {
            self.add_page();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_set_has_one_full_page() {
        let set = AtlasPageSet::new(FontId::new(3), 256, 128, RenderMode::Smooth);
        assert_eq!(set.len(), 1);
        let page = set.page(0).unwrap();
        assert_eq!(page.handle(), PageHandle { font: FontId::new(3), page: 0 });
        assert_eq!(page.allocator().free_rects(), &[AtlasRect::new(0, 0, 256, 128)]);
    }

    #[test]
    fn distance_field_pages_keep_an_edge_free() {
        let set = AtlasPageSet::new(FontId::new(0), 256, 256, RenderMode::Sdf);
        let page = set.page(0).unwrap();
        assert_eq!(page.allocator().bounds(), AtlasRect::new(0, 0, 255, 255));
    }

    #[test]
    fn adding_pages_keeps_existing_packing() {
        let mut set = AtlasPageSet::new(FontId::new(0), 64, 64, RenderMode::Raster);
        let placed = set
            .page_mut(0)
            .unwrap()
            .allocator_mut()
            .allocate_one(crate::RectSize::new(10, 10), 0)
            .unwrap();
        assert_eq!(set.add_page(), 1);
        assert_eq!(set.add_page(), 2);
        assert_eq!(set.current_index(), 2);
        assert_eq!(set.page(0).unwrap().allocator().used_rects(), &[placed]);
        assert!(set.page(2).unwrap().allocator().used_rects().is_empty());
    }

    #[test]
    fn ensure_page_creates_missing_pages() {
        let mut set = AtlasPageSet::new(FontId::new(0), 32, 32, RenderMode::Raster);
        assert_eq!(set.ensure_page(3).index(), 3);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn clear_keeps_one_empty_page() {
        let mut set = AtlasPageSet::new(FontId::new(0), 32, 32, RenderMode::Raster);
        set.add_page();
        set.page_mut(0)
            .unwrap()
            .allocator_mut()
            .allocate_one(crate::RectSize::new(4, 4), 0);
        set.clear();
        assert_eq!(set.len(), 1);
        assert!(set.page(0).unwrap().allocator().used_rects().is_empty());
    }
}
