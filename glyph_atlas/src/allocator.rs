// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Guillotine rectangle packing for a single atlas page.

use free_list::FreeList;

/// An axis-aligned rectangle within an atlas page, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AtlasRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl AtlasRect {
    /// The empty rectangle at the origin, granted to zero-area glyphs.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Creates a new rectangle.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in square pixels.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `true` if `other` lies entirely within `self`.
    pub fn contains(&self, other: &Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns `true` if the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// The size of a rectangle to pack, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RectSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl RectSize {
    /// Creates a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if the size covers no pixels.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Maintains the free and used rectangle lists of one atlas page.
///
/// Placement uses best-short-side-fit: each request goes into the free rectangle
/// that leaves the smallest leftover along its shorter side. The chosen free
/// rectangle is then split with a guillotine cut along the shorter leftover axis,
/// so free rectangles never overlap each other or any used rectangle.
#[derive(Clone, Debug)]
pub struct GlyphRectAllocator {
    bounds: AtlasRect,
    free: FreeList,
    used: Vec<AtlasRect>,
}

impl GlyphRectAllocator {
    /// Creates an allocator whose single free rectangle is `bounds`.
    pub fn new(bounds: AtlasRect) -> Self {
        let mut free = FreeList::default();
        if !bounds.is_empty() {
            free.rects.push(bounds);
        }
        Self {
            bounds,
            free,
            used: Vec::new(),
        }
    }

    /// The packable area of the page.
    pub fn bounds(&self) -> AtlasRect {
        self.bounds
    }

    /// Rectangles still available for packing.
    pub fn free_rects(&self) -> &[AtlasRect] {
        &self.free.rects
    }

    /// Rectangles that have been handed out, including padding.
    pub fn used_rects(&self) -> &[AtlasRect] {
        &self.used
    }

    /// Returns every rectangle to the free list.
    pub fn reset(&mut self) {
        self.free.rects.clear();
        self.used.clear();
        if !self.bounds.is_empty() {
            self.free.rects.push(self.bounds);
        }
    }

    /// Packs each requested size, returning the glyph rectangle (excluding padding)
    /// for every request that fit and `None` for every request that did not.
    ///
    /// `padding` is added on every side of each glyph before packing. Zero-area
    /// requests are granted [`AtlasRect::ZERO`] without consuming space. Requests
    /// are placed in order; a request that does not fit does not stop later, smaller
    /// requests from being placed.
    pub fn allocate(&mut self, sizes: &[RectSize], padding: u32) -> Vec<Option<AtlasRect>> {
        let placements = sizes
            .iter()
            .map(|size| self.allocate_one(*size, padding))
            .collect();
        self.free.merge();
        placements
    }

    /// Packs a single glyph. See [`allocate`](Self::allocate).
    pub fn allocate_one(&mut self, size: RectSize, padding: u32) -> Option<AtlasRect> {
        if size.is_empty() {
            return Some(AtlasRect::ZERO);
        }
        let margin = padding.checked_mul(2)?;
        let width = size.width.checked_add(margin)?;
        let height = size.height.checked_add(margin)?;
        let index = self.free.best_short_side_fit(width, height)?;
        let slot = self.free.split(index, width, height);
        self.used.push(slot);
        Some(AtlasRect::new(
            slot.x + padding,
            slot.y + padding,
            size.width,
            size.height,
        ))
    }

    /// Returns `true` if a glyph of `size` could be placed right now.
    pub fn can_fit(&self, size: RectSize, padding: u32) -> bool {
        if size.is_empty() {
            return true;
        }
        let margin = padding.saturating_mul(2);
        self.free
            .best_short_side_fit(
                size.width.saturating_add(margin),
                size.height.saturating_add(margin),
            )
            .is_some()
    }

    /// Marks an already placed glyph rectangle (excluding padding) as used.
    ///
    /// Used to rebuild the packing state of baked pages. Free space overlapping the
    /// padded rectangle is carved away.
    pub fn reserve(&mut self, rect: AtlasRect, padding: u32) {
        if rect.is_empty() {
            return;
        }
        let slot = AtlasRect::new(
            rect.x.saturating_sub(padding),
            rect.y.saturating_sub(padding),
            rect.width.saturating_add(padding.saturating_mul(2)),
            rect.height.saturating_add(padding.saturating_mul(2)),
        );
        self.free.subtract(slot);
        self.used.push(slot);
    }
}

mod free_list {
    use super::AtlasRect;

    #[derive(Clone, Debug, Default)]
    pub(super) struct FreeList {
        pub(super) rects: Vec<AtlasRect>,
    }

    impl FreeList {
        pub(super) fn best_short_side_fit(&self, width: u32, height: u32) -> Option<usize> {
            let mut best: Option<(usize, u32, u32)> = None;
            for (index, rect) in self.rects.iter().enumerate() {
                if rect.width < width || rect.height < height {
                    continue;
                }
                let leftover_x = rect.width - width;
                let leftover_y = rect.height - height;
                let short = leftover_x.min(leftover_y);
                let long = leftover_x.max(leftover_y);
                let better = match best {
                    None => true,
                    Some((_, best_short, best_long)) => {
                        short < best_short || (short == best_short && long < best_long)
                    }
                };
                if better {
                    best = Some((index, short, long));
                }
            }
            best.map(|(index, _, _)| index)
        }

        /// Carves a `width` x `height` slot from the top-left corner of the free
        /// rectangle at `index`, returning the slot.
        pub(super) fn split(&mut self, index: usize, width: u32, height: u32) -> AtlasRect {
            let free = self.rects.swap_remove(index);
            let slot = AtlasRect::new(free.x, free.y, width, height);
            let leftover_x = free.width - width;
            let leftover_y = free.height - height;
            // Split along the shorter leftover axis so the larger leftover stays whole.
            let (right, below) = if leftover_x <= leftover_y {
                (
                    AtlasRect::new(free.x + width, free.y, leftover_x, height),
                    AtlasRect::new(free.x, free.y + height, free.width, leftover_y),
                )
            } else {
                (
                    AtlasRect::new(free.x + width, free.y, leftover_x, free.height),
                    AtlasRect::new(free.x, free.y + height, width, leftover_y),
                )
            };
            for rect in [right, below] {
                if !rect.is_empty() {
                    self.rects.push(rect);
                }
            }
            slot
        }

        /// Removes `cut` from every free rectangle it overlaps, keeping the pieces
        /// disjoint.
        pub(super) fn subtract(&mut self, cut: AtlasRect) {
            let mut kept = Vec::with_capacity(self.rects.len() + 4);
            for free in self.rects.drain(..) {
                if !free.intersects(&cut) {
                    kept.push(free);
                    continue;
                }
                let top = cut.y.max(free.y);
                let bottom = cut.bottom().min(free.bottom());
                let pieces = [
                    // Full-height strips on either side.
                    AtlasRect::new(free.x, free.y, cut.x.saturating_sub(free.x), free.height),
                    AtlasRect::new(
                        cut.right(),
                        free.y,
                        free.right().saturating_sub(cut.right()),
                        free.height,
                    ),
                    // Strips above and below, between the side strips.
                    AtlasRect::new(
                        cut.x.max(free.x),
                        free.y,
                        cut.right().min(free.right()) - cut.x.max(free.x),
                        top - free.y,
                    ),
                    AtlasRect::new(
                        cut.x.max(free.x),
                        bottom,
                        cut.right().min(free.right()) - cut.x.max(free.x),
                        free.bottom() - bottom,
                    ),
                ];
                kept.extend(pieces.into_iter().filter(|rect| !rect.is_empty()));
            }
            self.rects = kept;
        }

        /// Joins free rectangles that share a full edge.
        pub(super) fn merge(&mut self) {
            let mut merged = true;
            while merged {
                merged = false;
                'outer: for i in 0..self.rects.len() {
                    for j in (i + 1)..self.rects.len() {
                        let (a, b) = (self.rects[i], self.rects[j]);
                        let joined = if a.x == b.x && a.width == b.width {
                            if a.bottom() == b.y {
                                Some(AtlasRect::new(a.x, a.y, a.width, a.height + b.height))
                            } else if b.bottom() == a.y {
                                Some(AtlasRect::new(a.x, b.y, a.width, a.height + b.height))
                            } else {
                                None
                            }
                        } else if a.y == b.y && a.height == b.height {
                            if a.right() == b.x {
                                Some(AtlasRect::new(a.x, a.y, a.width + b.width, a.height))
                            } else if b.right() == a.x {
                                Some(AtlasRect::new(b.x, a.y, a.width + b.width, a.height))
                            } else {
                                None
                            }
                        } else {
                            None
                        };
                        if let Some(joined) = joined {
                            self.rects[i] = joined;
                            self.rects.swap_remove(j);
                            merged = true;
                            break 'outer;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_disjoint(allocator: &GlyphRectAllocator) {
        let all: Vec<_> = allocator
            .used_rects()
            .iter()
            .chain(allocator.free_rects())
            .copied()
            .collect();
        for (i, a) in all.iter().enumerate() {
            assert!(
                allocator.bounds().contains(a),
                "{a:?} escapes the page bounds"
            );
            for b in &all[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn packs_into_empty_page() {
        let mut allocator = GlyphRectAllocator::new(AtlasRect::new(0, 0, 64, 64));
        let placed = allocator.allocate(&[RectSize::new(10, 12)], 1);
        assert_eq!(placed, vec![Some(AtlasRect::new(1, 1, 10, 12))]);
        assert_eq!(allocator.used_rects(), &[AtlasRect::new(0, 0, 12, 14)]);
        assert_disjoint(&allocator);
    }

    #[test]
    fn zero_area_consumes_nothing() {
        let mut allocator = GlyphRectAllocator::new(AtlasRect::new(0, 0, 16, 16));
        let placed = allocator.allocate(&[RectSize::new(0, 0), RectSize::new(8, 0)], 2);
        assert_eq!(placed, vec![Some(AtlasRect::ZERO), Some(AtlasRect::ZERO)]);
        assert!(allocator.used_rects().is_empty());
        assert_eq!(allocator.free_rects(), &[AtlasRect::new(0, 0, 16, 16)]);
    }

    #[test]
    fn reports_unpacked_and_keeps_going() {
        let mut allocator = GlyphRectAllocator::new(AtlasRect::new(0, 0, 32, 32));
        let placed = allocator.allocate(
            &[
                RectSize::new(30, 30),
                RectSize::new(20, 20),
                RectSize::new(2, 2),
            ],
            0,
        );
        assert!(placed[0].is_some());
        assert!(placed[1].is_none(), "second glyph cannot fit");
        assert!(placed[2].is_some(), "small glyph still fits in the leftover");
        assert_disjoint(&allocator);
    }

    #[test]
    fn best_short_side_fit_prefers_tight_slot() {
        let mut allocator = GlyphRectAllocator::new(AtlasRect::new(0, 0, 100, 100));
        // Leaves a 10x10 notch to the right and a 100x90 area below.
        allocator.allocate_one(RectSize::new(90, 10), 0).unwrap();
        let rect = allocator.allocate_one(RectSize::new(10, 10), 0).unwrap();
        assert_eq!(rect, AtlasRect::new(90, 0, 10, 10), "the notch is an exact fit");
        assert_disjoint(&allocator);
    }

    #[test]
    fn many_glyphs_never_overlap() {
        let mut allocator = GlyphRectAllocator::new(AtlasRect::new(0, 0, 255, 255));
        let sizes: Vec<_> = (0..200)
            .map(|i| RectSize::new(3 + (i * 7) % 17, 4 + (i * 5) % 13))
            .collect();
        let placed = allocator.allocate(&sizes, 1);
        for (size, rect) in sizes.iter().zip(&placed) {
            if let Some(rect) = rect {
                assert_eq!((rect.width, rect.height), (size.width, size.height));
                let owners = allocator
                    .used_rects()
                    .iter()
                    .filter(|used| used.contains(rect))
                    .count();
                assert_eq!(owners, 1, "{rect:?} must sit in exactly one used rect");
            }
        }
        assert_disjoint(&allocator);
    }

    #[test]
    fn reset_restores_full_page() {
        let mut allocator = GlyphRectAllocator::new(AtlasRect::new(0, 0, 20, 20));
        allocator.allocate_one(RectSize::new(20, 20), 0).unwrap();
        assert!(!allocator.can_fit(RectSize::new(1, 1), 0));
        allocator.reset();
        assert!(allocator.can_fit(RectSize::new(20, 20), 0));
    }

    #[test]
    fn reserve_carves_baked_rectangles() {
        let mut allocator = GlyphRectAllocator::new(AtlasRect::new(0, 0, 32, 32));
        allocator.reserve(AtlasRect::new(10, 10, 8, 8), 1);
        assert_eq!(allocator.used_rects(), &[AtlasRect::new(9, 9, 10, 10)]);
        assert_disjoint(&allocator);
        let free: u64 = allocator.free_rects().iter().map(AtlasRect::area).sum();
        assert_eq!(free, 32 * 32 - 100);
        let placed = allocator.allocate_one(RectSize::new(9, 9), 0).unwrap();
        assert!(!placed.intersects(&AtlasRect::new(9, 9, 10, 10)));
    }
}
