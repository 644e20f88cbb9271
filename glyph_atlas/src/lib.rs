// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph Atlas decides which glyphs exist in a font's rasterized cache and where
//! they live.
//!
//! The crate is split into three layers:
//! - [`GlyphRectAllocator`] packs rectangles into one fixed-size atlas page using
//!   best-short-side-fit guillotine packing.
//! - [`AtlasPageSet`] owns the ordered pages of a font and adds a page when the
//!   current one is exhausted.
//! - [`FontGlyphStore`] maps code points to characters and glyph indices to glyphs,
//!   rasterizing and packing missing glyphs on demand through a [`Rasterizer`].
//!
//! Pixel storage, rasterization and persistence are external collaborators. The
//! store only reports pages that need uploading to a [`TextureUploadQueue`] and fonts
//! that need saving to a [`PersistenceQueue`].

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]

mod allocator;
mod page;
mod queue;
mod raster;
mod record;
mod settings;
mod store;

pub use allocator::{AtlasRect, GlyphRectAllocator, RectSize};
pub use page::{AtlasPage, AtlasPageSet, PageHandle};
pub use queue::{DirtyFontSet, PersistenceQueue, TextureUploadQueue, UploadQueue};
pub use raster::{LoadFlags, Rasterizer, RasterizerError};
pub use record::{
    CharacterRecord, FaceInfo, FontId, GlyphAdjustment, GlyphMetrics, GlyphPairAdjustment,
    GlyphRecord,
};
pub use settings::{FontAssetSettings, PopulationMode, RenderMode};
pub use store::{BakedFont, EnsureOutcome, EnsureStatus, FontGlyphStore, Refusal};
