// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Richtext lays out text with inline markup over dynamic glyph atlases.
//!
//! A layout is generated from [`GenerationSettings`] against a [`FontRegistry`]:
//!
//! - the text is tokenized by the [`markup`] crate, which expands named styles and
//!   escapes and marks up tags;
//! - every tag updates a stack of style attributes (`<b>`, `<color=#F00>`,
//!   `<size=150%>`, `<sprite name=coin>`, …);
//! - characters are resolved to glyphs through each font's fallback chain,
//!   packing missing glyphs into the font's atlas on demand;
//! - lines are wrapped at break opportunities from a [`LineBreakClassifier`],
//!   optionally searching for the largest font size that fits the container;
//! - the result is a [`LayoutResult`] holding per-character records, line
//!   records and mesh quads grouped by material.
//!
//! ```no_run
//! use richtext::{FontRegistry, GenerationSettings, LayoutContext};
//! # use richtext::glyph_atlas::{FontGlyphStore, FontId};
//! # fn store(id: FontId) -> FontGlyphStore { unimplemented!() }
//!
//! let mut registry = FontRegistry::new();
//! let font = registry.add_font("Sans", store).unwrap();
//! let mut context = LayoutContext::new();
//! let settings = GenerationSettings {
//!     text: "Hello <b>world</b>".into(),
//!     font: Some(font),
//!     container_width: 200.0,
//!     ..GenerationSettings::default()
//! };
//! let layout = context.generate(&registry, &settings).unwrap();
//! assert!(layout.missing().is_empty());
//! ```
//!
//! Generated layouts can be kept across frames in a [`TemporaryCache`] or a
//! [`PermanentCache`], keyed by a [`CallerId`] and
//! [`GenerationSettings::content_hash`].

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

mod cache;
mod context;
mod error;
mod layout;
mod line_break;
mod output;
mod registry;
mod settings;
mod sprite;
mod style;
mod tags;

pub use glyph_atlas;
pub use markup;

/// An sRGB color with alpha.
pub type Color = peniko::color::AlphaColor<peniko::color::Srgb>;

pub use cache::{CallerId, EvictionListener, PermanentCache, TemporaryCache};
pub use context::{LayoutContext, LayoutContextPool};
pub use error::{Diagnostic, GenerationError, RegistryError};
pub use layout::ScratchBuffers;
pub use line_break::{HangulBreakRule, LineBreakClassifier, UnicodeLineBreakClassifier};
pub use output::{
    BreakReason, CharacterInfo, Decoration, DecorationKind, ElementKind, Extents, GlyphVertex,
    LayoutResult, LineRecord, LinkInfo, MaterialKey, MeshGroup, QUAD_INDICES,
};
pub use registry::{FallbackChain, FontRegistry};
pub use settings::{
    Alignment, AutoSize, FontWeight, GenerationSettings, HorizontalAlignment, Margins,
    OverflowMode, VerticalAlignment,
};
pub use sprite::{Sprite, SpriteSheet, SpriteSheetId};
pub use style::FontStyle;
