// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use glyph_atlas::FontId;

use crate::SpriteSheetId;

/// Errors reported by [`FontRegistry`](crate::FontRegistry) operations.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// A font or sprite sheet with this name is already registered.
    DuplicateName(String),
    /// The font id does not refer to a registered font.
    UnknownFont(FontId),
    /// The sprite sheet id does not refer to a registered sprite sheet.
    UnknownSpriteSheet(SpriteSheetId),
    /// A glyph store passed to `add_font` was built for a different font id.
    MismatchedFontId {
        /// The id the font was going to be registered under.
        expected: FontId,
        /// The id of the glyph store.
        found: FontId,
    },
}

impl core::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "name {name:?} is already registered"),
            Self::UnknownFont(id) => write!(f, "font {} is not registered", id.to_u32()),
            Self::UnknownSpriteSheet(id) => {
                write!(f, "sprite sheet {} is not registered", id.to_u32())
            }
            Self::MismatchedFontId { expected, found } => write!(
                f,
                "glyph store was built for font {}, expected font {}",
                found.to_u32(),
                expected.to_u32()
            ),
        }
    }
}

impl core::error::Error for RegistryError {}

/// Errors that abort a generation call.
///
/// When one of these is returned, the layout result passed in is left as it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum GenerationError {
    /// The settings name no font.
    NoFont,
    /// The font id does not refer to a registered font.
    UnknownFont(FontId),
    /// The font's face failed to load, so it has no usable lookup tables.
    FontNotReady(FontId),
}

impl core::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoFont => write!(f, "no font assigned"),
            Self::UnknownFont(id) => write!(f, "font {} is not registered", id.to_u32()),
            Self::FontNotReady(id) => {
                write!(f, "font {} has no initialized lookup tables", id.to_u32())
            }
        }
    }
}

impl core::error::Error for GenerationError {}

/// A non-fatal problem recorded while generating a layout.
#[derive(Clone, Debug, PartialEq)]
pub enum Diagnostic {
    /// Glyphs for these code points exist in the font but did not fit in its atlas.
    AtlasExhausted {
        /// The font whose atlas is full.
        font: FontId,
        /// The code points that could not be packed.
        code_points: Vec<u32>,
    },
    /// Auto-sizing hit its iteration cap before converging.
    AutoSizeNonConvergence {
        /// Number of iterations run.
        iterations: u32,
        /// The size that was accepted.
        font_size: f32,
    },
}
