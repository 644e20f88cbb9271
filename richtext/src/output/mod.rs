// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generated layouts.

mod mesh;
mod result;

pub use mesh::{GlyphVertex, MaterialKey, MeshGroup, QUAD_INDICES};
pub use result::{
    BreakReason, CharacterInfo, Decoration, DecorationKind, ElementKind, Extents, LayoutResult,
    LineRecord, LinkInfo,
};
