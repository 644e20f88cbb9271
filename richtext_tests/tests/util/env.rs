// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use glyph_atlas::{FontGlyphStore, FontId};
use richtext::{FontRegistry, GenerationSettings, LayoutContext, LayoutResult};
use richtext_dev::{font_settings, RasterCounters, SyntheticRasterizer};

/// Sampling point size of every test font. Layouts at this font size map glyph
/// metrics one to one.
pub(crate) const POINT_SIZE: f32 = 10.0;

/// A registry with one synthetic font, and a context to lay out with.
pub(crate) struct TestEnv {
    name: &'static str,
    pub(crate) registry: FontRegistry,
    pub(crate) font: FontId,
    pub(crate) context: LayoutContext,
    counters: Arc<RasterCounters>,
}

impl TestEnv {
    pub(crate) fn new(name: &'static str) -> Self {
        Self::with_rasterizer(name, SyntheticRasterizer::new())
    }

    pub(crate) fn with_rasterizer(name: &'static str, rasterizer: SyntheticRasterizer) -> Self {
        let counters = rasterizer.counters();
        Self::with_store(name, counters, |id| {
            rasterizer.into_store(id, font_settings(POINT_SIZE))
        })
    }

    /// Registers the primary font from a custom glyph store.
    pub(crate) fn with_store(
        name: &'static str,
        counters: Arc<RasterCounters>,
        build: impl FnOnce(FontId) -> FontGlyphStore,
    ) -> Self {
        let mut registry = FontRegistry::new();
        let font = registry.add_font("Synthetic", build).unwrap();
        Self {
            name,
            registry,
            font,
            context: LayoutContext::new(),
            counters,
        }
    }

    /// Registers another synthetic font.
    pub(crate) fn add_font(&mut self, name: &str, rasterizer: SyntheticRasterizer) -> FontId {
        self.registry
            .add_font(name, |id| {
                rasterizer.into_store(id, font_settings(POINT_SIZE))
            })
            .unwrap()
    }

    /// Settings for `text` in the test font at the sampling size, in a 200x100
    /// container.
    pub(crate) fn settings(&self, text: &str) -> GenerationSettings {
        GenerationSettings {
            font_size: POINT_SIZE,
            container_width: 200.0,
            container_height: 100.0,
            ..GenerationSettings::new(text, self.font)
        }
    }

    pub(crate) fn generate(&mut self, settings: &GenerationSettings) -> LayoutResult {
        self.context
            .generate(&self.registry, settings)
            .unwrap_or_else(|err| panic!("{}: generation failed: {err}", self.name))
    }

    /// Lays out `text` with the default test settings.
    pub(crate) fn layout(&mut self, text: &str) -> LayoutResult {
        let settings = self.settings(text);
        self.generate(&settings)
    }

    pub(crate) fn counters(&self) -> &RasterCounters {
        &self.counters
    }
}
