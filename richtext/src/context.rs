// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contexts that own the working memory of layout generation.

use core::hash::BuildHasher;
use std::sync::Mutex;

use foldhash::fast::FixedState;
use markup::{MarkupTokenizer, TagHasher, TokenizerOptions};

use crate::layout::{self, ScratchBuffers};
use crate::line_break::{LineBreakClassifier, UnicodeLineBreakClassifier};
use crate::{FontRegistry, GenerationError, GenerationSettings, HangulBreakRule, LayoutResult};

/// Context for generating text layouts.
///
/// A context owns the tokenizer and scratch buffers of the layout engine. It is
/// not shared: each thread generating layouts uses its own, or borrows one from a
/// [`LayoutContextPool`].
pub struct LayoutContext {
    tokenizer: MarkupTokenizer,
    scratch: ScratchBuffers,
    classifier: Box<dyn LineBreakClassifier + Send + Sync>,
}

impl core::fmt::Debug for LayoutContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutContext")
            .field("tokenizer", &self.tokenizer)
            .field("scratch", &self.scratch)
            .finish_non_exhaustive()
    }
}

impl Default for LayoutContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutContext {
    /// Creates a context breaking lines by the Unicode line break property.
    pub fn new() -> Self {
        Self::with_line_breaker(UnicodeLineBreakClassifier::new(HangulBreakRule::default()))
    }

    /// Creates a context that asks `classifier` where lines may break.
    pub fn with_line_breaker(
        classifier: impl LineBreakClassifier + Send + Sync + 'static,
    ) -> Self {
        Self {
            tokenizer: MarkupTokenizer::new(),
            scratch: ScratchBuffers::new(),
            classifier: Box::new(classifier),
        }
    }

    /// The scratch buffers.
    pub fn scratch(&self) -> &ScratchBuffers {
        &self.scratch
    }

    /// The scratch buffers, for reserving capacity ahead of time.
    pub fn scratch_mut(&mut self) -> &mut ScratchBuffers {
        &mut self.scratch
    }

    /// Lays out `settings` into a new result.
    pub fn generate(
        &mut self,
        registry: &FontRegistry,
        settings: &GenerationSettings,
    ) -> Result<LayoutResult, GenerationError> {
        let mut result = LayoutResult::new();
        self.generate_into(registry, settings, &mut result)?;
        Ok(result)
    }

    /// Lays out `settings` into `result`, reusing its buffers.
    ///
    /// On error `result` is left unchanged.
    pub fn generate_into(
        &mut self,
        registry: &FontRegistry,
        settings: &GenerationSettings,
        result: &mut LayoutResult,
    ) -> Result<(), GenerationError> {
        let options = TokenizerOptions {
            rich_text: settings.rich_text,
            parse_control_characters: settings.parse_control_characters,
            default_style: settings
                .default_style
                .as_deref()
                .map(TagHasher::hash_str),
        };
        let chars = self
            .tokenizer
            .tokenize_str(&settings.text, registry.styles(), options);
        layout::generate(
            chars,
            &mut self.scratch,
            &*self.classifier,
            registry,
            settings,
            result,
        )
    }
}

/// One [`LayoutContext`] per worker thread slot.
///
/// Threads pick a slot from a hash of their id, so contexts are rarely contended
/// when there are at least as many slots as threads.
#[derive(Debug)]
pub struct LayoutContextPool {
    slots: Vec<Mutex<LayoutContext>>,
}

impl LayoutContextPool {
    /// Creates a pool with `slots` contexts, at least one.
    pub fn new(slots: usize) -> Self {
        Self {
            slots: (0..slots.max(1))
                .map(|_| Mutex::new(LayoutContext::new()))
                .collect(),
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false`; a pool has at least one slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs `f` with the context in `slot`, modulo the number of slots.
    pub fn with_slot<R>(&self, slot: usize, f: impl FnOnce(&mut LayoutContext) -> R) -> R {
        let mut context = match self.slots[slot % self.slots.len()].lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut context)
    }

    /// Runs `f` with the context of the current thread's slot.
    pub fn with_current_thread<R>(&self, f: impl FnOnce(&mut LayoutContext) -> R) -> R {
        let hash = FixedState::with_seed(0).hash_one(std::thread::current().id());
        #[expect(
            clippy::cast_possible_truncation,
            reason = "only the low bits select a slot"
        )]
        let slot = hash as usize;
        self.with_slot(slot, f)
    }

    /// Lays out `settings` into `result` with the current thread's context.
    pub fn generate_into(
        &self,
        registry: &FontRegistry,
        settings: &GenerationSettings,
        result: &mut LayoutResult,
    ) -> Result<(), GenerationError> {
        self.with_current_thread(|context| context.generate_into(registry, settings, result))
    }
}
