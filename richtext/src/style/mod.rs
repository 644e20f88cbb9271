// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style flags and the attribute stacks driven by inline tags.

mod stack;

pub(crate) use stack::{StyleEnv, StyleState};

bitflags::bitflags! {
    /// Binary style flags.
    ///
    /// Inside a layout each flag is reference counted, so nested identical tags
    /// only clear the flag at the outermost closing tag.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FontStyle: u16 {
        /// Bold.
        const BOLD = 1 << 0;
        /// Italic.
        const ITALIC = 1 << 1;
        /// Underline.
        const UNDERLINE = 1 << 2;
        /// Strikethrough.
        const STRIKETHROUGH = 1 << 3;
        /// Superscript.
        const SUPERSCRIPT = 1 << 4;
        /// Subscript.
        const SUBSCRIPT = 1 << 5;
        /// Upper case.
        const UPPERCASE = 1 << 6;
        /// Lower case.
        const LOWERCASE = 1 << 7;
        /// Small capitals.
        const SMALLCAPS = 1 << 8;
        /// Highlight.
        const HIGHLIGHT = 1 << 9;
    }
}

const FLAG_COUNT: usize = 10;

/// Reference counts of every [`FontStyle`] flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StyleCounts([u16; FLAG_COUNT]);

impl StyleCounts {
    /// Starts every flag in `base` at a count of one.
    pub(crate) fn from_flags(base: FontStyle) -> Self {
        let mut counts = Self::default();
        for flag in base.iter() {
            counts.0[Self::slot(flag)] = 1;
        }
        counts
    }

    fn slot(flag: FontStyle) -> usize {
        flag.bits().trailing_zeros() as usize
    }

    /// Increments the count of every flag in `flags`.
    pub(crate) fn open(&mut self, flags: FontStyle) {
        for flag in flags.iter() {
            let count = &mut self.0[Self::slot(flag)];
            *count = count.saturating_add(1);
        }
    }

    /// Decrements the count of every flag in `flags`. Counts never go below zero.
    pub(crate) fn close(&mut self, flags: FontStyle) {
        for flag in flags.iter() {
            let count = &mut self.0[Self::slot(flag)];
            *count = count.saturating_sub(1);
        }
    }

    /// How many times `flag` is currently open.
    pub(crate) fn count(&self, flag: FontStyle) -> u16 {
        if flag.bits().count_ones() != 1 {
            return 0;
        }
        self.0[Self::slot(flag)]
    }

    /// The flags with a nonzero count.
    pub(crate) fn flags(&self) -> FontStyle {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .fold(FontStyle::empty(), |flags, (slot, _)| {
                flags | FontStyle::from_bits_truncate(1 << slot)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_flags_clear_at_outermost_close() {
        let mut counts = StyleCounts::default();
        counts.open(FontStyle::BOLD);
        counts.open(FontStyle::BOLD);
        counts.close(FontStyle::BOLD);
        assert_eq!(counts.count(FontStyle::BOLD), 1);
        assert!(counts.flags().contains(FontStyle::BOLD));
        counts.close(FontStyle::BOLD);
        assert!(counts.flags().is_empty());
    }

    #[test]
    fn extra_close_is_a_no_op() {
        let mut counts = StyleCounts::from_flags(FontStyle::ITALIC);
        counts.close(FontStyle::UNDERLINE);
        counts.close(FontStyle::ITALIC);
        counts.close(FontStyle::ITALIC);
        assert_eq!(counts.flags(), FontStyle::empty());
        counts.open(FontStyle::ITALIC | FontStyle::HIGHLIGHT);
        assert_eq!(counts.flags(), FontStyle::ITALIC | FontStyle::HIGHLIGHT);
    }
}
