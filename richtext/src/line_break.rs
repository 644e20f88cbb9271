// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Break opportunities between adjacent characters that are not separated by
//! whitespace.

use icu_properties::props::LineBreak;
use icu_properties::CodePointMapData;

/// Decides where a line may break inside a run of non-space characters.
///
/// Spaces, tabs, zero width spaces, soft hyphens and hyphens are always break
/// opportunities and are handled by the layout engine itself; a classifier only
/// covers the rules for scripts written without spaces.
pub trait LineBreakClassifier {
    /// Returns `true` if a line may break between `previous` and `current`.
    fn can_break_before(&self, current: u32, previous: u32) -> bool;
}

/// How Korean text is broken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HangulBreakRule {
    /// Break only at spaces, as modern Korean is written.
    #[default]
    Modern,
    /// Break between any two syllables, like ideographs.
    Traditional,
}

/// [`LineBreakClassifier`] based on the Unicode `Line_Break` property.
///
/// A break is allowed before or after an ideographic character, except before
/// closing punctuation and other characters that may not start a line, and after
/// opening punctuation and other characters that may not end one.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnicodeLineBreakClassifier {
    hangul: HangulBreakRule,
}

impl UnicodeLineBreakClassifier {
    /// Creates a classifier with the given Hangul rule.
    pub fn new(hangul: HangulBreakRule) -> Self {
        Self { hangul }
    }

    /// The Hangul rule in use.
    pub fn hangul_rule(&self) -> HangulBreakRule {
        self.hangul
    }

    fn breaks_freely(&self, class: LineBreak) -> bool {
        match class {
            LineBreak::Ideographic => true,
            LineBreak::H2 | LineBreak::H3 | LineBreak::JL | LineBreak::JV | LineBreak::JT => {
                self.hangul == HangulBreakRule::Traditional
            }
            _ => false,
        }
    }
}

fn line_break(unicode: u32) -> LineBreak {
    CodePointMapData::<LineBreak>::new().get32(unicode)
}

/// Characters that never start a line.
fn is_follower(class: LineBreak) -> bool {
    matches!(
        class,
        LineBreak::Nonstarter
            | LineBreak::ClosePunctuation
            | LineBreak::CloseParenthesis
            | LineBreak::Exclamation
            | LineBreak::ConditionalJapaneseStarter
            | LineBreak::InfixNumeric
            | LineBreak::Glue
            | LineBreak::ZWJ
            | LineBreak::CombiningMark
            | LineBreak::WordJoiner
    )
}

/// Characters that never end a line.
fn is_leader(class: LineBreak) -> bool {
    matches!(
        class,
        LineBreak::OpenPunctuation | LineBreak::Glue | LineBreak::WordJoiner | LineBreak::ZWJ
    )
}

impl LineBreakClassifier for UnicodeLineBreakClassifier {
    fn can_break_before(&self, current: u32, previous: u32) -> bool {
        let current = line_break(current);
        let previous = line_break(previous);
        if is_follower(current) || is_leader(previous) {
            return false;
        }
        if matches!(previous, LineBreak::ZWSpace | LineBreak::BreakAfter) {
            return true;
        }
        self.breaks_freely(current) || self.breaks_freely(previous)
    }
}
