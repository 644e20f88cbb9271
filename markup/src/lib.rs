// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Markup is the front end of rich text layout: it flattens text with inline
//! tags into a buffer of code points and parses the syntax of individual tags.
//!
//! - [`MarkupTokenizer`] decodes UTF-8 or UTF-16 input, backslash escapes and the
//!   tags that change the length of the stream (`<br>`, `<style=...>`, ...).
//! - [`parse_tag`] parses one `<name=value attr=value>` tag into a [`MarkupTag`].
//! - [`StyleSheet`] holds the named [`TextStyle`]s that `<style>` tags expand to.
//!
//! Tag names and values are compared by case-insensitive hash, see [`tag_hash`].
//!
//! ## Features
//!
//! - `std` (enabled by default): This is currently unused and is provided for forward compatibility.

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
#![no_std]

extern crate alloc;

mod hash;
mod style_sheet;
mod tag;
mod tokenizer;

pub use crate::hash::{TagHasher, tag_hash};
pub use crate::style_sheet::{StyleSheet, TextStyle};
pub use crate::tag::{
    CodePoints, LengthUnit, MAX_TAG_LEN, MarkupTag, TagAttribute, TagValue, parse_tag,
};
pub use crate::tokenizer::{
    CharOrigin, MAX_STYLE_DEPTH, MarkupTokenizer, SourceChar, TokenizerOptions,
};
