// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Syntax of a single inline tag.
//!
//! A tag looks like `<name>`, `<name=value>`, `<name=value attr=value ...>` or
//! `</name>`. Values may be quoted with `"` or `'`. `<#RRGGBB>` is shorthand for
//! `<color=#RRGGBB>`.

use alloc::string::String;

use smallvec::SmallVec;

use crate::{SourceChar, TagHasher, tag_hash};

/// Longest tag, in code points, that is recognized.
pub const MAX_TAG_LEN: usize = 128;

const COLOR: u32 = tag_hash("color");

/// Random access to a sequence of code points.
pub trait CodePoints {
    /// Number of code points.
    fn code_point_count(&self) -> usize;

    /// The code point at `index`.
    fn code_point(&self, index: usize) -> u32;
}

impl CodePoints for [u32] {
    fn code_point_count(&self) -> usize {
        self.len()
    }

    fn code_point(&self, index: usize) -> u32 {
        self[index]
    }
}

impl CodePoints for [SourceChar] {
    fn code_point_count(&self) -> usize {
        self.len()
    }

    fn code_point(&self, index: usize) -> u32 {
        self[index].unicode
    }
}

/// Unit suffix of a numeric value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LengthUnit {
    /// No suffix or `px`.
    #[default]
    Pixels,
    /// `em`, relative to the current font size.
    FontUnits,
    /// `%`.
    Percentage,
}

/// The value of a tag or attribute.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TagValue {
    /// No value was given.
    #[default]
    None,
    /// A number with an optional unit.
    Number {
        /// The numeric value, including its sign.
        value: f32,
        /// The unit suffix.
        unit: LengthUnit,
        /// Whether the value was written with a leading `+` or `-`.
        explicit_sign: bool,
    },
    /// A `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA` color as RGBA bytes.
    Color([u8; 4]),
    /// Any other value.
    Text {
        /// Case-insensitive hash of the text.
        hash: u32,
        /// The text as written.
        text: String,
    },
}

impl TagValue {
    /// Returns the number, if this is a numeric value.
    pub fn number(&self) -> Option<f32> {
        match self {
            Self::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Returns the text hash, if this is a text value.
    pub fn text_hash(&self) -> Option<u32> {
        match self {
            Self::Text { hash, .. } => Some(*hash),
            _ => None,
        }
    }

    /// Returns the text, if this is a text value.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A named attribute following the tag name.
#[derive(Clone, Debug, PartialEq)]
pub struct TagAttribute {
    /// Case-insensitive hash of the attribute name.
    pub name_hash: u32,
    /// The attribute value.
    pub value: TagValue,
}

/// A syntactically valid tag.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkupTag {
    /// Length of the tag in code points, including `<` and `>`.
    pub len: usize,
    /// Whether this is a `</name>` tag.
    pub is_closing: bool,
    /// Case-insensitive hash of the tag name.
    pub name_hash: u32,
    /// The value after `name=`.
    pub value: TagValue,
    /// Case-insensitive hash of the value text as written, without quotes.
    /// Zero if there is no value.
    pub value_hash: u32,
    /// The remaining attributes.
    pub attributes: SmallVec<[TagAttribute; 2]>,
}

impl MarkupTag {
    /// Returns the value of the attribute named by `name_hash`.
    pub fn attribute(&self, name_hash: u32) -> Option<&TagValue> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name_hash == name_hash)
            .map(|attribute| &attribute.value)
    }
}

fn is_space(unicode: u32) -> bool {
    matches!(unicode, 0x20 | 0x09)
}

struct Cursor<'a, S: ?Sized> {
    source: &'a S,
    pos: usize,
    end: usize,
}

impl<S: CodePoints + ?Sized> Cursor<'_, S> {
    fn peek(&self) -> Option<u32> {
        (self.pos < self.end).then(|| self.source.code_point(self.pos))
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }
    }

    /// Reads a name up to `=`, `>` or a space.
    fn name(&mut self) -> (u32, usize) {
        let start = self.pos;
        let mut hasher = TagHasher::new();
        while let Some(c) = self.peek() {
            if c == '=' as u32 || c == '>' as u32 || is_space(c) {
                break;
            }
            hasher.write(c);
            self.pos += 1;
        }
        (hasher.finish(), self.pos - start)
    }

    /// Reads a quoted or bare value, returning it with the hash of its text.
    fn value(&mut self) -> Option<(TagValue, u32)> {
        let quote = self.peek().filter(|&c| c == '"' as u32 || c == '\'' as u32);
        let mut text = String::new();
        if let Some(quote) = quote {
            self.pos += 1;
            loop {
                let c = self.peek()?;
                self.pos += 1;
                if c == quote {
                    break;
                }
                text.push(char::from_u32(c)?);
            }
        } else {
            while let Some(c) = self.peek() {
                if c == '>' as u32 || is_space(c) {
                    break;
                }
                text.push(char::from_u32(c)?);
                self.pos += 1;
            }
        }
        let hash = TagHasher::hash_str(&text);
        Some((classify(text, hash, quote.is_some()), hash))
    }
}

/// Parses the tag starting at `start`, which must be a `<`.
///
/// Returns `None` if the text at `start` is not a valid tag: it has no closing
/// `>` within [`MAX_TAG_LEN`] code points, contains a line break or a nested `<`,
/// or has an empty name.
pub fn parse_tag<S: CodePoints + ?Sized>(source: &S, start: usize) -> Option<MarkupTag> {
    let count = source.code_point_count();
    if start >= count || source.code_point(start) != '<' as u32 {
        return None;
    }
    let mut end = None;
    for i in start + 1..count.min(start + MAX_TAG_LEN) {
        let c = source.code_point(i);
        if c == '>' as u32 {
            end = Some(i);
            break;
        }
        if c == '<' as u32 || c == '\n' as u32 || c == '\r' as u32 {
            return None;
        }
    }
    let end = end?;
    let mut cursor = Cursor {
        source,
        pos: start + 1,
        end,
    };

    let is_closing = cursor.peek() == Some('/' as u32);
    if is_closing {
        cursor.pos += 1;
    }

    if !is_closing && cursor.peek() == Some('#' as u32) {
        let (value, value_hash) = cursor.value()?;
        if !matches!(value, TagValue::Color(_)) || cursor.pos != end {
            return None;
        }
        return Some(MarkupTag {
            len: end + 1 - start,
            is_closing: false,
            name_hash: COLOR,
            value,
            value_hash,
            attributes: SmallVec::new(),
        });
    }

    let (name_hash, name_len) = cursor.name();
    if name_len == 0 {
        return None;
    }
    let mut value = TagValue::None;
    let mut value_hash = 0;
    if cursor.peek() == Some('=' as u32) {
        cursor.pos += 1;
        (value, value_hash) = cursor.value()?;
    }
    let mut attributes = SmallVec::new();
    loop {
        cursor.skip_spaces();
        if cursor.pos >= end {
            break;
        }
        let (attribute_hash, attribute_len) = cursor.name();
        if attribute_len == 0 {
            return None;
        }
        let mut attribute_value = TagValue::None;
        if cursor.peek() == Some('=' as u32) {
            cursor.pos += 1;
            attribute_value = cursor.value()?.0;
        }
        attributes.push(TagAttribute {
            name_hash: attribute_hash,
            value: attribute_value,
        });
    }
    if cursor.pos != end {
        return None;
    }
    Some(MarkupTag {
        len: end + 1 - start,
        is_closing,
        name_hash,
        value,
        value_hash,
        attributes,
    })
}

fn classify(text: String, hash: u32, quoted: bool) -> TagValue {
    if let Some(hex) = text.strip_prefix('#') {
        if let Some(color) = parse_hex_color(hex) {
            return TagValue::Color(color);
        }
    }
    if !quoted {
        if let Some(number) = parse_number(&text) {
            return number;
        }
    }
    TagValue::Text { hash, text }
}

fn parse_hex_color(hex: &str) -> Option<[u8; 4]> {
    let digits: SmallVec<[u8; 8]> = hex
        .chars()
        .map(|c| c.to_digit(16).and_then(|d| u8::try_from(d).ok()))
        .collect::<Option<_>>()?;
    let pair = |i: usize| digits[i] << 4 | digits[i + 1];
    let single = |i: usize| digits[i] << 4 | digits[i];
    match digits.len() {
        3 => Some([single(0), single(1), single(2), 0xFF]),
        4 => Some([single(0), single(1), single(2), single(3)]),
        6 => Some([pair(0), pair(2), pair(4), 0xFF]),
        8 => Some([pair(0), pair(2), pair(4), pair(6)]),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<TagValue> {
    let (unit, body) = if let Some(body) = text.strip_suffix('%') {
        (LengthUnit::Percentage, body)
    } else if let Some(body) = text
        .strip_suffix("em")
        .or_else(|| text.strip_suffix("EM"))
    {
        (LengthUnit::FontUnits, body)
    } else if let Some(body) = text
        .strip_suffix("px")
        .or_else(|| text.strip_suffix("PX"))
    {
        (LengthUnit::Pixels, body)
    } else {
        (LengthUnit::Pixels, text)
    };
    let (negative, explicit_sign, digits) = match body.as_bytes().first() {
        Some(b'-') => (true, true, &body[1..]),
        Some(b'+') => (false, true, &body[1..]),
        _ => (false, false, body),
    };
    if digits.is_empty() {
        return None;
    }
    let mut value = 0.0_f32;
    let mut scale = 0.0_f32;
    let mut any_digit = false;
    for byte in digits.bytes() {
        match byte {
            b'0'..=b'9' => {
                let digit = f32::from(byte - b'0');
                any_digit = true;
                if scale == 0.0 {
                    value = value * 10.0 + digit;
                } else {
                    value += digit * scale;
                    scale *= 0.1;
                }
            }
            b'.' if scale == 0.0 => scale = 0.1,
            _ => return None,
        }
    }
    if !any_digit {
        return None;
    }
    Some(TagValue::Number {
        value: if negative { -value } else { value },
        unit,
        explicit_sign,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn parse(text: &str) -> Option<MarkupTag> {
        let code_points: Vec<u32> = text.chars().map(|c| c as u32).collect();
        parse_tag(code_points.as_slice(), 0)
    }

    #[test]
    fn simple_tags() {
        let tag = parse("<b>").unwrap();
        assert_eq!(tag.len, 3);
        assert!(!tag.is_closing);
        assert_eq!(tag.name_hash, tag_hash("b"));
        assert_eq!(tag.value, TagValue::None);

        let tag = parse("</B>rest").unwrap();
        assert_eq!(tag.len, 4);
        assert!(tag.is_closing);
        assert_eq!(tag.name_hash, tag_hash("b"));
    }

    #[test]
    fn numeric_values() {
        let tag = parse("<size=150%>").unwrap();
        assert_eq!(
            tag.value,
            TagValue::Number {
                value: 150.0,
                unit: LengthUnit::Percentage,
                explicit_sign: false
            }
        );
        let tag = parse("<size=-2.5em>").unwrap();
        assert_eq!(
            tag.value,
            TagValue::Number {
                value: -2.5,
                unit: LengthUnit::FontUnits,
                explicit_sign: true
            }
        );
        assert_eq!(parse("<voffset=12px>").unwrap().value.number(), Some(12.0));
    }

    #[test]
    fn colors() {
        assert_eq!(
            parse("<color=#FF8000>").unwrap().value,
            TagValue::Color([0xFF, 0x80, 0x00, 0xFF])
        );
        let tag = parse("<#f008>").unwrap();
        assert_eq!(tag.name_hash, tag_hash("color"));
        assert_eq!(tag.value, TagValue::Color([0xFF, 0x00, 0x00, 0x88]));
        assert!(parse("<#12345>").is_none());
    }

    #[test]
    fn text_values_and_attributes() {
        let tag = parse("<sprite name=\"smile face\" index=3>").unwrap();
        assert_eq!(tag.name_hash, tag_hash("sprite"));
        assert_eq!(tag.value, TagValue::None);
        assert_eq!(
            tag.attribute(tag_hash("name")).and_then(TagValue::text),
            Some("smile face")
        );
        assert_eq!(
            tag.attribute(tag_hash("index")).and_then(TagValue::number),
            Some(3.0)
        );

        let tag = parse("<link=\"https://example.com\">").unwrap();
        assert_eq!(tag.value.text(), Some("https://example.com"));

        let tag = parse("<align=Center>").unwrap();
        assert_eq!(tag.value.text_hash(), Some(tag_hash("center")));
    }

    #[test]
    fn rejects_malformed_tags() {
        assert!(parse("<b").is_none());
        assert!(parse("<>").is_none());
        assert!(parse("</>").is_none());
        assert!(parse("<b\n>").is_none());
        assert!(parse("<a<b>").is_none());
        assert!(parse("<color=\"red>").is_none());
        let mut long = String::from("<");
        long.push_str(&"x".repeat(MAX_TAG_LEN));
        long.push('>');
        assert!(parse(&long).is_none());
    }
}
