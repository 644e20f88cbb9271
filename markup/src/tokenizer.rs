// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattening of raw text into a code point buffer.

use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::{StyleSheet, parse_tag, tag_hash};

/// Deepest nesting of `<style>` expansions. Deeper style tags stay literal text.
pub const MAX_STYLE_DEPTH: usize = 16;

const BR: u32 = tag_hash("br");
const NBSP: u32 = tag_hash("nbsp");
const ZWSP: u32 = tag_hash("zwsp");
const ZWJ: u32 = tag_hash("zwj");
const SHY: u32 = tag_hash("shy");
const STYLE: u32 = tag_hash("style");
const NOPARSE: u32 = tag_hash("noparse");

/// Where a tokenized code point came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharOrigin {
    /// Directly from the input text.
    Input,
    /// From the expansion of a named style, `depth` levels deep.
    Style {
        /// Nesting depth of the expansion, starting at 1.
        depth: u8,
    },
}

/// One code point of the tokenized buffer.
///
/// Source positions are measured in UTF-16 code units of the input, whichever
/// encoding the input was given in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceChar {
    /// The code point.
    pub unicode: u32,
    /// Offset of the first input unit this code point was produced from.
    pub source_index: u32,
    /// Number of input units consumed. Zero for code points spliced in from a style.
    pub source_len: u32,
    /// Where the code point came from.
    pub origin: CharOrigin,
}

/// Options controlling tokenization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Expand `<br>`, `<style>` and the other shorthand tags.
    pub rich_text: bool,
    /// Decode backslash escapes.
    pub parse_control_characters: bool,
    /// Name hash of a style wrapped around the whole text.
    pub default_style: Option<u32>,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            rich_text: true,
            parse_control_characters: true,
            default_style: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Frame {
    Input {
        pos: usize,
    },
    Opening {
        style: usize,
        pos: usize,
        anchor: u32,
        depth: u8,
    },
    Closing {
        style: usize,
        pos: usize,
        anchor: u32,
        depth: u8,
    },
}

impl Frame {
    fn pos_mut(&mut self) -> &mut usize {
        match self {
            Self::Input { pos } | Self::Opening { pos, .. } | Self::Closing { pos, .. } => pos,
        }
    }
}

/// Converts text with inline markup into a flat buffer of [`SourceChar`]s.
///
/// Only tags that change the length of the stream are handled here: `<br>`,
/// `<nbsp>`, `<zwsp>`, `<zwj>`, `<shy>` and the `<style>` family. Every other tag
/// is left in the buffer as ordinary characters for the layout engine to
/// interpret. Style expansion runs on an explicit stack of frames, so nesting is
/// bounded by [`MAX_STYLE_DEPTH`] rather than the call stack.
///
/// The tokenizer keeps its buffers between calls.
#[derive(Clone, Debug, Default)]
pub struct MarkupTokenizer {
    input: Vec<u32>,
    offsets: Vec<u32>,
    output: Vec<SourceChar>,
    frames: SmallVec<[Frame; 8]>,
    open_styles: SmallVec<[(u8, usize); MAX_STYLE_DEPTH]>,
}

impl MarkupTokenizer {
    /// Creates a tokenizer with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The buffer produced by the last call.
    pub fn chars(&self) -> &[SourceChar] {
        &self.output
    }

    /// Tokenizes UTF-8 text.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "len_utf16 is at most 2"
    )]
    pub fn tokenize_str(
        &mut self,
        text: &str,
        styles: &StyleSheet,
        options: TokenizerOptions,
    ) -> &[SourceChar] {
        self.input.clear();
        self.offsets.clear();
        let mut offset = 0_u32;
        for c in text.chars() {
            self.input.push(c as u32);
            self.offsets.push(offset);
            offset = offset.saturating_add(c.len_utf16() as u32);
        }
        self.offsets.push(offset);
        self.run(styles, options);
        &self.output
    }

    /// Tokenizes UTF-16 text. Unpaired surrogates become U+FFFD.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "len_utf16 is at most 2"
    )]
    pub fn tokenize_utf16(
        &mut self,
        text: &[u16],
        styles: &StyleSheet,
        options: TokenizerOptions,
    ) -> &[SourceChar] {
        self.input.clear();
        self.offsets.clear();
        let mut offset = 0_u32;
        for decoded in char::decode_utf16(text.iter().copied()) {
            let (c, len) = match decoded {
                Ok(c) => (c, c.len_utf16() as u32),
                Err(_) => (char::REPLACEMENT_CHARACTER, 1),
            };
            self.input.push(c as u32);
            self.offsets.push(offset);
            offset = offset.saturating_add(len);
        }
        self.offsets.push(offset);
        self.run(styles, options);
        &self.output
    }

    fn run(&mut self, styles: &StyleSheet, options: TokenizerOptions) {
        let Self {
            input,
            offsets,
            output,
            frames,
            open_styles,
        } = self;
        output.clear();
        frames.clear();
        open_styles.clear();
        output.reserve(input.len());
        let total = offsets.last().copied().unwrap_or(0);

        if !options.rich_text && !options.parse_control_characters {
            for (pos, &unicode) in input.iter().enumerate() {
                output.push(SourceChar {
                    unicode,
                    source_index: offsets[pos],
                    source_len: offsets[pos + 1] - offsets[pos],
                    origin: CharOrigin::Input,
                });
            }
            return;
        }

        let default_style = options
            .default_style
            .filter(|_| options.rich_text)
            .and_then(|hash| styles.index_of(hash));
        if let Some(style) = default_style {
            frames.push(Frame::Closing {
                style,
                pos: 0,
                anchor: total,
                depth: 1,
            });
        }
        frames.push(Frame::Input { pos: 0 });
        if let Some(style) = default_style {
            frames.push(Frame::Opening {
                style,
                pos: 0,
                anchor: 0,
                depth: 1,
            });
        }

        let mut noparse = false;
        while let Some(frame) = frames.last().copied() {
            let (stream, pos, anchor, depth): (&[u32], usize, u32, u8) = match frame {
                Frame::Input { pos } => (
                    input.as_slice(),
                    pos,
                    offsets.get(pos).copied().unwrap_or(total),
                    0,
                ),
                Frame::Opening {
                    style,
                    pos,
                    anchor,
                    depth,
                } => (
                    styles.style(style).map_or(&[][..], |s| s.opening()),
                    pos,
                    anchor,
                    depth,
                ),
                Frame::Closing {
                    style,
                    pos,
                    anchor,
                    depth,
                } => (
                    styles.style(style).map_or(&[][..], |s| s.closing()),
                    pos,
                    anchor,
                    depth,
                ),
            };
            if pos >= stream.len() {
                frames.pop();
                continue;
            }

            let mut unicode = Some(stream[pos]);
            let mut consumed = 1;
            let mut push = None;

            if options.parse_control_characters && stream[pos] == '\\' as u32 {
                if let Some((escaped, len)) = decode_escape(stream, pos) {
                    unicode = Some(escaped);
                    consumed = len;
                }
            } else if options.rich_text && stream[pos] == '<' as u32 {
                if let Some(tag) = parse_tag(stream, pos) {
                    if noparse {
                        if tag.is_closing && tag.name_hash == NOPARSE {
                            noparse = false;
                        }
                    } else if tag.is_closing {
                        if tag.name_hash == STYLE {
                            // A closing tag pairs with the latest style opened at the same depth.
                            unicode = None;
                            consumed = tag.len;
                            let opened = open_styles.iter().rposition(|(level, _)| *level == depth);
                            if let Some(index) = opened {
                                let (_, style) = open_styles.remove(index);
                                push = Some(Frame::Closing {
                                    style,
                                    pos: 0,
                                    anchor,
                                    depth: depth + 1,
                                });
                            }
                        }
                    } else {
                        let shorthand = match tag.name_hash {
                            BR => Some('\n' as u32),
                            NBSP => Some(0x00A0),
                            ZWSP => Some(0x200B),
                            ZWJ => Some(0x200D),
                            SHY => Some(0x00AD),
                            _ => None,
                        };
                        if let Some(shorthand) = shorthand {
                            unicode = Some(shorthand);
                            consumed = tag.len;
                        } else if tag.name_hash == NOPARSE {
                            noparse = true;
                        } else if tag.name_hash == STYLE && usize::from(depth) < MAX_STYLE_DEPTH {
                            if let Some(style) = styles.index_of(tag.value_hash) {
                                unicode = None;
                                consumed = tag.len;
                                open_styles.push((depth, style));
                                push = Some(Frame::Opening {
                                    style,
                                    pos: 0,
                                    anchor,
                                    depth: depth + 1,
                                });
                            }
                        }
                    }
                }
            }

            if let Some(unicode) = unicode {
                let (source_index, source_len, origin) = match frame {
                    Frame::Input { .. } => (
                        offsets[pos],
                        offsets[pos + consumed] - offsets[pos],
                        CharOrigin::Input,
                    ),
                    _ => (anchor, 0, CharOrigin::Style { depth }),
                };
                output.push(SourceChar {
                    unicode,
                    source_index,
                    source_len,
                    origin,
                });
            }
            if let Some(top) = frames.last_mut() {
                *top.pos_mut() += consumed;
            }
            if let Some(frame) = push {
                frames.push(frame);
            }
        }
    }
}

/// Decodes the escape sequence starting with the backslash at `pos`, returning
/// the code point and the number of code points consumed.
fn decode_escape(stream: &[u32], pos: usize) -> Option<(u32, usize)> {
    let next = char::from_u32(*stream.get(pos + 1)?)?;
    let simple = match next {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        'v' => Some('\u{0B}'),
        _ => None,
    };
    if let Some(c) = simple {
        return Some((c as u32, 2));
    }
    let digits = match next {
        'u' => 4,
        'U' => 8,
        _ => return None,
    };
    let hex = stream.get(pos + 2..pos + 2 + digits)?;
    let mut value = 0_u32;
    for &unit in hex {
        value = value * 16 + char::from_u32(unit)?.to_digit(16)?;
    }
    char::from_u32(value).map(|c| (c as u32, 2 + digits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextStyle;
    use alloc::string::String;

    fn text_of(chars: &[SourceChar]) -> String {
        chars
            .iter()
            .map(|c| char::from_u32(c.unicode).unwrap())
            .collect()
    }

    fn tokenize(text: &str, styles: &StyleSheet) -> Vec<SourceChar> {
        MarkupTokenizer::new()
            .tokenize_str(text, styles, TokenizerOptions::default())
            .to_vec()
    }

    #[test]
    fn plain_text_passes_through() {
        let chars = tokenize("héllo", &StyleSheet::new());
        assert_eq!(text_of(&chars), "héllo");
        assert_eq!(chars[4].source_index, 4);
        assert!(chars.iter().all(|c| c.source_len == 1));
    }

    #[test]
    fn other_tags_are_left_alone() {
        let chars = tokenize("<b>x</b> <unknown>", &StyleSheet::new());
        assert_eq!(text_of(&chars), "<b>x</b> <unknown>");
    }

    #[test]
    fn shorthand_tags_change_length() {
        let chars = tokenize("a<br>b<nbsp>c<zwsp><ZWJ><shy>", &StyleSheet::new());
        assert_eq!(text_of(&chars), "a\nb\u{A0}c\u{200B}\u{200D}\u{AD}");
        assert_eq!(chars[1].source_index, 1);
        assert_eq!(chars[1].source_len, 4);
        assert_eq!(chars[2].source_index, 5);
    }

    #[test]
    fn escapes_need_control_parsing() {
        let styles = StyleSheet::new();
        let chars = tokenize(r"a\nb\té\U0001F600\v\q", &styles);
        assert_eq!(text_of(&chars), "a\nb\té\u{1F600}\u{0B}\\q");
        assert_eq!(chars[1].source_len, 2);
        assert_eq!(chars[5].source_len, 10);

        let mut tokenizer = MarkupTokenizer::new();
        let options = TokenizerOptions {
            parse_control_characters: false,
            ..TokenizerOptions::default()
        };
        let chars = tokenizer.tokenize_str(r"a\nb", &styles, options);
        assert_eq!(text_of(chars), r"a\nb");
    }

    #[test]
    fn invalid_escapes_stay_literal() {
        let chars = tokenize(r"\u12G4\U0011FFFF\", &StyleSheet::new());
        assert_eq!(text_of(&chars), r"\u12G4\U0011FFFF\");
    }

    #[test]
    fn utf16_surrogates_are_decoded() {
        let units: Vec<u16> = "a😀b".encode_utf16().chain([0xD800, 0x63]).collect();
        let mut tokenizer = MarkupTokenizer::new();
        let chars = tokenizer.tokenize_utf16(&units, &StyleSheet::new(), TokenizerOptions::default());
        assert_eq!(text_of(chars), "a😀b\u{FFFD}c");
        assert_eq!(chars[1].source_len, 2);
        assert_eq!(chars[2].source_index, 3);
        assert_eq!(chars[3].source_index, 4);
        assert_eq!(chars[4].source_index, 5);
    }

    #[test]
    fn styles_are_spliced() {
        let mut styles = StyleSheet::new();
        styles.insert(TextStyle::new("H1", "<size=2em><b>", "</b></size>"));
        let chars = tokenize("<style=h1>X</style>Y", &styles);
        assert_eq!(text_of(&chars), "<size=2em><b>X</b></size>Y");
        assert_eq!(chars[0].origin, CharOrigin::Style { depth: 1 });
        assert_eq!(chars[0].source_len, 0);
        let x = chars.iter().find(|c| c.unicode == 'X' as u32).unwrap();
        assert_eq!(x.source_index, 10);
        assert_eq!(x.origin, CharOrigin::Input);
    }

    #[test]
    fn styles_nest_inside_styles() {
        let mut styles = StyleSheet::new();
        styles.insert(TextStyle::new("inner", "<i>", "</i>"));
        styles.insert(TextStyle::new("outer", "<b><style=inner>", "</style></b>"));
        let chars = tokenize("<style=outer>x</style>", &styles);
        assert_eq!(text_of(&chars), "<b><i>x</i></b>");
        assert_eq!(chars[3].origin, CharOrigin::Style { depth: 2 });
    }

    #[test]
    fn recursive_styles_are_bounded() {
        let mut styles = StyleSheet::new();
        styles.insert(TextStyle::new("loop", "<style=loop>a", ""));
        let chars = tokenize("<style=loop>", &styles);
        let expected: String = core::iter::once("<style=loop>")
            .chain(core::iter::repeat_n("a", MAX_STYLE_DEPTH))
            .collect();
        assert_eq!(text_of(&chars), expected);
    }

    #[test]
    fn unknown_and_stray_styles() {
        let chars = tokenize("<style=nope>a</style>b", &StyleSheet::new());
        assert_eq!(text_of(&chars), "<style=nope>ab");
    }

    #[test]
    fn default_style_wraps_text() {
        let mut styles = StyleSheet::new();
        styles.insert(TextStyle::new("Normal", "<u>", "</u>"));
        let options = TokenizerOptions {
            default_style: Some(crate::TagHasher::hash_str("normal")),
            ..TokenizerOptions::default()
        };
        let mut tokenizer = MarkupTokenizer::new();
        let chars = tokenizer.tokenize_str("hi", &styles, options);
        assert_eq!(text_of(chars), "<u>hi</u>");
        assert_eq!(chars.last().unwrap().source_index, 2);
    }

    #[test]
    fn noparse_keeps_shorthands() {
        let chars = tokenize("<noparse><br></noparse><br>", &StyleSheet::new());
        assert_eq!(text_of(&chars), "<noparse><br></noparse>\n");
    }

    #[test]
    fn plain_mode_is_verbatim() {
        let options = TokenizerOptions {
            rich_text: false,
            parse_control_characters: false,
            default_style: None,
        };
        let mut tokenizer = MarkupTokenizer::new();
        let chars = tokenizer.tokenize_str(r"<br>\n", &StyleSheet::new(), options);
        assert_eq!(text_of(chars), r"<br>\n");
    }
}
