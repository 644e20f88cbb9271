// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Meaning of the inline tags left in the stream by the tokenizer.

use glyph_atlas::FontId;
use markup::{tag_hash, LengthUnit, MarkupTag, TagValue};
use peniko::color::{parse_color, Srgb};

use crate::{Color, FontRegistry, FontStyle, FontWeight, HorizontalAlignment, SpriteSheetId};

/// A length as written in a tag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Length {
    pub(crate) value: f32,
    pub(crate) unit: LengthUnit,
    /// Written with an explicit sign, so it adjusts rather than replaces.
    pub(crate) relative: bool,
}

impl Length {
    fn from_value(value: &TagValue) -> Option<Self> {
        match *value {
            TagValue::Number {
                value,
                unit,
                explicit_sign,
            } => Some(Self {
                value,
                unit,
                relative: explicit_sign,
            }),
            _ => None,
        }
    }

    /// Converts to layout units. `em` is the size of one em, `percent_base` the
    /// size of 100%.
    pub(crate) fn resolve(self, em: f32, percent_base: f32) -> f32 {
        match self.unit {
            LengthUnit::Pixels => self.value,
            LengthUnit::FontUnits => self.value * em,
            LengthUnit::Percentage => self.value * percent_base / 100.0,
        }
    }
}

/// Attributes kept on a stack while their tag is open.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Attr {
    Size(Length),
    Color(Color),
    Alpha(f32),
    VOffset(Length),
    CSpace(Length),
    MSpace(Length),
    Indent(Length),
    LineIndent(Length),
    LineHeight(Length),
    Margin {
        left: Option<Length>,
        right: Option<Length>,
    },
    Align(HorizontalAlignment),
    Weight(FontWeight),
    /// `None` returns to the primary font.
    Font(Option<FontId>),
    Width(Length),
    Rotate(f32),
    Link(String),
}

/// The stack a closing tag pops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttrKind {
    Size,
    Color,
    Alpha,
    VOffset,
    CSpace,
    MSpace,
    Indent,
    LineIndent,
    LineHeight,
    Margin,
    Align,
    Weight,
    Font,
    Width,
    Rotate,
    Link,
}

/// An inline sprite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SpriteRef {
    pub(crate) sheet: SpriteSheetId,
    pub(crate) index: usize,
    /// Multiply by the current text color.
    pub(crate) tint: bool,
    pub(crate) color: Option<Color>,
}

/// What a recognized tag does.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TagOp {
    OpenFlags(FontStyle),
    CloseFlags(FontStyle),
    Italic { angle: Option<f32> },
    CloseItalic,
    Highlight(Option<Color>),
    CloseHighlight,
    Push(Attr),
    Pop(AttrKind),
    /// Moves the pen to an absolute position on the line.
    Pos(Length),
    /// Advances the pen.
    Space(Length),
    NoBreak(bool),
    /// Everything up to `</noparse>` is literal text.
    NoParse,
    Sprite(SpriteRef),
}

const B: u32 = tag_hash("b");
const I: u32 = tag_hash("i");
const U: u32 = tag_hash("u");
const S: u32 = tag_hash("s");
const SUP: u32 = tag_hash("sup");
const SUB: u32 = tag_hash("sub");
const UPPERCASE: u32 = tag_hash("uppercase");
const ALLCAPS: u32 = tag_hash("allcaps");
const LOWERCASE: u32 = tag_hash("lowercase");
const SMALLCAPS: u32 = tag_hash("smallcaps");
const MARK: u32 = tag_hash("mark");
const NOPARSE: u32 = tag_hash("noparse");
const NOBR: u32 = tag_hash("nobr");
const COLOR: u32 = tag_hash("color");
const ALPHA: u32 = tag_hash("alpha");
const SIZE: u32 = tag_hash("size");
const VOFFSET: u32 = tag_hash("voffset");
const CSPACE: u32 = tag_hash("cspace");
const MSPACE: u32 = tag_hash("mspace");
const INDENT: u32 = tag_hash("indent");
const LINE_INDENT: u32 = tag_hash("line-indent");
const LINE_HEIGHT: u32 = tag_hash("line-height");
const MARGIN: u32 = tag_hash("margin");
const MARGIN_LEFT: u32 = tag_hash("margin-left");
const MARGIN_RIGHT: u32 = tag_hash("margin-right");
const ALIGN: u32 = tag_hash("align");
const FONT_WEIGHT: u32 = tag_hash("font-weight");
const FONT: u32 = tag_hash("font");
const POS: u32 = tag_hash("pos");
const SPACE: u32 = tag_hash("space");
const WIDTH: u32 = tag_hash("width");
const ROTATE: u32 = tag_hash("rotate");
const LINK: u32 = tag_hash("link");
const SPRITE: u32 = tag_hash("sprite");

const ANGLE: u32 = tag_hash("angle");
const NAME: u32 = tag_hash("name");
const INDEX: u32 = tag_hash("index");
const TINT: u32 = tag_hash("tint");

const LEFT: u32 = tag_hash("left");
const CENTER: u32 = tag_hash("center");
const RIGHT: u32 = tag_hash("right");
const JUSTIFIED: u32 = tag_hash("justified");
const FLUSH: u32 = tag_hash("flush");
const DEFAULT: u32 = tag_hash("default");

fn flag(name_hash: u32) -> Option<FontStyle> {
    Some(match name_hash {
        B => FontStyle::BOLD,
        U => FontStyle::UNDERLINE,
        S => FontStyle::STRIKETHROUGH,
        SUP => FontStyle::SUPERSCRIPT,
        SUB => FontStyle::SUBSCRIPT,
        UPPERCASE | ALLCAPS => FontStyle::UPPERCASE,
        LOWERCASE => FontStyle::LOWERCASE,
        SMALLCAPS => FontStyle::SMALLCAPS,
        _ => return None,
    })
}

fn attr_kind(name_hash: u32) -> Option<AttrKind> {
    Some(match name_hash {
        SIZE => AttrKind::Size,
        COLOR => AttrKind::Color,
        ALPHA => AttrKind::Alpha,
        VOFFSET => AttrKind::VOffset,
        CSPACE => AttrKind::CSpace,
        MSPACE => AttrKind::MSpace,
        INDENT => AttrKind::Indent,
        LINE_INDENT => AttrKind::LineIndent,
        LINE_HEIGHT => AttrKind::LineHeight,
        MARGIN | MARGIN_LEFT | MARGIN_RIGHT => AttrKind::Margin,
        ALIGN => AttrKind::Align,
        FONT_WEIGHT => AttrKind::Weight,
        FONT => AttrKind::Font,
        WIDTH => AttrKind::Width,
        ROTATE => AttrKind::Rotate,
        LINK => AttrKind::Link,
        _ => return None,
    })
}

fn color(value: &TagValue) -> Option<Color> {
    match value {
        TagValue::Color([r, g, b, a]) => Some(Color::from_rgba8(*r, *g, *b, *a)),
        TagValue::Text { text, .. } => parse_color(text)
            .ok()
            .map(|color| color.to_alpha_color::<Srgb>()),
        _ => None,
    }
}

fn alpha(value: &TagValue) -> Option<f32> {
    match value {
        TagValue::Text { text, .. } => {
            let hex = text.strip_prefix('#')?;
            if hex.len() != 2 {
                return None;
            }
            u8::from_str_radix(hex, 16)
                .ok()
                .map(|alpha| f32::from(alpha) / 255.0)
        }
        TagValue::Number { value, unit, .. } => Some(match unit {
            LengthUnit::Percentage => value / 100.0,
            _ if *value <= 1.0 => *value,
            _ => value / 255.0,
        })
        .map(|alpha| alpha.clamp(0.0, 1.0)),
        _ => None,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the weight is clamped to the 1..=1000 range first"
)]
fn weight(value: &TagValue) -> Option<FontWeight> {
    let value = value.number()?;
    Some(FontWeight(value.clamp(1.0, 1000.0) as u16))
}

fn alignment(value: &TagValue) -> Option<HorizontalAlignment> {
    Some(match value.text_hash()? {
        LEFT => HorizontalAlignment::Left,
        CENTER => HorizontalAlignment::Center,
        RIGHT => HorizontalAlignment::Right,
        JUSTIFIED => HorizontalAlignment::Justified,
        FLUSH => HorizontalAlignment::Flush,
        _ => return None,
    })
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "sprite indices are small non-negative integers"
)]
fn sprite(tag: &MarkupTag, registry: &FontRegistry) -> Option<SpriteRef> {
    let named_sheet = match &tag.value {
        TagValue::Text { .. } => Some(registry.sprite_sheet_by_name_hash(tag.value_hash)?),
        _ => None,
    };
    let sheet_id = named_sheet.or_else(|| registry.default_sprite_sheet())?;
    let sheet = registry.sprite_sheet(sheet_id)?;
    let index = if let Some(name) = tag.attribute(NAME) {
        sheet.index_by_name(name.text()?)?
    } else {
        let index = tag
            .attribute(INDEX)
            .and_then(TagValue::number)
            .or_else(|| tag.value.number())?;
        if index < 0.0 {
            return None;
        }
        index as usize
    };
    sheet.sprite(index)?;
    Some(SpriteRef {
        sheet: sheet_id,
        index,
        tint: tag
            .attribute(TINT)
            .and_then(TagValue::number)
            .is_some_and(|tint| tint != 0.0),
        color: tag.attribute(COLOR).and_then(color),
    })
}

/// Interprets a parsed tag.
///
/// Returns `None` for tags that should be rendered as literal text: unknown names
/// and known names with unusable values. Closing tags of known names are always
/// accepted, even when nothing is open.
pub(crate) fn interpret(tag: &MarkupTag, registry: &FontRegistry) -> Option<TagOp> {
    let name = tag.name_hash;
    if tag.is_closing {
        if let Some(flags) = flag(name) {
            return Some(TagOp::CloseFlags(flags));
        }
        return match name {
            I => Some(TagOp::CloseItalic),
            MARK => Some(TagOp::CloseHighlight),
            NOBR => Some(TagOp::NoBreak(false)),
            _ => attr_kind(name).map(TagOp::Pop),
        };
    }
    if let Some(flags) = flag(name) {
        return Some(TagOp::OpenFlags(flags));
    }
    let value = &tag.value;
    let length = || Length::from_value(value);
    let attr = match name {
        I => {
            return Some(TagOp::Italic {
                angle: tag.attribute(ANGLE).and_then(TagValue::number),
            })
        }
        MARK => {
            return match value {
                TagValue::None => Some(TagOp::Highlight(None)),
                _ => color(value).map(|color| TagOp::Highlight(Some(color))),
            }
        }
        NOPARSE => return Some(TagOp::NoParse),
        NOBR => return Some(TagOp::NoBreak(true)),
        POS => return length().map(TagOp::Pos),
        SPACE => return length().map(TagOp::Space),
        SPRITE => return sprite(tag, registry).map(TagOp::Sprite),
        SIZE => Attr::Size(length()?),
        COLOR => Attr::Color(color(value)?),
        ALPHA => Attr::Alpha(alpha(value)?),
        VOFFSET => Attr::VOffset(length()?),
        CSPACE => Attr::CSpace(length()?),
        MSPACE => Attr::MSpace(length()?),
        INDENT => Attr::Indent(length()?),
        LINE_INDENT => Attr::LineIndent(length()?),
        LINE_HEIGHT => Attr::LineHeight(length()?),
        MARGIN => {
            let margin = length()?;
            Attr::Margin {
                left: Some(margin),
                right: Some(margin),
            }
        }
        MARGIN_LEFT => Attr::Margin {
            left: Some(length()?),
            right: None,
        },
        MARGIN_RIGHT => Attr::Margin {
            left: None,
            right: Some(length()?),
        },
        ALIGN => Attr::Align(alignment(value)?),
        FONT_WEIGHT => Attr::Weight(weight(value)?),
        FONT => match registry.font_by_name_hash(tag.value_hash) {
            Some(font) => Attr::Font(Some(font)),
            None if tag.value_hash == DEFAULT => Attr::Font(None),
            None => return None,
        },
        WIDTH => Attr::Width(length()?),
        ROTATE => Attr::Rotate(value.number()?),
        LINK => Attr::Link(match value {
            TagValue::None => String::new(),
            TagValue::Text { text, .. } => text.clone(),
            _ => tag_text(value),
        }),
        _ => return None,
    };
    Some(TagOp::Push(attr))
}

fn tag_text(value: &TagValue) -> String {
    match value {
        TagValue::Number { value, .. } => format!("{value}"),
        TagValue::Color([r, g, b, a]) => format!("#{r:02X}{g:02X}{b:02X}{a:02X}"),
        TagValue::Text { text, .. } => text.clone(),
        TagValue::None => String::new(),
    }
}
