// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use richtext::{Alignment, HorizontalAlignment, VerticalAlignment};

use crate::test_name;
use crate::util::{assert_close, TestEnv};

fn horizontal(env: &mut TestEnv, text: &str, width: f32, align: HorizontalAlignment) -> Vec<f32> {
    let mut settings = env.settings(text);
    settings.container_width = width;
    settings.alignment.horizontal = align;
    env.generate(&settings)
        .characters()
        .iter()
        .map(|c| c.x)
        .collect()
}

fn first_baseline(env: &mut TestEnv, vertical: VerticalAlignment) -> f32 {
    let mut settings = env.settings("a");
    settings.alignment = Alignment::new(HorizontalAlignment::Left, vertical);
    env.generate(&settings).lines()[0].baseline
}

#[test]
fn align_center_and_right() {
    let mut env = TestEnv::new(test_name!());
    assert_close(horizontal(&mut env, "ab", 200.0, HorizontalAlignment::Center)[0], 94.0);
    assert_close(horizontal(&mut env, "ab", 200.0, HorizontalAlignment::Right)[0], 188.0);

    let mut settings = env.settings("ab");
    settings.alignment.horizontal = HorizontalAlignment::Right;
    let layout = env.generate(&settings);
    assert_close(layout.lines()[0].offset, 188.0);
    assert_eq!(layout.lines()[0].alignment, HorizontalAlignment::Right);
}

#[test]
fn align_trailing_spaces_are_ignored() {
    let mut env = TestEnv::new(test_name!());
    // The hanging space does not push the text left.
    assert_close(horizontal(&mut env, "ab  ", 200.0, HorizontalAlignment::Right)[0], 188.0);
}

#[test]
fn align_justified_stretches_wrapped_lines() {
    let mut env = TestEnv::new(test_name!());
    let mut settings = env.settings("aa bb cc");
    settings.container_width = 40.0;
    settings.alignment.horizontal = HorizontalAlignment::Justified;
    let layout = env.generate(&settings);

    assert_eq!(layout.line_texts(), ["aa bb", "cc"]);
    let chars = layout.characters();
    assert_close(chars[3].x, 28.0);
    assert_close(chars[4].x, 34.0);
    assert_close(layout.lines()[0].width, 40.0);
    // The last line of the paragraph stays left aligned.
    assert_close(chars[6].x, 0.0);
}

#[test]
fn align_flush_stretches_last_line() {
    let mut env = TestEnv::new(test_name!());
    let justified = horizontal(&mut env, "a b", 40.0, HorizontalAlignment::Justified);
    assert_close(justified[2], 8.5);
    let flush = horizontal(&mut env, "a b", 40.0, HorizontalAlignment::Flush);
    assert_close(flush[2], 34.0);
}

#[test]
fn align_tag_overrides_settings() {
    let mut env = TestEnv::new(test_name!());
    let layout = env.layout("<align=right>ab");
    assert_close(layout.characters()[0].x, 188.0);
    assert_eq!(layout.lines()[0].alignment, HorizontalAlignment::Right);
}

#[test]
fn align_vertical() {
    let mut env = TestEnv::new(test_name!());
    assert_close(first_baseline(&mut env, VerticalAlignment::Top), 8.0);
    // The line box is 10 high in a 100 high container.
    assert_close(first_baseline(&mut env, VerticalAlignment::Middle), 53.0);
    assert_close(first_baseline(&mut env, VerticalAlignment::Bottom), 98.0);
    assert_close(first_baseline(&mut env, VerticalAlignment::Baseline), 50.0);
    // The glyph box spans 1 to 8 below the line top.
    assert_close(first_baseline(&mut env, VerticalAlignment::Midline), 53.5);
}

#[test]
fn align_vertical_with_margins() {
    let mut env = TestEnv::new(test_name!());
    let mut settings = env.settings("a");
    settings.margins.top = 10.0;
    settings.margins.bottom = 30.0;
    settings.alignment.vertical = VerticalAlignment::Bottom;
    let layout = env.generate(&settings);
    assert_close(layout.lines()[0].baseline, 68.0);
}
