// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use glyph_atlas::FontId;
use peniko::color::palette::css;
use richtext::{
    BreakReason, Color, ElementKind, Extents, GenerationError, LayoutResult, Margins,
    MaterialKey,
};
use richtext_dev::SyntheticRasterizer;

use crate::test_name;
use crate::util::{assert_close, TestEnv};

#[test]
fn basic_single_line() {
    let mut env = TestEnv::new(test_name!());
    let layout = env.layout("Hello");

    assert_eq!(layout.characters().len(), 5);
    assert_eq!(layout.lines().len(), 1);
    assert_eq!(layout.visible_count(), 5);
    assert_eq!(layout.line_texts(), ["Hello"]);
    for (i, c) in layout.characters().iter().enumerate() {
        assert_close(c.x, 6.0 * i as f32);
        assert_close(c.baseline, 8.0);
        assert_eq!(c.source_index, i as u32);
        assert_eq!(c.source_len, 1);
        assert_eq!(c.line, 0);
        assert_eq!(c.material, Some(0));
    }
    assert_eq!(
        layout.characters()[0].element,
        ElementKind::Character {
            font: env.font,
            glyph_index: 'H' as u32 + 1,
        }
    );

    let line = &layout.lines()[0];
    assert_eq!(line.chars, 0..5);
    assert_eq!((line.first_visible, line.last_visible), (Some(0), Some(4)));
    assert_eq!(line.break_reason, BreakReason::None);
    assert_close(line.width, 30.0);
    assert_close(line.ascent, 8.0);
    assert_close(line.descent, 2.0);

    assert_eq!(layout.preferred_size(), (30.0, 10.0));
    assert_eq!(layout.bounds(), Extents::new(0.5, 1.0, 29.5, 8.0));
    assert_eq!(layout.font_size(), 10.0);
    assert!(!layout.is_truncated());
    assert!(layout.missing().is_empty());
    assert!(layout.diagnostics().is_empty());
}

#[test]
fn basic_quads() {
    let mut env = TestEnv::new(test_name!());
    let layout = env.layout("Hi");

    let groups = layout.mesh_groups();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(
        group.key(),
        MaterialKey::Font {
            font: env.font,
            page: 0,
        }
    );
    assert_eq!(group.quad_count(), 2);
    assert_eq!(group.indices(), &[0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);

    let corners: Vec<[f32; 2]> = group.vertices()[..4]
        .iter()
        .map(|vertex| vertex.position)
        .collect();
    assert_eq!(corners, [[0.5, 8.0], [0.5, 1.0], [5.5, 1.0], [5.5, 8.0]]);
    for vertex in group.vertices() {
        assert_eq!(vertex.color, [255; 4]);
        assert_eq!(vertex.scale, 1.0);
        assert!(vertex.uv.iter().all(|uv| (0.0..=1.0).contains(uv)));
    }
    // The second glyph samples a different atlas rectangle.
    assert_ne!(group.vertices()[0].uv, group.vertices()[4].uv);
}

#[test]
fn basic_line_feed() {
    let mut env = TestEnv::new(test_name!());
    let layout = env.layout("ab\ncd");

    assert_eq!(layout.line_texts(), ["ab", "cd"]);
    let lines = layout.lines();
    assert_eq!(lines[0].break_reason, BreakReason::Newline);
    assert_eq!(lines[1].break_reason, BreakReason::None);
    assert_close(lines[0].baseline, 8.0);
    assert_close(lines[1].baseline, 20.0);

    let feed = &layout.characters()[2];
    assert_eq!(feed.element, ElementKind::Control);
    assert!(!feed.visible);
    assert_eq!(feed.line, 0);
    assert_close(layout.characters()[3].x, 0.0);
    assert_eq!(layout.preferred_size(), (12.0, 22.0));
}

#[test]
fn basic_escaped_line_feed() {
    let mut env = TestEnv::new(test_name!());
    assert_eq!(env.layout("ab\\ncd").line_texts(), ["ab", "cd"]);

    let mut settings = env.settings("ab\\ncd");
    settings.parse_control_characters = false;
    assert_eq!(env.generate(&settings).line_texts(), ["ab\\ncd"]);
}

#[test]
fn basic_empty_text() {
    let mut env = TestEnv::new(test_name!());
    let layout = env.layout("");

    assert!(layout.characters().is_empty());
    assert_eq!(layout.lines().len(), 1);
    assert_eq!(layout.lines()[0].first_visible, None);
    assert!(layout.mesh_groups().is_empty());
    assert_eq!(layout.bounds(), Extents::default());
    assert_eq!(layout.preferred_size(), (0.0, 10.0));
}

#[test]
fn basic_missing_glyph_is_placeholder() {
    let mut env = TestEnv::with_rasterizer(
        test_name!(),
        SyntheticRasterizer::new().with_missing(['x']),
    );
    let layout = env.layout("axbx");

    let placeholder = &layout.characters()[1];
    assert_eq!(placeholder.element, ElementKind::Placeholder);
    assert!(!placeholder.visible);
    assert_eq!(placeholder.advance, 0.0);
    assert_eq!(placeholder.material, None);
    assert_close(layout.characters()[2].x, 6.0);
    assert_eq!(layout.missing(), ['x' as u32]);
    assert_eq!(layout.visible_count(), 2);
    // A glyph missing from the face is not an atlas problem.
    assert!(layout.diagnostics().is_empty());
}

#[test]
fn basic_fallback_font() {
    let mut env = TestEnv::with_rasterizer(
        test_name!(),
        SyntheticRasterizer::new().with_missing(['x']),
    );
    let fallback = env.add_font("Fallback", SyntheticRasterizer::new());
    env.registry
        .set_font_fallbacks(env.font, vec![fallback])
        .unwrap();
    let layout = env.layout("axb");

    assert!(layout.missing().is_empty());
    assert_eq!(
        layout.characters()[1].element,
        ElementKind::Character {
            font: fallback,
            glyph_index: 'x' as u32 + 1,
        }
    );
    let keys: Vec<MaterialKey> = layout.mesh_groups().iter().map(|g| g.key()).collect();
    assert_eq!(
        keys,
        [
            MaterialKey::Font {
                font: env.font,
                page: 0,
            },
            MaterialKey::Font {
                font: fallback,
                page: 0,
            },
        ]
    );
    assert_eq!(layout.characters()[1].material, Some(1));
    assert_close(layout.characters()[2].x, 12.0);
}

#[test]
fn basic_global_fallback_font() {
    let mut env = TestEnv::with_rasterizer(
        test_name!(),
        SyntheticRasterizer::new().with_missing(['y']),
    );
    let fallback = env.add_font("Fallback", SyntheticRasterizer::new());
    env.registry.set_global_fallbacks(vec![fallback]).unwrap();
    let layout = env.layout("y");

    assert_eq!(
        layout.characters()[0].element,
        ElementKind::Character {
            font: fallback,
            glyph_index: 'y' as u32 + 1,
        }
    );
}

#[test]
fn basic_kerning() {
    let mut env = TestEnv::with_rasterizer(
        test_name!(),
        SyntheticRasterizer::new().with_kerning('A', 'V', -0.1),
    );
    let layout = env.layout("AVA");
    assert_close(layout.characters()[0].advance, 5.0);
    assert_close(layout.characters()[1].x, 5.0);
    // Only the listed pair is adjusted.
    assert_close(layout.characters()[2].x, 11.0);

    let mut settings = env.settings("AVA");
    settings.kerning = false;
    let layout = env.generate(&settings);
    assert_close(layout.characters()[1].x, 6.0);
}

#[test]
fn basic_spacing() {
    let mut env = TestEnv::new(test_name!());
    let mut settings = env.settings("a b");
    settings.character_spacing = 10.0;
    settings.word_spacing = 20.0;
    let layout = env.generate(&settings);

    let chars = layout.characters();
    assert_close(chars[0].advance, 7.0);
    assert_close(chars[1].advance, 2.5 + 1.0 + 2.0);
    assert_close(chars[2].x, 12.5);
}

#[test]
fn basic_margins() {
    let mut env = TestEnv::new(test_name!());
    let mut settings = env.settings("Hello");
    settings.margins = Margins::uniform(5.0);
    let layout = env.generate(&settings);

    assert_close(layout.characters()[0].x, 5.0);
    assert_close(layout.lines()[0].baseline, 13.0);
    assert_close(layout.lines()[0].offset, 5.0);
    assert_eq!(layout.preferred_size(), (40.0, 20.0));
}

#[test]
fn basic_vertex_colors() {
    let mut env = TestEnv::new(test_name!());
    let mut settings = env.settings("a");
    settings.color = Color::from_rgba8(255, 0, 0, 128);
    let layout = env.generate(&settings);

    assert_eq!(layout.characters()[0].color, settings.color);
    let vertex = layout.mesh_groups()[0].vertices()[0];
    assert_eq!(vertex.color, [255, 0, 0, 128]);

    // Pure white and black are the same in linear space.
    settings.color = css::BLACK;
    settings.linear_color = true;
    let layout = env.generate(&settings);
    assert_eq!(layout.mesh_groups()[0].vertices()[0].color, [0, 0, 0, 255]);
}

#[test]
fn basic_generation_errors() {
    let mut env = TestEnv::new(test_name!());
    let failing = env.add_font("Broken", SyntheticRasterizer::new().failing());

    let mut settings = env.settings("Hello");
    let mut layout = env.generate(&settings);
    let before = layout.clone();

    settings.font = None;
    assert_eq!(
        env.context.generate_into(&env.registry, &settings, &mut layout),
        Err(GenerationError::NoFont)
    );
    settings.font = Some(FontId::new(99));
    assert_eq!(
        env.context.generate_into(&env.registry, &settings, &mut layout),
        Err(GenerationError::UnknownFont(FontId::new(99)))
    );
    settings.font = Some(failing);
    assert_eq!(
        env.context.generate_into(&env.registry, &settings, &mut layout),
        Err(GenerationError::FontNotReady(failing))
    );
    assert_eq!(layout, before);
}

#[test]
fn basic_regenerate_in_place() {
    let mut env = TestEnv::new(test_name!());
    let mut layout = LayoutResult::new();
    let long = env.settings("one two three four");
    env.context
        .generate_into(&env.registry, &long, &mut layout)
        .unwrap();
    let capacity = layout.mesh_groups()[0].capacity();
    assert_eq!(layout.mesh_groups()[0].quad_count(), 15);

    let short = env.settings("ab");
    env.context
        .generate_into(&env.registry, &short, &mut layout)
        .unwrap();
    let group = &layout.mesh_groups()[0];
    assert_eq!(group.quad_count(), 2);
    assert_eq!(group.capacity(), capacity);
    assert_eq!(layout.characters().len(), 2);
    // Stale quads past the written ones are zeroed.
    assert!(group.vertex_buffer()[8..]
        .iter()
        .all(|vertex| vertex.position == [0.0, 0.0] && vertex.scale == 0.0));
}

#[test]
fn basic_same_input_same_output() {
    let mut env = TestEnv::new(test_name!());
    let sample = richtext_dev::TextSamples::new().markup;
    let first = env.layout(sample.text);
    let second = env.layout(sample.text);
    assert_eq!(first, second);
}
