// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use richtext::LayoutResult;

/// Asserts that `actual` is within a thousandth of `expected`.
#[track_caller]
pub(crate) fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

/// Asserts that no line is wider than `width`, except lines holding a single
/// visible character, which is placed even when it does not fit.
#[track_caller]
pub(crate) fn assert_lines_fit(layout: &LayoutResult, width: f32) {
    for (index, line) in layout.lines().iter().enumerate() {
        if line.first_visible == line.last_visible {
            continue;
        }
        assert!(
            line.width <= width + 1e-3,
            "line {index} is {} wide, more than {width}: {:?}",
            line.width,
            layout.line_texts()
        );
    }
}
