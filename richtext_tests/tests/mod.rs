// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! This crate contains the integration test suite for `richtext`.
//!
//! - The `util` module contains the [`TestEnv`](util::TestEnv) fixture, which
//!   registers a font backed by the synthetic rasterizer of `richtext_dev`. With
//!   the default settings one em is ten layout units: most glyphs advance by 6,
//!   spaces by 2.5 and lines are 12 apart.
//! - We do not use the default Rust test harness, but instead use this `mod.rs`
//!   file as the entry point to run all other tests, so that the utilities are
//!   shared.
//! - Put the "topic" of a test at the start of its name, e.g. `wrap_force_break`
//!   rather than `force_break_wrap`.

#![allow(missing_docs, reason = "we don't need docs for testing")]
#![allow(clippy::cast_possible_truncation, reason = "not critical for testing")]

mod align;
mod basic;
#[macro_use]
mod util;
