// Copyright 2026 Trailmap Contributors
// SPDX-License-Identifier: MIT

//! Trailmap CLI library — export a Wikiloc trail with a headless browser and
//! publish it to MapHub.
//!
//! This library crate exposes the pipeline stages for integration testing.

pub mod cli;
pub mod config;
pub mod extractor;
pub mod maphub;
pub mod renderer;
