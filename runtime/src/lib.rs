// Copyright 2026 Layout Catalog Contributors
// SPDX-License-Identifier: MIT

//! Layout catalog runtime: everything that touches the network, the
//! browser or the workspace on disk.
//!
//! The library crate exposes the pipeline stages for integration testing;
//! the `catalog` binary wires them to the command line.

pub mod acquisition;
pub mod artifacts;
pub mod cartography;
pub mod cli;
pub mod config;
pub mod publish;
pub mod renderer;
pub mod thumbnail;
