// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # bioneuron-observability
//!
//! Logging setup shared by the bioneuronqp binaries, with per-crate debug
//! flag support.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Crate names accepted by the debug flags, matching the `target:` of
/// their log events
pub const KNOWN_CRATES: &[&str] = &[
    "bioneuronqp",
    "bioneuron-weights",
    "bioneuron-qp",
    "bioneuron-config",
];
