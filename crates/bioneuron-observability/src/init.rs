// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Installs a global `tracing-subscriber` fmt subscriber filtered by the
//! per-crate debug flags.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingSettings};

/// Build the `EnvFilter` for the given flags and default level
pub fn build_filter(debug_flags: &CrateDebugFlags, level: &str) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string(level);
    EnvFilter::try_new(&directives)
        .with_context(|| format!("Invalid log filter: {}", directives))
}

/// Initialize text logging to stderr
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags for filtering
/// * `level` - Level for everything not named by a flag (default: `info`)
///
/// Returns `Ok(false)` when a global subscriber was already installed,
/// which leaves the existing one in place.
pub fn init_logging(debug_flags: &CrateDebugFlags, level: Option<&str>) -> Result<bool> {
    let settings = LoggingSettings {
        level: level.unwrap_or("info").to_string(),
        format: LogFormat::Text,
    };
    init_logging_with(debug_flags, &settings)
}

/// Initialize logging with an explicit format
pub fn init_logging_with(debug_flags: &CrateDebugFlags, settings: &LoggingSettings) -> Result<bool> {
    let filter = build_filter(debug_flags, &settings.level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = match settings.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    Ok(installed.is_ok())
}
