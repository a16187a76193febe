// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Values are resolved in three tiers:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{validate_config, BioneuronConfig, ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the configuration file
///
/// Search order:
/// 1. `BIONEURON_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Parent directories, up to 5 levels
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("BIONEURON_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by BIONEURON_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet BIONEURON_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns an error if the file is not found, contains invalid TOML, or the
/// merged configuration fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BioneuronConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: BioneuronConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;
    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower == "true" || lower == "1" || lower == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `BIONEURON_TOLERANCE` -> `solver.tolerance`
/// - `BIONEURON_MAX_ITER` -> `solver.max_iter`
/// - `BIONEURON_N_THREADS` -> `solver.n_threads`
/// - `BIONEURON_RENORMALISE` -> `solver.renormalise`
/// - `BIONEURON_REGULARISATION` -> `problem.regularisation`
/// - `BIONEURON_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut BioneuronConfig) {
    if let Ok(value) = env::var("BIONEURON_TOLERANCE") {
        if let Ok(tolerance) = value.parse::<f64>() {
            config.solver.tolerance = tolerance;
        }
    }
    if let Ok(value) = env::var("BIONEURON_MAX_ITER") {
        if let Ok(max_iter) = value.parse::<usize>() {
            config.solver.max_iter = max_iter;
        }
    }
    if let Ok(value) = env::var("BIONEURON_N_THREADS") {
        if let Ok(n_threads) = value.parse::<usize>() {
            config.solver.n_threads = n_threads;
        }
    }
    if let Ok(value) = env::var("BIONEURON_RENORMALISE") {
        config.solver.renormalise = parse_flag(&value);
    }
    if let Ok(value) = env::var("BIONEURON_REGULARISATION") {
        if let Ok(reg) = value.parse::<f64>() {
            config.problem.regularisation = reg;
        }
    }
    if let Ok(value) = env::var("BIONEURON_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"tolerance": "1e-3", "n_threads": "4"}`)
pub fn apply_cli_overrides(config: &mut BioneuronConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("tolerance") {
        if let Ok(tolerance) = value.parse::<f64>() {
            config.solver.tolerance = tolerance;
        }
    }
    if let Some(value) = cli_args.get("max_iter") {
        if let Ok(max_iter) = value.parse::<usize>() {
            config.solver.max_iter = max_iter;
        }
    }
    if let Some(value) = cli_args.get("n_threads") {
        if let Ok(n_threads) = value.parse::<usize>() {
            config.solver.n_threads = n_threads;
        }
    }
    if let Some(value) = cli_args.get("renormalise") {
        config.solver.renormalise = parse_flag(value);
    }
    if let Some(value) = cli_args.get("regularisation") {
        if let Ok(reg) = value.parse::<f64>() {
            config.problem.regularisation = reg;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}
