// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared helpers.

pub mod inspect;
pub mod profiles;
pub mod stress;

use device_profile::{DeviceId, ProfileTable};
use prealloc_pool::PoolConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads a profile table from `path`, or the built-in one.
pub fn load_table(path: Option<&Path>) -> anyhow::Result<ProfileTable> {
    match path {
        Some(path) => ProfileTable::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load profile table: {e}")),
        None => Ok(ProfileTable::builtin()),
    }
}

/// Loads pool configuration from `path`, or the defaults.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PoolConfig> {
    match path {
        Some(path) => PoolConfig::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load config '{}': {e}", path.display())),
        None => Ok(PoolConfig::default()),
    }
}

pub fn parse_device(device: &str) -> anyhow::Result<DeviceId> {
    DeviceId::parse(device).map_err(|e| anyhow::anyhow!("invalid device '{device}': {e}"))
}

/// Formats a byte count the way tier sizes are written (`8K`, `128K`).
pub fn format_bytes(bytes: usize) -> String {
    if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
        format!("{}M", bytes / (1024 * 1024))
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{}K", bytes / 1024)
    } else {
        format!("{bytes}")
    }
}
