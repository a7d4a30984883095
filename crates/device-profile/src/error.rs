// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for profile tables.

use crate::DeviceId;

/// Errors raised while parsing or validating profile tables.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// A block size string could not be parsed.
    #[error("invalid block size '{input}': {detail}")]
    InvalidSize { input: String, detail: String },

    /// A device identifier string could not be parsed.
    #[error("invalid device id '{0}': expected a chip name, a decimal or a 0x-prefixed hex id")]
    InvalidDevice(String),

    /// A profile declares no tiers at all.
    #[error("profile '{profile}' has no tiers")]
    EmptyProfile { profile: String },

    /// Tiers must be strictly ascending by block size.
    #[error(
        "profile '{profile}': tier '{tier}' ({size} bytes) must be larger than the previous tier ({previous} bytes)"
    )]
    UnsortedTiers {
        profile: String,
        tier: String,
        size: usize,
        previous: usize,
    },

    /// Two profiles share a name.
    #[error("duplicate profile name '{0}'")]
    DuplicateProfile(String),

    /// Two profiles claim the same device id.
    #[error("device id {device} is claimed by both '{first}' and '{second}'")]
    DuplicateDevice {
        device: DeviceId,
        first: String,
        second: String,
    },

    /// The table's fallback profile does not exist.
    #[error("default profile '{0}' is not defined")]
    UnknownDefault(String),

    /// Failed to read a profile table from disk.
    #[error("cannot read profile table '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse or serialise TOML.
    #[error("TOML error: {0}")]
    Toml(String),
}
