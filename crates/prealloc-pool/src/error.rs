// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the pool allocator.

use crate::AllocMode;

/// Errors reported by pool construction, acquisition and release.
///
/// None of these are fatal to the caller: an acquire failure means "fall
/// back or retry at a larger size", a release failure means "this address
/// was not ours (or was already returned)".
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// No pool set has been initialised.
    #[error("pool set is not initialised")]
    NotInitialized,

    /// The request is smaller than the smallest tier; the general allocator
    /// should serve it instead.
    #[error("request of {size} bytes is below the pool threshold of {threshold} bytes")]
    BelowThreshold { size: usize, threshold: usize },

    /// Every tier is either too small or disabled.
    #[error("no usable tier serves {size} bytes")]
    NoSuitableTier { size: usize },

    /// The selected tier had no block available in the requested mode.
    #[error("tier '{tier}' exhausted for a {size}-byte request ({mode})")]
    TierExhausted {
        tier: String,
        size: usize,
        mode: AllocMode,
    },

    /// The tracking table could not grow, so the raw block was rolled back.
    #[error("tier '{tier}' tracking table cannot grow beyond {capacity} slots")]
    BookkeepingOverflow { tier: String, capacity: usize },

    /// The address is not on loan from any tier.
    #[error("address {addr:#x} is not owned by any tier")]
    UnknownPointer { addr: usize },

    /// A tier's backing allocator could not be created; the tier is disabled.
    #[error("tier '{tier}' could not be constructed: {reason}")]
    ConstructionFailure { tier: String, reason: String },

    /// Invalid pool configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The tier profile was rejected.
    #[error(transparent)]
    Profile(#[from] device_profile::ProfileError),
}
