// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tier specifications: one row of a profile's tier table.

use crate::BlockSize;

/// Static description of one fixed-size tier.
///
/// In TOML a tier is written as
/// `{ size = "8K", reserve = 16, name = "pool-8k", max_blocks = 32 }`;
/// `name` and `max_blocks` are optional.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TierSpec {
    /// Fixed allocation unit of the tier.
    #[serde(rename = "size")]
    pub block_size: BlockSize,
    /// Number of blocks kept pre-charged in reserve.
    #[serde(rename = "reserve")]
    pub reserve_min: usize,
    /// Diagnostic name. Filled with [`TierSpec::default_name`] when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Upper bound on live blocks the backing cache may hold, reserve
    /// included. `None` leaves the cache bounded only by system memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_blocks: Option<usize>,
}

impl TierSpec {
    /// Creates a tier spec with the default name for its size.
    pub fn new(block_size: BlockSize, reserve_min: usize) -> Self {
        Self {
            block_size,
            reserve_min,
            name: Self::default_name(block_size),
            max_blocks: None,
        }
    }

    /// Convenience constructor from a byte count. Returns `None` for zero.
    pub fn from_bytes(block_size: usize, reserve_min: usize) -> Option<Self> {
        BlockSize::from_bytes(block_size).map(|size| Self::new(size, reserve_min))
    }

    /// Overrides the diagnostic name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Caps the backing cache at `max_blocks` live blocks.
    pub fn with_max_blocks(mut self, max_blocks: usize) -> Self {
        self.max_blocks = Some(max_blocks);
        self
    }

    /// Default diagnostic name, e.g. `pool-16k`.
    pub fn default_name(block_size: BlockSize) -> String {
        format!("pool-{}", block_size.short_name())
    }

    /// Block size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.block_size.as_bytes()
    }

    /// Bytes pinned by the pre-charged reserve.
    pub fn reserved_bytes(&self) -> usize {
        self.size_bytes().saturating_mul(self.reserve_min)
    }

    pub(crate) fn fill_default_name(&mut self) {
        if self.name.trim().is_empty() {
            self.name = Self::default_name(self.block_size);
        }
    }
}
