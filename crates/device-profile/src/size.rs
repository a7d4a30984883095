// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Block size parsing and formatting.
//!
//! A [`BlockSize`] is the fixed allocation unit of one tier. Profile tables
//! write them in a human-readable form, so parsing accepts the same suffixes
//! an operator would type.

use crate::ProfileError;
use std::fmt;

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// The fixed allocation unit of a tier, in bytes. Always non-zero.
///
/// # Parsing
/// - `"8K"` or `"8KB"` → 8 × 1024 bytes
/// - `"1M"` or `"1MB"` → 1 × 1024² bytes
/// - `"8192"` or `"8192B"` → raw byte count
///
/// # Examples
/// ```
/// use device_profile::BlockSize;
///
/// let s = BlockSize::parse("16K").unwrap();
/// assert_eq!(s.as_bytes(), 16 * 1024);
/// assert_eq!(s.to_string(), "16K");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "SizeRepr", into = "SizeRepr")]
pub struct BlockSize {
    bytes: usize,
}

impl BlockSize {
    /// Creates a block size from a byte count. Returns `None` for zero.
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        (bytes > 0).then_some(Self { bytes })
    }

    /// Creates a block size from kibibytes. Returns `None` for zero.
    pub fn from_kb(kb: usize) -> Option<Self> {
        Self::from_bytes(kb.checked_mul(KIB)?)
    }

    /// Returns the size in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a human-readable size string. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, ProfileError> {
        let invalid = |detail: &str| ProfileError::InvalidSize {
            input: s.to_string(),
            detail: detail.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty string"));
        }

        let upper = trimmed.to_uppercase();
        let (num_str, multiplier) = if let Some(n) = upper.strip_suffix("MB") {
            (n, MIB)
        } else if let Some(n) = upper.strip_suffix('M') {
            (n, MIB)
        } else if let Some(n) = upper.strip_suffix("KB") {
            (n, KIB)
        } else if let Some(n) = upper.strip_suffix('K') {
            (n, KIB)
        } else if let Some(n) = upper.strip_suffix('B') {
            (n, 1)
        } else {
            (upper.as_str(), 1)
        };

        let value: usize = num_str
            .trim()
            .parse()
            .map_err(|_| invalid("expected a number followed by an optional K or M suffix"))?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("size overflows usize"))?;

        Self::from_bytes(bytes).ok_or_else(|| invalid("block size must be non-zero"))
    }

    /// Lower-case short form used in default tier names (`8k`, `1m`, `100`).
    pub fn short_name(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes % MIB == 0 {
            write!(f, "{}M", self.bytes / MIB)
        } else if self.bytes % KIB == 0 {
            write!(f, "{}K", self.bytes / KIB)
        } else {
            write!(f, "{}", self.bytes)
        }
    }
}

impl std::str::FromStr for BlockSize {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Wire form: either a raw integer or a suffixed string.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Bytes(usize),
    Text(String),
}

impl TryFrom<SizeRepr> for BlockSize {
    type Error = ProfileError;

    fn try_from(repr: SizeRepr) -> Result<Self, Self::Error> {
        match repr {
            SizeRepr::Bytes(bytes) => Self::from_bytes(bytes).ok_or(ProfileError::InvalidSize {
                input: bytes.to_string(),
                detail: "block size must be non-zero".into(),
            }),
            SizeRepr::Text(s) => Self::parse(&s),
        }
    }
}

impl From<BlockSize> for SizeRepr {
    fn from(size: BlockSize) -> Self {
        SizeRepr::Text(size.to_string())
    }
}
