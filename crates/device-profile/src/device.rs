// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hardware device identifiers.
//!
//! Platform detection reports the attached chip as a numeric id. The pool
//! only uses the id as a lookup key into a [`ProfileTable`](crate::ProfileTable);
//! the named constants below cover the chips the built-in table knows.

use crate::ProfileError;
use std::fmt;

/// Numeric identifier of a device, as reported by platform detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl DeviceId {
    pub const QCA6174: Self = Self(0x003e);
    pub const ADRASTEA: Self = Self(0xabcd);
    pub const QCA6290: Self = Self(0x1100);
    pub const QCA6390: Self = Self(0x1101);
    pub const QCA6490: Self = Self(0x1103);
    pub const KIWI: Self = Self(0x1107);
    pub const MANGO: Self = Self(0x110a);
    pub const PEACH: Self = Self(0x110e);
    pub const WCN6750: Self = Self(0x6750);
    pub const WCN6450: Self = Self(0x6450);

    /// Chip names accepted by [`DeviceId::parse`].
    pub const KNOWN: &'static [(&'static str, DeviceId)] = &[
        ("qca6174", Self::QCA6174),
        ("adrastea", Self::ADRASTEA),
        ("qca6290", Self::QCA6290),
        ("qca6390", Self::QCA6390),
        ("qca6490", Self::QCA6490),
        ("kiwi", Self::KIWI),
        ("mango", Self::MANGO),
        ("peach", Self::PEACH),
        ("wcn6750", Self::WCN6750),
        ("wcn6450", Self::WCN6450),
    ];

    /// Parses a chip name (`"wcn6750"`), a hex id (`"0x6750"`) or a decimal id.
    pub fn parse(s: &str) -> Result<Self, ProfileError> {
        let s = s.trim();
        let lower = s.to_lowercase();

        if let Some((_, id)) = Self::KNOWN.iter().find(|(name, _)| *name == lower) {
            return Ok(*id);
        }

        let parsed = match lower.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => lower.parse::<u64>(),
        };
        parsed
            .map(DeviceId)
            .map_err(|_| ProfileError::InvalidDevice(s.to_string()))
    }

    /// Returns the chip name for a known id.
    pub fn chip_name(&self) -> Option<&'static str> {
        Self::KNOWN
            .iter()
            .find(|(_, id)| id == self)
            .map(|(name, _)| *name)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl std::str::FromStr for DeviceId {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for DeviceId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
