// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Profile tables: device id → ordered tier configuration.
//!
//! # TOML Format
//! ```toml
//! default = "generic"
//!
//! [[profiles]]
//! name = "generic"
//! tiers = [
//!     { size = "8K", reserve = 16 },
//!     { size = "16K", reserve = 16 },
//! ]
//!
//! [[profiles]]
//! name = "adrastea"
//! device_ids = [0xabcd]
//! tiers = [
//!     { size = "8K", reserve = 2 },
//!     { size = "16K", reserve = 10 },
//! ]
//! ```
//!
//! Every device id that no profile claims resolves to the `default` profile.

use crate::{BlockSize, DeviceId, ProfileError, TierSpec};
use std::collections::HashMap;
use std::path::Path;

/// One named tier configuration and the devices it applies to.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Profile {
    /// Profile name, unique within a table.
    pub name: String,
    /// Devices that select this profile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_ids: Vec<DeviceId>,
    /// Tiers, strictly ascending by block size.
    pub tiers: Vec<TierSpec>,
}

impl Profile {
    /// Creates a profile. Call [`Profile::validate`] (or build a
    /// [`ProfileTable`], which validates) before use.
    pub fn new(name: impl Into<String>, device_ids: Vec<DeviceId>, tiers: Vec<TierSpec>) -> Self {
        Self {
            name: name.into(),
            device_ids,
            tiers,
        }
    }

    /// Checks that the profile is non-empty and strictly ascending.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.tiers.is_empty() {
            return Err(ProfileError::EmptyProfile {
                profile: self.name.clone(),
            });
        }

        for pair in self.tiers.windows(2) {
            if pair[1].block_size <= pair[0].block_size {
                return Err(ProfileError::UnsortedTiers {
                    profile: self.name.clone(),
                    tier: pair[1].name.clone(),
                    size: pair[1].size_bytes(),
                    previous: pair[0].size_bytes(),
                });
            }
        }
        Ok(())
    }

    /// Smallest block size served by this profile.
    pub fn threshold(&self) -> Option<BlockSize> {
        self.tiers.first().map(|t| t.block_size)
    }

    /// Total bytes pinned by all reserves of this profile.
    pub fn reserved_bytes(&self) -> usize {
        self.tiers.iter().map(TierSpec::reserved_bytes).sum()
    }

    fn normalise(&mut self) {
        for tier in &mut self.tiers {
            tier.fill_default_name();
        }
    }
}

/// Validated mapping from device ids to profiles, with a fallback profile.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawTable")]
pub struct ProfileTable {
    default: String,
    profiles: Vec<Profile>,
    #[serde(skip)]
    by_device: HashMap<DeviceId, usize>,
    #[serde(skip)]
    default_index: usize,
}

#[derive(serde::Deserialize)]
struct RawTable {
    default: String,
    profiles: Vec<Profile>,
}

impl TryFrom<RawTable> for ProfileTable {
    type Error = ProfileError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        Self::new(raw.profiles, raw.default)
    }
}

impl ProfileTable {
    /// Builds and validates a table. `default` names the fallback profile
    /// used for unrecognised device ids.
    pub fn new(mut profiles: Vec<Profile>, default: impl Into<String>) -> Result<Self, ProfileError> {
        let default = default.into();
        let mut by_device: HashMap<DeviceId, usize> = HashMap::new();

        for profile in &mut profiles {
            profile.normalise();
            profile.validate()?;
        }

        for (idx, profile) in profiles.iter().enumerate() {
            if profiles[..idx].iter().any(|p| p.name == profile.name) {
                return Err(ProfileError::DuplicateProfile(profile.name.clone()));
            }
            for &device in &profile.device_ids {
                if let Some(prev) = by_device.insert(device, idx) {
                    return Err(ProfileError::DuplicateDevice {
                        device,
                        first: profiles[prev].name.clone(),
                        second: profile.name.clone(),
                    });
                }
            }
        }

        let default_index = profiles
            .iter()
            .position(|p| p.name == default)
            .ok_or_else(|| ProfileError::UnknownDefault(default.clone()))?;

        Ok(Self {
            default,
            profiles,
            by_device,
            default_index,
        })
    }

    /// The table compiled into the crate: a generic default plus the
    /// Adrastea and WCN6750 layouts.
    pub fn builtin() -> Self {
        let tiers = |rows: &[(usize, usize)]| -> Vec<TierSpec> {
            rows.iter()
                .filter_map(|&(kb, reserve)| BlockSize::from_kb(kb).map(|s| TierSpec::new(s, reserve)))
                .collect()
        };

        let profiles = vec![
            Profile::new(
                "default",
                vec![
                    DeviceId::QCA6390,
                    DeviceId::QCA6490,
                    DeviceId::KIWI,
                    DeviceId::MANGO,
                    DeviceId::PEACH,
                    DeviceId::WCN6450,
                ],
                tiers(&[(8, 16), (16, 16), (32, 22), (64, 38), (128, 10)]),
            ),
            Profile::new(
                "adrastea",
                vec![DeviceId::ADRASTEA],
                tiers(&[(8, 2), (16, 10), (32, 8), (64, 4), (128, 2)]),
            ),
            Profile::new(
                "wcn6750",
                vec![DeviceId::WCN6750],
                tiers(&[(8, 2), (16, 8), (32, 11), (64, 15), (128, 4)]),
            ),
        ];

        // The rows above are constants that satisfy every validation rule.
        Self::new(profiles, "default").unwrap_or_else(|e| unreachable!("builtin table invalid: {e}"))
    }

    /// Returns the profile bound to `device`, or the default profile.
    pub fn resolve(&self, device: DeviceId) -> &Profile {
        match self.by_device.get(&device) {
            Some(&idx) => &self.profiles[idx],
            None => {
                tracing::debug!(
                    "device {device} has no dedicated profile, using '{}'",
                    self.default
                );
                &self.profiles[self.default_index]
            }
        }
    }

    /// Looks a profile up by name.
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// The fallback profile.
    pub fn default_profile(&self) -> &Profile {
        &self.profiles[self.default_index]
    }

    /// All profiles, in declaration order.
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Loads a table from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|e| ProfileError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parses a table from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ProfileError> {
        toml::from_str(toml_str).map_err(|e| ProfileError::Toml(e.to_string()))
    }

    /// Serialises the table to TOML.
    pub fn to_toml(&self) -> Result<String, ProfileError> {
        toml::to_string_pretty(self).map_err(|e| ProfileError::Toml(e.to_string()))
    }
}

impl Default for ProfileTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kb: usize, reserve: usize) -> TierSpec {
        TierSpec::new(BlockSize::from_kb(kb).unwrap(), reserve)
    }

    #[test]
    fn test_builtin_resolution() {
        let table = ProfileTable::builtin();
        assert_eq!(table.resolve(DeviceId::ADRASTEA).name, "adrastea");
        assert_eq!(table.resolve(DeviceId::WCN6750).name, "wcn6750");
        assert_eq!(table.resolve(DeviceId::KIWI).name, "default");

        let wcn = table.resolve(DeviceId::WCN6750);
        assert_eq!(wcn.tiers.len(), 5);
        assert_eq!(wcn.tiers[3].reserve_min, 15);
        assert_eq!(wcn.tiers[0].name, "pool-8k");
    }

    #[test]
    fn test_unknown_device_falls_back() {
        let table = ProfileTable::builtin();
        let profile = table.resolve(DeviceId(0xdead));
        assert_eq!(profile.name, "default");
        assert_eq!(profile.threshold().unwrap().as_bytes(), 8 * 1024);
        assert_eq!(profile.tiers[3].reserve_min, 38);
    }

    #[test]
    fn test_rejects_unsorted_tiers() {
        let profile = Profile::new("bad", vec![], vec![spec(16, 1), spec(8, 1)]);
        let err = ProfileTable::new(vec![profile], "bad").unwrap_err();
        assert!(matches!(err, ProfileError::UnsortedTiers { .. }));
    }

    #[test]
    fn test_rejects_duplicate_sizes() {
        let profile = Profile::new("dup", vec![], vec![spec(8, 1), spec(8, 2)]);
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_profile() {
        let err = ProfileTable::new(vec![Profile::new("empty", vec![], vec![])], "empty").unwrap_err();
        assert!(matches!(err, ProfileError::EmptyProfile { .. }));
    }

    #[test]
    fn test_rejects_unknown_default() {
        let profile = Profile::new("a", vec![], vec![spec(8, 1)]);
        let err = ProfileTable::new(vec![profile], "b").unwrap_err();
        assert!(matches!(err, ProfileError::UnknownDefault(_)));
    }

    #[test]
    fn test_rejects_shared_device() {
        let a = Profile::new("a", vec![DeviceId(1)], vec![spec(8, 1)]);
        let b = Profile::new("b", vec![DeviceId(1)], vec![spec(8, 1)]);
        let err = ProfileTable::new(vec![a, b], "a").unwrap_err();
        assert!(matches!(err, ProfileError::DuplicateDevice { .. }));
    }

    #[test]
    fn test_from_toml() {
        let table = ProfileTable::from_toml(
            r#"
            default = "generic"

            [[profiles]]
            name = "generic"
            tiers = [{ size = "8K", reserve = 2 }, { size = 16384, reserve = 2 }]

            [[profiles]]
            name = "tight"
            device_ids = [0x6750]
            tiers = [{ size = "8K", reserve = 1, name = "rx", max_blocks = 1 }]
            "#,
        )
        .unwrap();

        let generic = table.resolve(DeviceId(99));
        assert_eq!(generic.name, "generic");
        assert_eq!(generic.tiers[1].size_bytes(), 16384);
        assert_eq!(generic.tiers[1].name, "pool-16k");

        let tight = table.resolve(DeviceId::WCN6750);
        assert_eq!(tight.tiers[0].name, "rx");
        assert_eq!(tight.tiers[0].max_blocks, Some(1));
    }

    #[test]
    fn test_from_toml_validates() {
        let result = ProfileTable::from_toml(
            r#"
            default = "x"
            [[profiles]]
            name = "x"
            tiers = [{ size = "16K", reserve = 1 }, { size = "8K", reserve = 1 }]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let table = ProfileTable::builtin();
        let text = table.to_toml().unwrap();
        let back = ProfileTable::from_toml(&text).unwrap();
        assert_eq!(back.profiles(), table.profiles());
        assert_eq!(back.default_profile().name, "default");
    }

    #[test]
    fn test_reserved_bytes() {
        let profile = Profile::new("p", vec![], vec![spec(8, 2), spec(16, 1)]);
        assert_eq!(profile.reserved_bytes(), 32 * 1024);
    }
}
