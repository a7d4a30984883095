// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A single fixed-size tier.

use crate::reserve::ReservePool;
use crate::slab::CacheId;
use crate::tracking::TrackingTable;
use crate::PoolConfig;
use device_profile::TierSpec;

/// One block size, its reserve, and (via the pool set) its tracking table.
///
/// A tier whose reserve could not be built is *degraded*: it stays in the
/// pool set so tier indices and diagnostics are stable, but selection
/// skips it.
#[derive(Debug)]
pub struct Tier {
    spec: TierSpec,
    reserve: Option<ReservePool>,
}

impl Tier {
    /// Builds the tier's reserve and initial tracking table. Failures are
    /// logged and leave the tier degraded with an empty table.
    pub(crate) fn build(spec: TierSpec, config: &PoolConfig) -> (Self, TrackingTable) {
        let reserve = match ReservePool::new(&spec, config.wait_retry()) {
            Ok(reserve) => reserve,
            Err(e) => {
                tracing::error!("{e}; tier disabled");
                return (Self { spec, reserve: None }, TrackingTable::default());
            }
        };

        match TrackingTable::with_capacity(spec.reserve_min) {
            Ok(table) => {
                tracing::info!(
                    "created tier {} of min size {} * {}",
                    spec.name,
                    spec.reserve_min,
                    spec.size_bytes(),
                );
                (
                    Self {
                        spec,
                        reserve: Some(reserve),
                    },
                    table,
                )
            }
            Err(e) => {
                tracing::error!(
                    "tier {}: cannot allocate tracking table of {} slots ({e}); tier disabled",
                    spec.name,
                    spec.reserve_min,
                );
                (Self { spec, reserve: None }, TrackingTable::default())
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn block_size(&self) -> usize {
        self.spec.size_bytes()
    }

    pub fn reserve_min(&self) -> usize {
        self.spec.reserve_min
    }

    pub fn spec(&self) -> &TierSpec {
        &self.spec
    }

    /// `false` for a degraded tier.
    pub fn is_available(&self) -> bool {
        self.reserve.is_some()
    }

    /// `true` if this tier is live and its blocks fit `size`.
    pub fn serves(&self, size: usize) -> bool {
        self.is_available() && self.block_size() >= size
    }

    /// Id of the backing cache, for direct-mapping lookups.
    pub fn cache_id(&self) -> Option<CacheId> {
        self.reserve.as_ref().map(ReservePool::cache_id)
    }

    pub(crate) fn reserve(&self) -> Option<&ReservePool> {
        self.reserve.as_ref()
    }

    /// Destroys the reserve and backing cache.
    pub(crate) fn destroy(&mut self) {
        if let Some(reserve) = self.reserve.take() {
            tracing::info!("destroy tier {}", self.spec.name);
            drop(reserve);
        }
    }
}

/// Read-only view of a tier's current state.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TierSnapshot {
    pub name: String,
    pub block_size: usize,
    pub reserve_min: usize,
    /// Blocks sitting in the reserve right now.
    pub reserve_available: usize,
    /// Tracking table length.
    pub table_capacity: usize,
    /// Tracking table slots in use.
    pub occupied: usize,
    /// `true` if construction failed and the tier is skipped.
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_live_tier() {
        let spec = TierSpec::from_bytes(8192, 2).unwrap();
        let (tier, table) = Tier::build(spec, &PoolConfig::default());
        assert!(tier.is_available());
        assert!(tier.serves(8192));
        assert!(!tier.serves(8193));
        assert_eq!(table.capacity(), 2);
        assert!(tier.cache_id().is_some());
    }

    #[test]
    fn test_build_degraded_tier() {
        let spec = TierSpec::from_bytes(8192, 2).unwrap().with_max_blocks(1);
        let (tier, table) = Tier::build(spec, &PoolConfig::default());
        assert!(!tier.is_available());
        assert!(!tier.serves(100));
        assert_eq!(table.capacity(), 0);
        assert!(tier.cache_id().is_none());
    }

    #[test]
    fn test_destroy() {
        let spec = TierSpec::from_bytes(4096, 1).unwrap();
        let (mut tier, _) = Tier::build(spec, &PoolConfig::default());
        tier.destroy();
        assert!(!tier.is_available());
    }
}
