// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation statistics for diagnostics and reserve sizing.
//!
//! [`PoolStats`] tracks cumulative per-tier counters: how often each tier
//! granted blocks, how often the reserve actually had to step in, and how
//! often requests failed. A reserve that is never hit is oversized; a tier
//! that keeps exhausting needs a larger reserve.

use crate::reserve::BlockSource;

/// Cumulative counters for one tier.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TierStats {
    /// Tier name.
    pub name: String,
    /// Block size in bytes.
    pub block_size: usize,
    /// Successful acquisitions.
    pub granted: u64,
    /// Acquisitions served from the pre-charged reserve.
    pub reserve_hits: u64,
    /// Successful releases.
    pub released: u64,
    /// Requests that found the tier exhausted.
    pub exhausted: u64,
    /// Acquisitions rolled back because the tracking table could not grow.
    pub bookkeeping_failures: u64,
    /// Times the tracking table grew by a slot.
    pub table_growths: u64,
    /// Blocks currently on loan.
    pub outstanding: u64,
    /// High-water mark of `outstanding`.
    pub peak_outstanding: u64,
}

impl TierStats {
    pub(crate) fn new(name: &str, block_size: usize) -> Self {
        Self {
            name: name.to_string(),
            block_size,
            ..Self::default()
        }
    }

    /// Fraction of grants that drew on the reserve, in `[0.0, 1.0]`.
    pub fn reserve_hit_ratio(&self) -> f64 {
        if self.granted == 0 {
            return 0.0;
        }
        self.reserve_hits as f64 / self.granted as f64
    }

    pub(crate) fn record_grant(&mut self, source: BlockSource, grew: bool) {
        self.granted += 1;
        if source == BlockSource::Reserve {
            self.reserve_hits += 1;
        }
        if grew {
            self.table_growths += 1;
        }
        self.outstanding += 1;
        self.peak_outstanding = self.peak_outstanding.max(self.outstanding);
    }

    pub(crate) fn record_release(&mut self) {
        self.released += 1;
        self.outstanding = self.outstanding.saturating_sub(1);
    }
}

/// Cumulative counters for a whole pool set.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PoolStats {
    /// Per-tier counters, in tier order.
    pub tiers: Vec<TierStats>,
    /// Requests smaller than the smallest tier.
    pub below_threshold: u64,
    /// Requests no live tier was large enough for.
    pub no_suitable_tier: u64,
    /// Releases of addresses no tier claimed.
    pub unknown_releases: u64,
}

impl PoolStats {
    /// Looks up a tier's counters by name.
    pub fn tier(&self, name: &str) -> Option<&TierStats> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// Blocks on loan across all tiers.
    pub fn total_outstanding(&self) -> u64 {
        self.tiers.iter().map(|t| t.outstanding).sum()
    }

    /// Successful acquisitions across all tiers.
    pub fn total_granted(&self) -> u64 {
        self.tiers.iter().map(|t| t.granted).sum()
    }

    /// Failed acquisitions of any kind.
    pub fn total_failures(&self) -> u64 {
        self.below_threshold
            + self.no_suitable_tier
            + self
                .tiers
                .iter()
                .map(|t| t.exhausted + t.bookkeeping_failures)
                .sum::<u64>()
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let reserve_hits: u64 = self.tiers.iter().map(|t| t.reserve_hits).sum();
        format!(
            "Pool: {} granted ({} from reserve), {} outstanding, {} failed, \
             {} below threshold, {} unknown releases",
            self.total_granted(),
            reserve_hits,
            self.total_outstanding(),
            self.total_failures(),
            self.below_threshold,
            self.unknown_releases,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = TierStats::new("pool-8k", 8192);
        assert_eq!(s.granted, 0);
        assert_eq!(s.reserve_hit_ratio(), 0.0);
    }

    #[test]
    fn test_grant_and_release() {
        let mut s = TierStats::new("pool-8k", 8192);
        s.record_grant(BlockSource::Cache, false);
        s.record_grant(BlockSource::Reserve, true);
        s.record_release();

        assert_eq!(s.granted, 2);
        assert_eq!(s.reserve_hits, 1);
        assert_eq!(s.table_growths, 1);
        assert_eq!(s.outstanding, 1);
        assert_eq!(s.peak_outstanding, 2);
        assert!((s.reserve_hit_ratio() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_pool_totals() {
        let mut a = TierStats::new("a", 8192);
        a.record_grant(BlockSource::Cache, false);
        a.exhausted = 2;
        let mut b = TierStats::new("b", 16384);
        b.record_grant(BlockSource::Cache, false);
        b.bookkeeping_failures = 1;

        let pool = PoolStats {
            tiers: vec![a, b],
            below_threshold: 3,
            no_suitable_tier: 1,
            unknown_releases: 0,
        };
        assert_eq!(pool.total_granted(), 2);
        assert_eq!(pool.total_outstanding(), 2);
        assert_eq!(pool.total_failures(), 7);
        assert_eq!(pool.tier("b").unwrap().block_size, 16384);
    }

    #[test]
    fn test_summary() {
        let mut a = TierStats::new("a", 8192);
        a.record_grant(BlockSource::Reserve, false);
        let pool = PoolStats {
            tiers: vec![a],
            ..PoolStats::default()
        };
        let summary = pool.summary();
        assert!(summary.contains("1 granted"));
        assert!(summary.contains("1 from reserve"));
        assert!(summary.contains("1 outstanding"));
    }

    #[test]
    fn test_serializes_to_json() {
        let mut a = TierStats::new("pool-8k", 8192);
        a.record_grant(BlockSource::Cache, true);
        let pool = PoolStats {
            tiers: vec![a],
            unknown_releases: 3,
            ..PoolStats::default()
        };

        let json = serde_json::to_value(&pool).unwrap();
        assert_eq!(json["unknown_releases"], 3);
        assert_eq!(json["tiers"][0]["name"], "pool-8k");
        assert_eq!(json["tiers"][0]["table_growths"], 1);
    }
}
