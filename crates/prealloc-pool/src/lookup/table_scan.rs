// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Table-scan lookup.
//!
//! The portable baseline: probe every live tier's tracking table in order
//! until one of them releases the address. The bookkeeping lock is taken
//! once per probed tier, never across the whole scan.

use crate::lookup::{OwnerLookup, TierView};

/// Finds the owner by scanning tracking tables.
#[derive(Debug, Clone, Default)]
pub struct TableScan;

impl TableScan {
    pub fn new() -> Self {
        Self
    }
}

impl OwnerLookup for TableScan {
    fn name(&self) -> &str {
        "table-scan"
    }

    fn claim(&self, view: &TierView<'_>, addr: usize) -> Option<usize> {
        view.tiers()
            .iter()
            .enumerate()
            .filter(|(_, tier)| tier.is_available())
            .find_map(|(idx, _)| view.unrecord(idx, addr).map(|_| idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::Tier;
    use crate::tracking::TrackingTable;
    use crate::PoolConfig;
    use device_profile::TierSpec;
    use parking_lot::Mutex;

    fn tiers() -> (Vec<Tier>, Mutex<Vec<TrackingTable>>) {
        let config = PoolConfig::default();
        let (a, ta) = Tier::build(TierSpec::from_bytes(4096, 1).unwrap(), &config);
        let (b, tb) = Tier::build(TierSpec::from_bytes(8192, 1).unwrap(), &config);
        (vec![a, b], Mutex::new(vec![ta, tb]))
    }

    #[test]
    fn test_claims_from_owning_table() {
        let (tiers, tables) = tiers();
        tables.lock()[1].insert(0x10000, None).unwrap();

        let view = TierView::new(&tiers, &tables);
        assert_eq!(TableScan::new().claim(&view, 0x10000), Some(1));
        assert_eq!(tables.lock()[1].occupied(), 0);
    }

    #[test]
    fn test_unknown_address() {
        let (tiers, tables) = tiers();
        let view = TierView::new(&tiers, &tables);
        assert_eq!(TableScan::new().claim(&view, 0xdead000), None);
    }

    #[test]
    fn test_second_claim_fails() {
        let (tiers, tables) = tiers();
        tables.lock()[0].insert(0x20000, None).unwrap();

        let view = TierView::new(&tiers, &tables);
        assert_eq!(TableScan::new().claim(&view, 0x20000), Some(0));
        assert_eq!(TableScan::new().claim(&view, 0x20000), None);
    }
}
