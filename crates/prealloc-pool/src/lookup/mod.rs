// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`OwnerLookup`] trait and release lookup strategies.
//!
//! A released address carries no tier identity, so the pool has to find
//! the owner before it can return the block:
//!
//! | Strategy | How the owner is found | Cost |
//! |---|---|---|
//! | [`TableScan`] | Probe each tier's tracking table | O(total slots) |
//! | [`DirectMapping`] | Page-owner registry → backing cache → tier | O(1) + one table scan |
//!
//! Both strategies clear the tracking slot as part of the claim, so a
//! second release of the same address fails under either.

pub mod direct;
pub mod table_scan;

pub use direct::DirectMapping;
pub use table_scan::TableScan;

use crate::tier::Tier;
use crate::tracking::TrackingTable;
use parking_lot::Mutex;

/// Trait for release lookup strategies.
///
/// Implementations must be callable from any context: they may take the
/// bookkeeping lock briefly but must never block otherwise.
pub trait OwnerLookup: Send + Sync {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Finds the tier `addr` is on loan from, clears its tracking slot and
    /// returns the tier index. `None` if no tier claims the address.
    fn claim(&self, view: &TierView<'_>, addr: usize) -> Option<usize>;
}

/// The tiers of a pool set together with their tracking tables.
pub struct TierView<'a> {
    tiers: &'a [Tier],
    tables: &'a Mutex<Vec<TrackingTable>>,
}

impl<'a> TierView<'a> {
    pub(crate) fn new(tiers: &'a [Tier], tables: &'a Mutex<Vec<TrackingTable>>) -> Self {
        Self { tiers, tables }
    }

    /// Tiers in ascending block-size order.
    pub fn tiers(&self) -> &'a [Tier] {
        self.tiers
    }

    /// Removes `addr` from tier `idx`'s table under the bookkeeping lock.
    /// Returns the slot it occupied.
    pub fn unrecord(&self, idx: usize, addr: usize) -> Option<usize> {
        let removed = {
            let mut tables = self.tables.lock();
            tables.get_mut(idx)?.remove(addr)
        };

        if removed.is_none() {
            if let Some(tier) = self.tiers.get(idx) {
                tracing::debug!("{addr:#x} not found in {} table", tier.name());
            }
        }
        removed
    }
}
