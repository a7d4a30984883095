// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-tier tracking tables.
//!
//! A [`TrackingTable`] records every block currently on loan from a tier.
//! Slots are scanned linearly; a full table grows by exactly one slot. The
//! table starts at the tier's reserve minimum, and only bursts beyond that
//! many concurrent loans ever make it grow.
//!
//! Tables carry no lock of their own: the pool set keeps all of them behind
//! a single bookkeeping mutex.

/// Result of a successful [`TrackingTable::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Slot now holding the address.
    pub slot: usize,
    /// Whether the table had to grow to make room.
    pub grew: bool,
}

/// Why a full table could not grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthRefused {
    /// The configured capacity ceiling was reached.
    Ceiling,
    /// The allocator could not provide one more slot.
    OutOfMemory,
}

/// Growable array of on-loan block addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingTable {
    slots: Vec<Option<usize>>,
}

impl TrackingTable {
    /// Creates a table with `capacity` empty slots.
    pub fn with_capacity(capacity: usize) -> Result<Self, std::collections::TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize(capacity, None);
        Ok(Self { slots })
    }

    /// Number of slots, occupied or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[cfg(test)]
    pub fn contains(&self, addr: usize) -> bool {
        self.slots.contains(&Some(addr))
    }

    /// Records `addr` in the first empty slot, growing by one slot if the
    /// table is full. `ceiling` bounds the capacity growth may reach.
    pub fn insert(&mut self, addr: usize, ceiling: Option<usize>) -> Result<Insertion, GrowthRefused> {
        if let Some(slot) = self.slots.iter().position(Option::is_none) {
            self.slots[slot] = Some(addr);
            return Ok(Insertion { slot, grew: false });
        }

        if ceiling.is_some_and(|max| self.slots.len() >= max) {
            return Err(GrowthRefused::Ceiling);
        }
        self.slots
            .try_reserve_exact(1)
            .map_err(|_| GrowthRefused::OutOfMemory)?;

        let slot = self.slots.len();
        self.slots.push(Some(addr));
        Ok(Insertion { slot, grew: true })
    }

    /// Clears the slot holding `addr` and returns its index, or `None` if
    /// the address is not recorded here.
    pub fn remove(&mut self, addr: usize) -> Option<usize> {
        let slot = self.slots.iter().position(|s| *s == Some(addr))?;
        self.slots[slot] = None;
        Some(slot)
    }

    /// Occupied slots as `(slot, address)` pairs, in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, addr)| addr.map(|a| (slot, a)))
    }
}
