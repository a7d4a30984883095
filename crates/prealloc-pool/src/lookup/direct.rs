// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Direct-mapping lookup.
//!
//! Maps the address to its page frame, the frame to the slab cache that
//! produced it, and the cache to a tier. Only that tier's table is touched.
//! Addresses from foreign allocators or from another pool set's caches
//! resolve to no tier here and are refused.

use crate::lookup::{OwnerLookup, TierView};
use crate::slab;

/// Finds the owner through the page-owner registry.
#[derive(Debug, Clone, Default)]
pub struct DirectMapping;

impl DirectMapping {
    pub fn new() -> Self {
        Self
    }
}

impl OwnerLookup for DirectMapping {
    fn name(&self) -> &str {
        "direct-mapping"
    }

    fn claim(&self, view: &TierView<'_>, addr: usize) -> Option<usize> {
        let owner = slab::page_owner(addr)?;
        let idx = view
            .tiers()
            .iter()
            .position(|tier| tier.cache_id() == Some(owner))?;
        view.unrecord(idx, addr).map(|_| idx)
    }
}
