// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fixed-layout backing caches and the page-owner registry.
//!
//! A [`SlabCache`] hands out blocks of one size from the system allocator.
//! Blocks are page-aligned, so every page frame a block covers belongs to
//! exactly one cache. Each cache records its frames in a process-wide
//! registry; [`page_owner`] maps any address inside a live block back to
//! the cache that produced it. Direct-mapping release relies on this.

use crate::PoolError;
use dashmap::DashMap;
use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::LazyLock;

/// Granularity of the page-owner registry. Every block starts on a frame
/// boundary.
pub const PAGE_SIZE: usize = 4096;

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

/// Page frame number → owning cache.
static PAGE_OWNERS: LazyLock<DashMap<usize, CacheId>> = LazyLock::new(DashMap::new);

/// Process-unique identity of a [`SlabCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheId(u64);

/// Returns the cache whose live block covers `addr`, if any.
pub fn page_owner(addr: usize) -> Option<CacheId> {
    PAGE_OWNERS.get(&(addr / PAGE_SIZE)).map(|entry| *entry)
}

/// A backing allocator for blocks of a single size.
///
/// `alloc` and `free` never take a lock of their own: the live count is an
/// atomic and the registry is a sharded concurrent map.
pub struct SlabCache {
    id: CacheId,
    name: String,
    layout: Layout,
    live: AtomicUsize,
    limit: Option<usize>,
}

impl SlabCache {
    /// Creates a cache for `block_size`-byte blocks. `limit` caps the number
    /// of blocks alive at once; `None` leaves it to the system allocator.
    pub fn new(name: &str, block_size: usize, limit: Option<usize>) -> Result<Self, PoolError> {
        let layout = Layout::from_size_align(block_size.max(1), PAGE_SIZE).map_err(|e| {
            PoolError::ConstructionFailure {
                tier: name.to_string(),
                reason: format!("invalid block layout: {e}"),
            }
        })?;

        Ok(Self {
            id: CacheId(NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            layout,
            live: AtomicUsize::new(0),
            limit,
        })
    }

    pub fn id(&self) -> CacheId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_size(&self) -> usize {
        self.layout.size()
    }

    /// Blocks currently handed out by this cache.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Allocates one block, or `None` when the limit is reached or the
    /// system allocator fails.
    pub fn alloc(&self) -> Option<NonNull<u8>> {
        match self.limit {
            Some(limit) => {
                self.live
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
                    .ok()?;
            }
            None => {
                self.live.fetch_add(1, Ordering::AcqRel);
            }
        }

        // SAFETY: the layout has a non-zero size.
        let raw = unsafe { std::alloc::alloc(self.layout) };
        let Some(block) = NonNull::new(raw) else {
            self.live.fetch_sub(1, Ordering::AcqRel);
            return None;
        };

        for frame in self.frames(block) {
            PAGE_OWNERS.insert(frame, self.id);
        }
        Some(block)
    }

    /// Returns a block to the system allocator.
    ///
    /// # Safety
    /// `block` must have come from [`SlabCache::alloc`] on this cache and
    /// must not have been freed since.
    pub unsafe fn free(&self, block: NonNull<u8>) {
        for frame in self.frames(block) {
            PAGE_OWNERS.remove(&frame);
        }
        // SAFETY: guaranteed by the caller.
        unsafe { std::alloc::dealloc(block.as_ptr(), self.layout) };
        self.live.fetch_sub(1, Ordering::AcqRel);
    }

    fn frames(&self, block: NonNull<u8>) -> std::ops::Range<usize> {
        let start = block.as_ptr() as usize;
        let end = start + self.layout.size() - 1;
        (start / PAGE_SIZE)..(end / PAGE_SIZE + 1)
    }
}

impl Drop for SlabCache {
    fn drop(&mut self) {
        let remaining = self.live();
        if remaining > 0 {
            // Blocks still on loan cannot be reclaimed; they stay allocated.
            tracing::error!(
                "slab cache '{}' destroyed with {remaining} objects remaining",
                self.name
            );
        }
    }
}

impl std::fmt::Debug for SlabCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlabCache")
            .field("name", &self.name)
            .field("block_size", &self.block_size())
            .field("live", &self.live())
            .field("limit", &self.limit)
            .finish()
    }
}
