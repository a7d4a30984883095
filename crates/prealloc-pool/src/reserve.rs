// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reserve pools: a slab cache plus a pre-charged free list.
//!
//! A [`ReservePool`] guarantees that `min` blocks are obtainable even when
//! the backing cache cannot produce any. Allocation order:
//!
//! 1. Ask the backing cache for a fresh block.
//! 2. Otherwise pop a block from the reserve.
//! 3. Otherwise, in blocking mode only, sleep until a block is returned and
//!    start over. Each sleep is bounded by the retry slice so that blocks
//!    freed straight to the cache are noticed as well.
//!
//! Freed blocks refill the reserve while it is below `min` and go back to
//! the cache otherwise. The reserve vector is sized once at construction,
//! so refilling never allocates.

use crate::slab::{CacheId, SlabCache};
use crate::{AllocMode, PoolError};
use device_profile::TierSpec;
use parking_lot::{Condvar, Mutex};
use std::ptr::NonNull;
use std::time::Duration;

/// Where a granted block came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSource {
    /// Freshly allocated from the backing cache.
    Cache,
    /// Taken from the pre-charged reserve.
    Reserve,
}

/// Reserve-backed allocator for one tier.
pub struct ReservePool {
    cache: SlabCache,
    min: usize,
    reserve: Mutex<Vec<NonNull<u8>>>,
    returned: Condvar,
    wait_slice: Duration,
}

// The raw blocks in the reserve are owned exclusively by the pool and only
// touched under the reserve lock.
unsafe impl Send for ReservePool {}
unsafe impl Sync for ReservePool {}

impl ReservePool {
    /// Creates the backing cache and pre-charges `spec.reserve_min` blocks.
    pub fn new(spec: &TierSpec, wait_slice: Duration) -> Result<Self, PoolError> {
        let cache = SlabCache::new(&spec.name, spec.size_bytes(), spec.max_blocks)?;
        let min = spec.reserve_min;

        let mut reserve = Vec::new();
        reserve
            .try_reserve_exact(min)
            .map_err(|e| PoolError::ConstructionFailure {
                tier: spec.name.clone(),
                reason: format!("cannot size reserve list for {min} blocks: {e}"),
            })?;

        while reserve.len() < min {
            match cache.alloc() {
                Some(block) => reserve.push(block),
                None => {
                    let charged = reserve.len();
                    for block in reserve.drain(..) {
                        // SAFETY: every block in the list came from `cache`.
                        unsafe { cache.free(block) };
                    }
                    return Err(PoolError::ConstructionFailure {
                        tier: spec.name.clone(),
                        reason: format!("pre-charged only {charged} of {min} reserve blocks"),
                    });
                }
            }
        }

        Ok(Self {
            cache,
            min,
            reserve: Mutex::new(reserve),
            returned: Condvar::new(),
            wait_slice,
        })
    }

    /// Obtains one block, or `None` if none is available in `mode`.
    pub fn alloc(&self, mode: AllocMode) -> Option<(NonNull<u8>, BlockSource)> {
        loop {
            if let Some(block) = self.cache.alloc() {
                return Some((block, BlockSource::Cache));
            }

            let mut reserve = self.reserve.lock();
            if let Some(block) = reserve.pop() {
                return Some((block, BlockSource::Reserve));
            }
            if !mode.may_block() {
                return None;
            }
            // A free that ran since the first attempt held this lock.
            if let Some(block) = self.cache.alloc() {
                return Some((block, BlockSource::Cache));
            }

            tracing::trace!("reserve '{}' empty, waiting for a returned block", self.cache.name());
            self.returned.wait_for(&mut reserve, self.wait_slice);
        }
    }

    /// Returns a block obtained from [`ReservePool::alloc`].
    pub fn free(&self, block: NonNull<u8>) {
        let mut reserve = self.reserve.lock();
        if reserve.len() < self.min {
            reserve.push(block);
        } else {
            // SAFETY: blocks handed to `free` were produced by `alloc`, which
            // only yields blocks from this pool's cache.
            unsafe { self.cache.free(block) };
        }
        // Still under the reserve lock, so a waiter cannot park between its
        // last cache attempt and this wakeup.
        self.returned.notify_one();
    }

    /// Process-unique id of the backing cache.
    pub fn cache_id(&self) -> CacheId {
        self.cache.id()
    }

    /// Blocks currently sitting in the reserve.
    pub fn available(&self) -> usize {
        self.reserve.lock().len()
    }

    /// Blocks currently on loan to callers.
    pub fn outstanding(&self) -> usize {
        let reserve = self.reserve.lock();
        self.cache.live().saturating_sub(reserve.len())
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn block_size(&self) -> usize {
        self.cache.block_size()
    }
}

impl Drop for ReservePool {
    fn drop(&mut self) {
        for block in self.reserve.get_mut().drain(..) {
            // SAFETY: reserve blocks came from `cache` and are not on loan.
            unsafe { self.cache.free(block) };
        }
    }
}

impl std::fmt::Debug for ReservePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservePool")
            .field("cache", &self.cache)
            .field("min", &self.min)
            .field("available", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn spec(reserve: usize, max_blocks: Option<usize>) -> TierSpec {
        let spec = TierSpec::from_bytes(8192, reserve).unwrap();
        match max_blocks {
            Some(max) => spec.with_max_blocks(max),
            None => spec,
        }
    }

    #[test]
    fn test_precharge() {
        let pool = ReservePool::new(&spec(3, None), Duration::from_millis(10)).unwrap();
        assert_eq!(pool.available(), 3);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_precharge_failure() {
        let err = ReservePool::new(&spec(3, Some(2)), Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, PoolError::ConstructionFailure { .. }));
    }

    #[test]
    fn test_prefers_cache_then_reserve() {
        let pool = ReservePool::new(&spec(1, Some(2)), Duration::from_millis(10)).unwrap();

        let (a, src_a) = pool.alloc(AllocMode::NonBlocking).unwrap();
        assert_eq!(src_a, BlockSource::Cache);
        let (b, src_b) = pool.alloc(AllocMode::NonBlocking).unwrap();
        assert_eq!(src_b, BlockSource::Reserve);
        assert!(pool.alloc(AllocMode::NonBlocking).is_none());
        assert_eq!(pool.outstanding(), 2);

        pool.free(a);
        pool.free(b);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_free_refills_reserve_first() {
        let pool = ReservePool::new(&spec(1, Some(1)), Duration::from_millis(10)).unwrap();
        let (block, src) = pool.alloc(AllocMode::NonBlocking).unwrap();
        assert_eq!(src, BlockSource::Reserve);
        assert_eq!(pool.available(), 0);

        pool.free(block);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_blocking_waits_for_return() {
        let pool = Arc::new(ReservePool::new(&spec(1, Some(1)), Duration::from_secs(5)).unwrap());
        let (held, _) = pool.alloc(AllocMode::NonBlocking).unwrap();
        let held_addr = held.as_ptr() as usize;

        let waiter = {
            let pool = Arc::clone(&pool);
            std::thread::spawn(move || {
                let start = Instant::now();
                let (block, _) = pool.alloc(AllocMode::Blocking).unwrap();
                let addr = block.as_ptr() as usize;
                pool.free(block);
                (addr, start.elapsed())
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        pool.free(held);

        let (addr, waited) = waiter.join().unwrap();
        assert_eq!(addr, held_addr);
        // Woken by the release, not by the retry slice.
        assert!(waited < Duration::from_secs(5));
    }

    #[test]
    fn test_blocking_wakes_when_block_goes_back_to_cache() {
        // No reserve: every free goes straight back to the cache.
        let pool = Arc::new(ReservePool::new(&spec(0, Some(1)), Duration::from_secs(5)).unwrap());

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut longest = Duration::ZERO;
                    for _ in 0..200 {
                        let start = Instant::now();
                        let (block, src) = pool.alloc(AllocMode::Blocking).unwrap();
                        longest = longest.max(start.elapsed());
                        assert_eq!(src, BlockSource::Cache);
                        pool.free(block);
                    }
                    longest
                })
            })
            .collect();

        for worker in workers {
            let longest = worker.join().unwrap();
            assert!(longest < Duration::from_secs(2), "waited {longest:?} for a returned block");
        }
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.available(), 0);
    }
}
