// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII block guard that releases its block to the pool set on drop.
//!
//! A [`BlockGuard`] keeps the pool set alive through a shared handle, so a
//! block can never outlive the tier it came from. Use
//! [`BlockGuard::into_raw`] to hand the block to code that will call
//! [`PoolSet::release`](crate::PoolSet::release) itself.

use crate::pool::PoolSetInner;
use std::ptr::NonNull;
use std::sync::Arc;

/// An RAII guard over one pool block.
///
/// # Example
/// ```
/// use prealloc_pool::{PoolConfig, PoolSet};
/// use device_profile::TierSpec;
///
/// let pool = PoolSet::from_specs(
///     &[TierSpec::from_bytes(4096, 1).unwrap()],
///     PoolConfig::default(),
/// ).unwrap();
///
/// let mut block = pool.acquire_block(4000).unwrap();
/// assert_eq!(block.size_bytes(), 4096);
/// block.as_mut_slice()[0] = 7;
/// drop(block); // returned to the 4K tier
/// assert_eq!(pool.stats().total_outstanding(), 0);
/// ```
pub struct BlockGuard {
    /// `None` once the block has been released or handed out raw.
    block: Option<NonNull<u8>>,
    /// Block size of the owning tier.
    len: usize,
    pool: Arc<PoolSetInner>,
}

impl BlockGuard {
    pub(crate) fn new(block: NonNull<u8>, len: usize, pool: Arc<PoolSetInner>) -> Self {
        Self {
            block: Some(block),
            len,
            pool,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self.block {
            // SAFETY: the block is `len` bytes, on loan to this guard alone.
            Some(block) => unsafe { std::slice::from_raw_parts(block.as_ptr(), self.len) },
            None => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self.block {
            // SAFETY: as above; `&mut self` makes the access exclusive.
            Some(block) => unsafe { std::slice::from_raw_parts_mut(block.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.block.map_or(std::ptr::null_mut(), NonNull::as_ptr)
    }

    /// Usable size in bytes: the owning tier's block size, which may exceed
    /// the size requested.
    pub fn size_bytes(&self) -> usize {
        self.len
    }

    /// Gives up ownership without releasing. The block stays recorded in its
    /// tier's tracking table until released through the pool set.
    pub fn into_raw(mut self) -> NonNull<u8> {
        match self.block.take() {
            Some(block) => block,
            // A live guard always holds its block; `take` only happens here
            // and in `drop`.
            None => unreachable!("block guard without a block"),
        }
    }
}

impl Drop for BlockGuard {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            if let Err(e) = self.pool.reclaim(block.as_ptr() as usize) {
                tracing::error!("block guard release failed: {e}");
            }
        }
    }
}

// The guard owns its block exclusively, and the pool state behind the Arc
// is Sync. It is NOT Sync: `as_mut_slice` access is unsynchronised.
unsafe impl Send for BlockGuard {}

impl std::fmt::Debug for BlockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockGuard")
            .field("addr", &format_args!("{:#x}", self.as_ptr() as usize))
            .field("size_bytes", &self.len)
            .finish()
    }
}
