// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The pool set: an ordered collection of tiers for one device profile.
//!
//! [`PoolSet`] is the allocator facade. It:
//!
//! 1. Rejects requests below the smallest tier's block size, so the general
//!    allocator keeps serving small objects.
//! 2. Selects the first live tier whose block size covers the request and
//!    draws one block from its reserve, in the blocking mode the caller's
//!    [`ExecutionContext`] allows.
//! 3. Records every block it hands out in that tier's tracking table before
//!    returning it, and rolls the block back if the record cannot be made.
//! 4. Finds the owning tier on release through the configured
//!    [`OwnerLookup`] strategy.
//!
//! There is no overflow to larger tiers: when the selected tier is
//! exhausted the request fails and the caller decides whether to retry at a
//! larger size.
//!
//! # Thread Safety
//! `PoolSet` is `Send + Sync` and cheap to clone; clones share one set of
//! tiers. All tracking tables sit behind a single bookkeeping mutex which is
//! never held across a block allocation or free.

use crate::audit::{LeakEntry, LeakReport};
use crate::context::{AllocMode, ExecutionContext, ThreadContext};
use crate::lookup::{OwnerLookup, TierView};
use crate::stats::{PoolStats, TierStats};
use crate::tier::{Tier, TierSnapshot};
use crate::tracking::{GrowthRefused, TrackingTable};
use crate::{BlockGuard, PoolConfig, PoolError};
use device_profile::{DeviceId, Profile, ProfileTable, TierSpec};
use parking_lot::{Mutex, RwLock};
use std::ptr::NonNull;
use std::sync::Arc;

/// Shared pool-set state, held by every [`PoolSet`] clone and every
/// outstanding [`BlockGuard`].
pub struct PoolSetInner {
    profile: String,
    tiers: Vec<Tier>,
    /// One table per tier, indexed like `tiers`.
    tables: Mutex<Vec<TrackingTable>>,
    stats: Mutex<PoolStats>,
    lookup: Box<dyn OwnerLookup>,
    context: RwLock<Arc<dyn ExecutionContext>>,
    config: PoolConfig,
    threshold: usize,
}

impl PoolSetInner {
    fn build(profile: &Profile, config: PoolConfig) -> Result<Self, PoolError> {
        profile.validate()?;
        config.validate()?;
        let lookup = config.create_lookup()?;

        let mut tiers = Vec::with_capacity(profile.tiers.len());
        let mut tables = Vec::with_capacity(profile.tiers.len());
        let mut stats = PoolStats::default();

        for spec in &profile.tiers {
            let spec = if spec.name.trim().is_empty() {
                spec.clone().with_name(TierSpec::default_name(spec.block_size))
            } else {
                spec.clone()
            };
            let (tier, table) = Tier::build(spec, &config);
            stats.tiers.push(TierStats::new(tier.name(), tier.block_size()));
            tiers.push(tier);
            tables.push(table);
        }

        let threshold = tiers.first().map(Tier::block_size).unwrap_or(usize::MAX);
        let live = tiers.iter().filter(|t| t.is_available()).count();
        if live < tiers.len() {
            tracing::warn!(
                "profile '{}': {} of {} tiers degraded",
                profile.name,
                tiers.len() - live,
                tiers.len(),
            );
        }
        tracing::debug!(
            "pool set '{}' ready: {} tiers, threshold {} bytes, {} lookup",
            profile.name,
            tiers.len(),
            threshold,
            lookup.name(),
        );

        Ok(Self {
            profile: profile.name.clone(),
            tiers,
            tables: Mutex::new(tables),
            stats: Mutex::new(stats),
            lookup,
            context: RwLock::new(Arc::new(ThreadContext)),
            config,
            threshold,
        })
    }

    /// Draws one block for `size` bytes. Returns the block and the block
    /// size of the tier that served it.
    pub(crate) fn grant(
        &self,
        size: usize,
        mode: AllocMode,
    ) -> Result<(NonNull<u8>, usize), PoolError> {
        if size < self.threshold {
            self.stats.lock().below_threshold += 1;
            return Err(PoolError::BelowThreshold {
                size,
                threshold: self.threshold,
            });
        }

        let Some(idx) = self.tiers.iter().position(|t| t.serves(size)) else {
            self.stats.lock().no_suitable_tier += 1;
            tracing::error!("no tier available for size {size}, {mode}");
            return Err(PoolError::NoSuitableTier { size });
        };
        let tier = &self.tiers[idx];
        let Some(reserve) = tier.reserve() else {
            return Err(PoolError::NoSuitableTier { size });
        };

        let Some((block, source)) = reserve.alloc(mode) else {
            self.stats.lock().tiers[idx].exhausted += 1;
            tracing::error!("{} not available for size {size}, {mode}", tier.name());
            return Err(PoolError::TierExhausted {
                tier: tier.name().to_string(),
                size,
                mode,
            });
        };

        if self.config.zero_blocks {
            // SAFETY: the block is `block_size` bytes long and exclusively ours
            // until it is handed out below.
            unsafe { std::ptr::write_bytes(block.as_ptr(), 0, tier.block_size()) };
        }

        let addr = block.as_ptr() as usize;
        let inserted = {
            let mut tables = self.tables.lock();
            let table = &mut tables[idx];
            let result = table.insert(addr, self.config.max_tracking_capacity);
            (result, table.capacity())
        };

        match inserted {
            (Ok(insertion), capacity) => {
                if insertion.grew {
                    tracing::debug!(
                        "{} tracking table full, increasing size to {}",
                        tier.name(),
                        capacity,
                    );
                }
                self.stats.lock().tiers[idx].record_grant(source, insertion.grew);
                Ok((block, tier.block_size()))
            }
            (Err(refused), capacity) => {
                reserve.free(block);
                self.stats.lock().tiers[idx].bookkeeping_failures += 1;
                match refused {
                    GrowthRefused::Ceiling => tracing::error!(
                        "{} tracking table at its ceiling of {capacity} slots; block rolled back",
                        tier.name(),
                    ),
                    GrowthRefused::OutOfMemory => tracing::error!(
                        "{} tracking table cannot grow past {capacity} slots; block rolled back",
                        tier.name(),
                    ),
                }
                Err(PoolError::BookkeepingOverflow {
                    tier: tier.name().to_string(),
                    capacity,
                })
            }
        }
    }

    /// Returns `addr` to its owning tier. Returns that tier's block size.
    pub(crate) fn reclaim(&self, addr: usize) -> Result<usize, PoolError> {
        if addr == 0 {
            return Err(PoolError::UnknownPointer { addr });
        }

        let view = TierView::new(&self.tiers, &self.tables);
        let Some(idx) = self.lookup.claim(&view, addr) else {
            self.stats.lock().unknown_releases += 1;
            tracing::debug!("release of {addr:#x}: no tier claims it");
            return Err(PoolError::UnknownPointer { addr });
        };

        let tier = &self.tiers[idx];
        let Some(reserve) = tier.reserve() else {
            tracing::error!("{addr:#x} claimed by destroyed tier {}", tier.name());
            return Err(PoolError::UnknownPointer { addr });
        };

        // A non-null address recorded in a tracking table is always a block
        // this tier's reserve handed out.
        if let Some(block) = NonNull::new(addr as *mut u8) {
            reserve.free(block);
        }
        self.stats.lock().tiers[idx].record_release();
        Ok(tier.block_size())
    }

    fn collect_leaks(&self) -> LeakReport {
        let entries: Vec<LeakEntry> = {
            let tables = self.tables.lock();
            self.tiers
                .iter()
                .zip(tables.iter())
                .flat_map(|(tier, table)| {
                    table.entries().map(move |(slot, addr)| LeakEntry {
                        tier: tier.name().to_string(),
                        slot,
                        addr,
                    })
                })
                .collect()
        };

        for entry in &entries {
            tracing::error!("{entry}");
        }
        LeakReport { entries }
    }
}

impl Drop for PoolSetInner {
    fn drop(&mut self) {
        let leaks = self.collect_leaks();
        if !leaks.is_clean() {
            tracing::error!(
                "pool set '{}' torn down with {} blocks still on loan",
                self.profile,
                leaks.len(),
            );
        }
        for tier in &mut self.tiers {
            tier.destroy();
        }
    }
}

/// The allocator facade over one profile's tiers.
///
/// # Example
/// ```
/// use device_profile::{Profile, TierSpec};
/// use prealloc_pool::{PoolConfig, PoolSet};
///
/// let profile = Profile::new(
///     "demo",
///     vec![],
///     vec![
///         TierSpec::from_bytes(8192, 2).unwrap(),
///         TierSpec::from_bytes(16384, 2).unwrap(),
///     ],
/// );
/// let pool = PoolSet::new(&profile, PoolConfig::default()).unwrap();
///
/// // 10 000 bytes does not fit the 8K tier, so the 16K tier serves it.
/// let block = pool.acquire(10_000).unwrap();
/// assert_eq!(pool.stats().tier("pool-16k").unwrap().outstanding, 1);
///
/// assert!(pool.release(block.as_ptr()));
/// assert!(!pool.release(block.as_ptr()));
/// ```
#[derive(Clone)]
pub struct PoolSet {
    inner: Arc<PoolSetInner>,
}

impl PoolSet {
    /// Builds every tier of `profile`. Tiers whose construction fails are
    /// logged and left degraded; only an invalid profile or config is an
    /// error.
    pub fn new(profile: &Profile, config: PoolConfig) -> Result<Self, PoolError> {
        Ok(Self {
            inner: Arc::new(PoolSetInner::build(profile, config)?),
        })
    }

    /// Builds an ad-hoc pool set from a tier list.
    pub fn from_specs(specs: &[TierSpec], config: PoolConfig) -> Result<Self, PoolError> {
        Self::new(&Profile::new("custom", Vec::new(), specs.to_vec()), config)
    }

    /// Resolves `device` through `table` and builds its profile.
    pub fn for_device(
        table: &ProfileTable,
        device: DeviceId,
        config: PoolConfig,
    ) -> Result<Self, PoolError> {
        let profile = table.resolve(device);
        tracing::info!("device {device}: using profile '{}'", profile.name);
        Self::new(profile, config)
    }

    /// Replaces the execution context used to pick the blocking mode.
    pub fn with_context(self, context: Arc<dyn ExecutionContext>) -> Self {
        *self.inner.context.write() = context;
        self
    }

    /// Acquires a block of at least `size` bytes in the blocking mode the
    /// current execution context permits.
    pub fn acquire(&self, size: usize) -> Result<NonNull<u8>, PoolError> {
        let mode = self.inner.context.read().alloc_mode();
        self.acquire_with(size, mode)
    }

    /// Acquires a block of at least `size` bytes in an explicit mode.
    pub fn acquire_with(&self, size: usize, mode: AllocMode) -> Result<NonNull<u8>, PoolError> {
        self.inner.grant(size, mode).map(|(block, _)| block)
    }

    /// Acquires a block wrapped in a guard that releases it on drop.
    pub fn acquire_block(&self, size: usize) -> Result<BlockGuard, PoolError> {
        let mode = self.inner.context.read().alloc_mode();
        let (block, len) = self.inner.grant(size, mode)?;
        Ok(BlockGuard::new(block, len, Arc::clone(&self.inner)))
    }

    /// Releases `ptr`. Returns the owning tier's block size, or
    /// `UnknownPointer` for null, foreign or already-released addresses.
    pub fn try_release(&self, ptr: *mut u8) -> Result<usize, PoolError> {
        self.inner.reclaim(ptr as usize)
    }

    /// Releases `ptr`; `false` if no tier owned it.
    pub fn release(&self, ptr: *mut u8) -> bool {
        self.try_release(ptr).is_ok()
    }

    /// Lists every block still on loan. Each entry is also logged at error
    /// level. Nothing is freed.
    pub fn audit_leaks(&self) -> LeakReport {
        self.inner.collect_leaks()
    }

    /// Returns a snapshot of allocation statistics.
    pub fn stats(&self) -> PoolStats {
        self.inner.stats.lock().clone()
    }

    /// Returns the current state of every tier, in ascending size order.
    pub fn tiers(&self) -> Vec<TierSnapshot> {
        let tables = self.inner.tables.lock();
        self.inner
            .tiers
            .iter()
            .zip(tables.iter())
            .map(|(tier, table)| TierSnapshot {
                name: tier.name().to_string(),
                block_size: tier.block_size(),
                reserve_min: tier.reserve_min(),
                reserve_available: tier.reserve().map_or(0, |r| r.available()),
                table_capacity: table.capacity(),
                occupied: table.occupied(),
                degraded: !tier.is_available(),
            })
            .collect()
    }

    /// Smallest request size this pool set engages for.
    pub fn threshold(&self) -> usize {
        self.inner.threshold
    }

    pub fn profile_name(&self) -> &str {
        &self.inner.profile
    }

    /// Name of the release lookup strategy in use.
    pub fn lookup_name(&self) -> &str {
        self.inner.lookup.name()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Drops this handle. Tiers are destroyed once the last handle and the
    /// last [`BlockGuard`] are gone; outstanding blocks are reported as
    /// leaks at that point.
    pub fn teardown(self) {
        let handles = Arc::strong_count(&self.inner);
        if handles > 1 {
            tracing::warn!(
                "teardown of '{}' deferred: {} other handles alive",
                self.inner.profile,
                handles - 1,
            );
        }
    }
}

impl std::fmt::Debug for PoolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolSet")
            .field("profile", &self.inner.profile)
            .field("tiers", &self.inner.tiers.len())
            .field("threshold", &self.inner.threshold)
            .field("lookup", &self.lookup_name())
            .finish()
    }
}
