// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # prealloc-pool
//!
//! A tiered, pre-reserved block allocator for code that must get memory
//! even when the general allocator cannot be trusted: atomic sections,
//! callers that may not sleep, or a system under memory pressure.
//!
//! # Key Components
//!
//! - [`PoolSet`]: the allocator facade (threshold check, tier selection,
//!   bookkeeping, release lookup, leak audit) for one device profile.
//! - Tiers: one fixed block size each, backed by a [`ReservePool`]
//!   pre-charged with a minimum number of blocks, and a tracking table of
//!   blocks on loan that grows one slot at a time.
//! - [`OwnerLookup`]: maps a released address back to its tier, via
//!   [`TableScan`](lookup::TableScan) or
//!   [`DirectMapping`](lookup::DirectMapping).
//! - [`ExecutionContext`]: decides whether an acquire may wait for a block.
//! - [`BlockGuard`]: RAII wrapper that releases its block on drop.
//! - [`global`]: the process-wide handle with `initialize`/`deinit`.
//!
//! # Ownership Model
//!
//! ```text
//! PoolSet::acquire(size)
//!       │  first live tier with block_size >= size
//!       ▼
//!   ReservePool::alloc ──► backing cache, then reserve, then wait
//!       │
//!       ▼
//!   TrackingTable::insert  (under the bookkeeping lock)
//!       │
//!       ▼
//!   NonNull<u8>  ──► PoolSet::release ──► OwnerLookup::claim ──► ReservePool::free
//! ```
//!
//! # Example
//! ```
//! use device_profile::{DeviceId, ProfileTable};
//! use prealloc_pool::{PoolConfig, PoolSet};
//!
//! let pool = PoolSet::for_device(
//!     &ProfileTable::builtin(),
//!     DeviceId::ADRASTEA,
//!     PoolConfig::default(),
//! ).unwrap();
//!
//! let block = pool.acquire(20 * 1024).unwrap(); // served by the 32K tier
//! assert_eq!(pool.audit_leaks().len(), 1);
//!
//! assert!(pool.release(block.as_ptr()));
//! assert!(pool.audit_leaks().is_clean());
//! ```

mod audit;
mod config;
pub mod context;
mod error;
pub mod global;
mod guard;
pub mod lookup;
mod pool;
mod reserve;
pub mod slab;
mod stats;
mod tier;
mod tracking;

pub use audit::{LeakEntry, LeakReport};
pub use config::PoolConfig;
pub use context::{AllocMode, ExecutionContext};
pub use error::PoolError;
pub use guard::BlockGuard;
pub use lookup::OwnerLookup;
pub use pool::PoolSet;
pub use reserve::{BlockSource, ReservePool};
pub use stats::{PoolStats, TierStats};
pub use tier::{Tier, TierSnapshot};
