// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Process-wide pool set handle.
//!
//! Lifecycle: uninitialised → initialised (profile bound) → torn down.
//! Acquiring before [`initialize`] fails, releasing before it reports "not
//! released", and [`deinit`] without a live pool set does nothing.
//! Initialising twice tears down the previous set with a warning.
//!
//! The handle lock is only held long enough to clone the current
//! [`PoolSet`]; allocation and release run outside it.

use crate::{LeakReport, PoolConfig, PoolError, PoolSet};
use device_profile::{DeviceId, ProfileTable};
use parking_lot::RwLock;
use std::ptr::NonNull;

static ACTIVE: RwLock<Option<PoolSet>> = parking_lot::const_rwlock(None);

/// Initialises the global pool set for `profile` from the built-in table
/// with default configuration. Unknown device ids get the default profile.
pub fn initialize(profile: u64) -> Result<(), PoolError> {
    initialize_with(&ProfileTable::builtin(), DeviceId(profile), PoolConfig::default())
}

/// Initialises the global pool set from an explicit table and config.
pub fn initialize_with(
    table: &ProfileTable,
    device: DeviceId,
    config: PoolConfig,
) -> Result<(), PoolError> {
    install(PoolSet::for_device(table, device, config)?);
    Ok(())
}

/// Installs a pre-built pool set as the global one.
pub fn install(pool: PoolSet) {
    let previous = ACTIVE.write().replace(pool);
    if let Some(previous) = previous {
        tracing::warn!(
            "re-initialised without deinit; tearing down '{}'",
            previous.profile_name()
        );
        previous.teardown();
    }
}

/// Tears down the global pool set. Outstanding blocks are reported as
/// leaks. No-op if nothing is initialised.
pub fn deinit() {
    let Some(pool) = ACTIVE.write().take() else {
        tracing::debug!("deinit: pool set not initialised");
        return;
    };
    pool.teardown();
}

/// Returns a handle to the current pool set.
pub fn current() -> Option<PoolSet> {
    ACTIVE.read().clone()
}

pub fn is_initialized() -> bool {
    ACTIVE.read().is_some()
}

/// Like [`acquire`], but reports why the request failed.
pub fn try_acquire(size: usize) -> Result<NonNull<u8>, PoolError> {
    current().ok_or(PoolError::NotInitialized)?.acquire(size)
}

/// Acquires a block of at least `size` bytes from the global pool set.
pub fn acquire(size: usize) -> Option<NonNull<u8>> {
    try_acquire(size).ok()
}

/// Releases `ptr` to the global pool set; `false` if it was null, not ours,
/// already released, or no pool set is initialised.
pub fn release(ptr: *mut u8) -> bool {
    current().is_some_and(|pool| pool.release(ptr))
}

/// Lists blocks still on loan from the global pool set.
pub fn audit_leaks() -> LeakReport {
    current().map(|pool| pool.audit_leaks()).unwrap_or_default()
}
