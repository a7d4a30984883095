// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Concurrency tests: many threads acquiring and releasing random sizes.
//!
//! Every live block is stamped with its owner's pattern and checked before
//! release, and a shared set asserts no address is ever handed out twice.
//! After all threads join, every tracking table must be empty.

use device_profile::TierSpec;
use prealloc_pool::{AllocMode, PoolConfig, PoolError, PoolSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const THREADS: usize = 8;
const ITERATIONS: usize = 300;
const SIZES: [usize; 5] = [4096, 8192, 12_000, 16384, 32768];

fn pool(lookup: &str) -> PoolSet {
    let specs: Vec<TierSpec> = [(8192, 2), (16384, 2), (32768, 2)]
        .iter()
        .map(|&(size, reserve)| TierSpec::from_bytes(size, reserve).unwrap())
        .collect();
    PoolSet::from_specs(&specs, PoolConfig::default().with_lookup(lookup)).unwrap()
}

fn hammer(pool: &PoolSet) {
    let live = Mutex::new(HashSet::new());

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let pool = pool.clone();
            let live = &live;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(t as u64);
                let stamp = t as u8 + 1;
                let mut held: Vec<(usize, usize)> = Vec::new();

                for _ in 0..ITERATIONS {
                    let size = SIZES[rng.gen_range(0..SIZES.len())];
                    match pool.acquire(size) {
                        Ok(block) => {
                            let addr = block.as_ptr() as usize;
                            assert!(live.lock().unwrap().insert(addr), "{addr:#x} handed out twice");
                            // SAFETY: the block is at least `size` bytes and ours.
                            let bytes = unsafe { std::slice::from_raw_parts_mut(block.as_ptr(), size) };
                            assert!(bytes.iter().all(|&b| b == 0));
                            bytes.fill(stamp);
                            held.push((addr, size));
                        }
                        Err(PoolError::BelowThreshold { .. }) => assert!(size < 8192),
                        Err(e) => panic!("unexpected acquire failure: {e}"),
                    }

                    // Keep a few blocks alive so tables grow past the reserve.
                    while held.len() > rng.gen_range(0..6) {
                        let (addr, size) = held.swap_remove(rng.gen_range(0..held.len()));
                        let bytes = unsafe { std::slice::from_raw_parts(addr as *const u8, size) };
                        assert!(bytes.iter().all(|&b| b == stamp), "block {addr:#x} corrupted");
                        assert!(live.lock().unwrap().remove(&addr));
                        assert!(pool.release(addr as *mut u8));
                    }
                }

                for (addr, _) in held {
                    assert!(live.lock().unwrap().remove(&addr));
                    assert!(pool.release(addr as *mut u8));
                }
            });
        }
    });

    assert!(live.lock().unwrap().is_empty());
}

/// One 8K tier whose cache can never hold more than its two reserve blocks.
fn contended_pool(lookup: &str) -> PoolSet {
    let spec = TierSpec::from_bytes(8192, 2).unwrap().with_max_blocks(2);
    PoolSet::from_specs(&[spec], PoolConfig::default().with_lookup(lookup)).unwrap()
}

/// Every thread holds at most one block and waits for one when both are out.
///
/// `requested` counts acquires started and `returned` counts releases
/// finished, so `requested - returned` bounds the blocks on loan at any
/// instant between the two reads.
fn hammer_contended(pool: &PoolSet) {
    let live = Mutex::new(HashSet::new());
    let requested = AtomicUsize::new(0);
    let returned = AtomicUsize::new(0);

    let check_occupancy = || {
        let done = returned.load(Ordering::SeqCst);
        let occupied = pool.tiers()[0].occupied;
        let started = requested.load(Ordering::SeqCst);
        assert!(occupied <= 2, "{occupied} slots occupied in a two-block tier");
        assert!(
            occupied <= started - done,
            "{occupied} slots occupied with at most {} blocks on loan",
            started - done,
        );
    };

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let pool = pool.clone();
            let (live, requested, returned) = (&live, &requested, &returned);
            let check_occupancy = &check_occupancy;
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(t as u64);
                let stamp = t as u8 + 1;

                for _ in 0..ITERATIONS {
                    requested.fetch_add(1, Ordering::SeqCst);
                    let block = pool.acquire_with(8192, AllocMode::Blocking).unwrap();
                    let addr = block.as_ptr() as usize;
                    assert!(live.lock().unwrap().insert(addr), "{addr:#x} handed out twice");
                    check_occupancy();

                    // SAFETY: the block is 8192 bytes and on loan to this thread.
                    let bytes = unsafe { std::slice::from_raw_parts_mut(block.as_ptr(), 8192) };
                    assert!(bytes.iter().all(|&b| b == 0));
                    bytes.fill(stamp);
                    for _ in 0..rng.gen_range(0..4) {
                        std::thread::yield_now();
                    }
                    assert!(bytes.iter().all(|&b| b == stamp), "block {addr:#x} corrupted");

                    assert!(live.lock().unwrap().remove(&addr));
                    assert!(pool.release(addr as *mut u8));
                    returned.fetch_add(1, Ordering::SeqCst);
                    check_occupancy();
                }
            });
        }
    });

    assert!(live.lock().unwrap().is_empty());
    assert_eq!(requested.load(Ordering::SeqCst), THREADS * ITERATIONS);
}

#[test]
fn test_concurrent_table_scan() {
    let pool = pool("table-scan");
    hammer(&pool);

    assert!(pool.audit_leaks().is_clean());
    assert!(pool.tiers().iter().all(|t| t.occupied == 0));

    let stats = pool.stats();
    assert_eq!(stats.total_outstanding(), 0);
    assert!(stats.total_granted() > 0);
    let released: u64 = stats.tiers.iter().map(|t| t.released).sum();
    assert_eq!(released, stats.total_granted());
}

#[test]
fn test_concurrent_direct_mapping() {
    let pool = pool("direct-mapping");
    hammer(&pool);

    assert!(pool.audit_leaks().is_clean());
    assert_eq!(pool.stats().unknown_releases, 0);
}

#[test]
fn test_contended_tier_table_scan() {
    let pool = contended_pool("table-scan");
    hammer_contended(&pool);

    let tier = &pool.tiers()[0];
    assert_eq!(tier.occupied, 0);
    assert_eq!(tier.reserve_available, 2);
    assert_eq!(tier.table_capacity, 2);

    let stats = pool.stats();
    assert_eq!(stats.total_granted(), (THREADS * ITERATIONS) as u64);
    assert_eq!(stats.total_outstanding(), 0);
    assert!(pool.audit_leaks().is_clean());
}

#[test]
fn test_contended_tier_direct_mapping() {
    let pool = contended_pool("direct-mapping");
    hammer_contended(&pool);

    assert_eq!(pool.tiers()[0].occupied, 0);
    assert_eq!(pool.stats().unknown_releases, 0);
    assert!(pool.audit_leaks().is_clean());
}

#[test]
fn test_concurrent_double_release_has_one_winner() {
    let pool = pool("table-scan");
    let addr = pool.acquire(8192).unwrap().as_ptr() as usize;

    let wins: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let pool = pool.clone();
                scope.spawn(move || pool.release(addr as *mut u8) as usize)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(wins, 1);
    assert_eq!(pool.stats().unknown_releases, (THREADS - 1) as u64);
}
