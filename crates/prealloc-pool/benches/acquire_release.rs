// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for acquire/release under both release lookup strategies.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use device_profile::{DeviceId, ProfileTable};
use prealloc_pool::{PoolConfig, PoolSet};

const LOOKUPS: [&str; 2] = ["table-scan", "direct-mapping"];

fn pool(lookup: &str) -> PoolSet {
    PoolSet::for_device(
        &ProfileTable::builtin(),
        DeviceId::QCA6390,
        PoolConfig::default().with_lookup(lookup),
    )
    .unwrap()
}

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("acquire_release");
    for lookup in LOOKUPS {
        let pool = pool(lookup);
        group.bench_with_input(BenchmarkId::new(lookup, "16K"), &pool, |b, pool| {
            b.iter(|| {
                let block = pool.acquire(black_box(16 * 1024)).unwrap();
                pool.release(block.as_ptr())
            })
        });
    }
    group.finish();
}

/// Release cost with many blocks on loan: the scan walks every table slot
/// ahead of the target, direct mapping does not.
fn bench_release_under_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("release_under_load");
    for outstanding in [16usize, 128] {
        for lookup in LOOKUPS {
            let pool = pool(lookup);
            let held: Vec<_> = (0..outstanding)
                .map(|_| pool.acquire(128 * 1024).unwrap())
                .collect();

            group.bench_with_input(
                BenchmarkId::new(lookup, outstanding),
                &pool,
                |b, pool| {
                    b.iter(|| {
                        let block = pool.acquire(black_box(128 * 1024)).unwrap();
                        pool.release(block.as_ptr())
                    })
                },
            );

            for block in held {
                pool.release(block.as_ptr());
            }
        }
    }
    group.finish();
}

criterion_group!(benches, bench_acquire_release, bench_release_under_load);
criterion_main!(benches);
