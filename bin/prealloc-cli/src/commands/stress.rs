// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `prealloc stress` command: hammer a pool set from concurrent workers.
//!
//! Each worker runs on the blocking thread pool, draws request sizes that
//! land in random tiers, keeps up to `hold` blocks on loan, and optionally
//! leaks a few so the final audit has something to report.

use super::format_bytes;
use prealloc_pool::{PoolError, PoolSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::time::Instant;

/// Worker parameters for a stress run.
pub struct StressOptions {
    pub threads: usize,
    pub iterations: usize,
    pub hold: usize,
    pub leak: usize,
    pub lookup: Option<String>,
}

#[derive(Debug, Default)]
struct WorkerReport {
    acquired: u64,
    released: u64,
    failed: u64,
    leaked: u64,
}

pub async fn execute(
    device: String,
    table: Option<PathBuf>,
    config: Option<PathBuf>,
    options: StressOptions,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              prealloc · Stress Test                 ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let device = super::parse_device(&device)?;
    let table = super::load_table(table.as_deref())?;
    let mut config = super::load_config(config.as_ref())?;
    if let Some(lookup) = &options.lookup {
        config = config.with_lookup(lookup);
    }

    let pool = PoolSet::for_device(&table, device, config)
        .map_err(|e| anyhow::anyhow!("failed to build pool set: {e}"))?;
    let sizes: Vec<usize> = pool
        .tiers()
        .iter()
        .filter(|t| !t.degraded)
        .map(|t| t.block_size)
        .collect();
    if sizes.is_empty() {
        anyhow::bail!("profile '{}' has no usable tiers", pool.profile_name());
    }

    println!("  Profile:    {} ({} lookup)", pool.profile_name(), pool.lookup_name());
    println!(
        "  Workers:    {} x {} iterations, hold {}, leak {}",
        options.threads, options.iterations, options.hold, options.leak,
    );
    println!();

    let start = Instant::now();
    let mut handles = Vec::with_capacity(options.threads);
    for worker in 0..options.threads {
        let pool = pool.clone();
        let sizes = sizes.clone();
        let (iterations, hold, leak) = (options.iterations, options.hold, options.leak);
        handles.push(tokio::task::spawn_blocking(move || {
            run_worker(&pool, &sizes, worker as u64, iterations, hold, leak)
        }));
    }

    let mut total = WorkerReport::default();
    for handle in handles {
        let report = handle.await?;
        tracing::debug!("worker finished: {report:?}");
        total.acquired += report.acquired;
        total.released += report.released;
        total.failed += report.failed;
        total.leaked += report.leaked;
    }
    let elapsed = start.elapsed();

    // ── Throughput ─────────────────────────────────────────────
    let ops = (total.acquired + total.released) as f64;
    println!("  Elapsed:    {:.2?}", elapsed);
    println!(
        "  Operations: {} acquires, {} releases, {} failures",
        total.acquired, total.released, total.failed,
    );
    println!("  Throughput: {:.0} ops/s", ops / elapsed.as_secs_f64().max(1e-9));
    println!();

    // ── Per-Tier Statistics ────────────────────────────────────
    let stats = pool.stats();
    println!(
        "  {:<14} {:>8} {:>9} {:>9} {:>8} {:>6} {:>9}",
        "Tier", "Size", "Granted", "Reserve%", "Growths", "Peak", "Exhausted",
    );
    println!("  {}", "-".repeat(70));
    for tier in &stats.tiers {
        println!(
            "  {:<14} {:>8} {:>9} {:>8.1}% {:>8} {:>6} {:>9}",
            tier.name,
            format_bytes(tier.block_size),
            tier.granted,
            tier.reserve_hit_ratio() * 100.0,
            tier.table_growths,
            tier.peak_outstanding,
            tier.exhausted,
        );
    }
    println!();
    println!("{}", stats.summary());
    println!();

    // ── Leak Audit ─────────────────────────────────────────────
    let report = pool.audit_leaks();
    if report.is_clean() {
        println!("  Leak audit: clean");
    } else {
        println!("  Leak audit: {} block(s) still on loan", report.len());
        for entry in report.entries.iter().take(10) {
            println!("   {entry}");
        }
        if report.len() > 10 {
            println!("   ... and {} more", report.len() - 10);
        }
    }

    pool.teardown();
    Ok(())
}

fn run_worker(
    pool: &PoolSet,
    sizes: &[usize],
    seed: u64,
    iterations: usize,
    hold: usize,
    leak: usize,
) -> WorkerReport {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut report = WorkerReport::default();
    let mut held: Vec<usize> = Vec::with_capacity(hold + 1);

    for _ in 0..iterations {
        // Any size in (previous tier, this tier] lands in this tier.
        let idx = rng.gen_range(0..sizes.len());
        let low = if idx == 0 { sizes[0] } else { sizes[idx - 1] + 1 };
        let size = rng.gen_range(low..=sizes[idx]);

        match pool.acquire(size) {
            Ok(block) => {
                report.acquired += 1;
                held.push(block.as_ptr() as usize);
            }
            Err(PoolError::TierExhausted { .. }) | Err(PoolError::BookkeepingOverflow { .. }) => {
                report.failed += 1;
            }
            Err(e) => {
                tracing::warn!("unexpected acquire failure for {size} bytes: {e}");
                report.failed += 1;
            }
        }

        while held.len() > hold {
            let addr = held.swap_remove(rng.gen_range(0..held.len()));
            if pool.release(addr as *mut u8) {
                report.released += 1;
            }
        }
    }

    let keep = leak.min(held.len());
    report.leaked = keep as u64;
    for addr in held.drain(keep..) {
        if pool.release(addr as *mut u8) {
            report.released += 1;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_profile::TierSpec;
    use prealloc_pool::PoolConfig;

    fn pool() -> PoolSet {
        PoolSet::from_specs(
            &[
                TierSpec::from_bytes(8192, 2).unwrap(),
                TierSpec::from_bytes(16384, 2).unwrap(),
            ],
            PoolConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_worker_releases_everything() {
        let pool = pool();
        let report = run_worker(&pool, &[8192, 16384], 7, 200, 3, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.acquired, 200);
        assert_eq!(report.released, 200);
        assert!(pool.audit_leaks().is_clean());
    }

    #[test]
    fn test_worker_leaks_on_request() {
        let pool = pool();
        let report = run_worker(&pool, &[8192, 16384], 3, 50, 4, 2);
        assert_eq!(report.leaked, 2);
        assert_eq!(pool.audit_leaks().len(), 2);
    }
}
