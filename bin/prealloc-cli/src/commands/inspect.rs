// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `prealloc inspect` command: build a device's pool set and show its tiers.
//!
//! Construction is real: reserves are pre-charged, so degraded tiers show up
//! here exactly as they would at initialisation.

use super::format_bytes;
use prealloc_pool::PoolSet;
use std::path::PathBuf;

pub async fn execute(
    device: String,
    table: Option<PathBuf>,
    config: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              prealloc · Pool Inspector              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let device = super::parse_device(&device)?;
    let table = super::load_table(table.as_deref())?;
    let config = super::load_config(config.as_ref())?;

    let pool = PoolSet::for_device(&table, device, config)
        .map_err(|e| anyhow::anyhow!("failed to build pool set: {e}"))?;

    // ── Summary ────────────────────────────────────────────────
    println!("  Device:    {device} ({})", device.chip_name().unwrap_or("unknown"));
    println!("  Profile:   {}", pool.profile_name());
    println!("  Lookup:    {}", pool.lookup_name());
    println!("  Threshold: {}", format_bytes(pool.threshold()));
    println!("  Zeroing:   {}", if pool.config().zero_blocks { "on" } else { "off" });
    println!();

    // ── Tiers ──────────────────────────────────────────────────
    println!(
        "  {:<14} {:>8} {:>8} {:>10} {:>8} {:<10}",
        "Tier", "Size", "Reserve", "Available", "Slots", "State",
    );
    println!("  {}", "-".repeat(63));

    let tiers = pool.tiers();
    for tier in &tiers {
        println!(
            "  {:<14} {:>8} {:>8} {:>10} {:>8} {:<10}",
            tier.name,
            format_bytes(tier.block_size),
            tier.reserve_min,
            tier.reserve_available,
            tier.table_capacity,
            if tier.degraded { "DEGRADED" } else { "ready" },
        );
    }
    println!();

    let degraded = tiers.iter().filter(|t| t.degraded).count();
    if degraded > 0 {
        println!("  WARNING: {degraded} tier(s) failed to pre-charge and will be skipped");
    }
    let pinned: usize = tiers
        .iter()
        .filter(|t| !t.degraded)
        .map(|t| t.block_size * t.reserve_min)
        .sum();
    println!("  Pinned by reserves: {:.2} MB", pinned as f64 / (1024.0 * 1024.0));

    pool.teardown();
    Ok(())
}
