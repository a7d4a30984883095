// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `prealloc profiles` command: list tier profiles and their devices.

use super::format_bytes;
use std::path::PathBuf;

pub async fn execute(table: Option<PathBuf>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              prealloc · Tier Profiles               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let table = super::load_table(table.as_deref())?;
    let default = table.default_profile().name.clone();

    for profile in table.profiles() {
        let marker = if profile.name == default { "  (default)" } else { "" };
        println!("  Profile: {}{marker}", profile.name);

        let devices: Vec<String> = profile
            .device_ids
            .iter()
            .map(|id| match id.chip_name() {
                Some(name) => format!("{name} ({id})"),
                None => id.to_string(),
            })
            .collect();
        if devices.is_empty() {
            println!("   Devices:  -");
        } else {
            println!("   Devices:  {}", devices.join(", "));
        }

        println!("   {:<14} {:>8} {:>8} {:>10}", "Tier", "Size", "Reserve", "Pinned");
        println!("   {}", "-".repeat(43));
        for tier in &profile.tiers {
            println!(
                "   {:<14} {:>8} {:>8} {:>10}",
                tier.name,
                tier.block_size.to_string(),
                tier.reserve_min,
                format_bytes(tier.reserved_bytes()),
            );
        }
        println!(
            "   Total pinned: {:.2} MB",
            profile.reserved_bytes() as f64 / (1024.0 * 1024.0),
        );
        println!();
    }

    println!("  Unlisted devices use the '{default}' profile.");
    Ok(())
}
