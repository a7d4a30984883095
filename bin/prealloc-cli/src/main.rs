// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # prealloc
//!
//! Command-line interface for the prealloc pool allocator.
//!
//! ## Usage
//! ```bash
//! # List the tier profiles and the devices they serve
//! prealloc profiles
//!
//! # Build the pool set for a device and show its tiers
//! prealloc inspect --device qca6390
//!
//! # Exercise a pool set from several threads
//! prealloc stress --device 0xabcd --threads 8 --iterations 10000 --lookup direct-mapping
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "prealloc",
    about = "Tiered, pre-reserved memory pool allocator",
    version,
    author
)]
struct Cli {
    /// Path to a TOML pool configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tier profiles and the device ids mapped to them.
    Profiles {
        /// TOML profile table to use instead of the built-in one.
        #[arg(short, long)]
        table: Option<PathBuf>,
    },

    /// Build the pool set for a device and print its tiers.
    Inspect {
        /// Device id: chip name (e.g. "kiwi"), hex ("0x1107") or decimal.
        #[arg(short, long)]
        device: String,

        /// TOML profile table to use instead of the built-in one.
        #[arg(short, long)]
        table: Option<PathBuf>,
    },

    /// Acquire and release blocks of random sizes from several workers.
    Stress {
        /// Device id: chip name, hex or decimal.
        #[arg(short, long)]
        device: String,

        /// TOML profile table to use instead of the built-in one.
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Number of concurrent workers.
        #[arg(long, default_value_t = 4)]
        threads: usize,

        /// Acquire/release cycles per worker.
        #[arg(short, long, default_value_t = 1000)]
        iterations: usize,

        /// Blocks each worker keeps on loan at most.
        #[arg(long, default_value_t = 4)]
        hold: usize,

        /// Blocks each worker deliberately never releases.
        #[arg(long, default_value_t = 0)]
        leak: usize,

        /// Release lookup: table-scan or direct-mapping (overrides config).
        #[arg(short, long)]
        lookup: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Profiles { table } => commands::profiles::execute(table).await,
        Commands::Inspect { device, table } => {
            commands::inspect::execute(device, table, cli.config).await
        }
        Commands::Stress {
            device,
            table,
            threads,
            iterations,
            hold,
            leak,
            lookup,
        } => {
            let options = commands::stress::StressOptions {
                threads,
                iterations,
                hold,
                leak,
                lookup,
            };
            commands::stress::execute(device, table, cli.config, options).await
        }
    }
}
