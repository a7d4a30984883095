// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-profile
//!
//! Static tier configurations for the prealloc pool allocator, keyed by the
//! hardware device the pool serves.
//!
//! # Key Components
//!
//! - [`DeviceId`]: numeric chip identifier with named constants for known
//!   parts.
//! - [`BlockSize`]: a tier's allocation unit with human-readable parsing
//!   (`"8K"`, `"128KB"`).
//! - [`TierSpec`]: one `(block size, reserve minimum, name)` row, plus an
//!   optional live-block cap for the backing cache.
//! - [`ProfileTable`]: validated mapping from device id to an ascending list
//!   of tiers, with a fallback profile for unrecognised devices. Loadable
//!   from TOML; [`ProfileTable::builtin`] ships the stock layouts.
//!
//! Platform detection (finding out which device is present) is not part of
//! this crate; callers hand the id in.
//!
//! # Example
//! ```
//! use device_profile::{DeviceId, ProfileTable};
//!
//! let table = ProfileTable::builtin();
//! let profile = table.resolve(DeviceId::ADRASTEA);
//! assert_eq!(profile.tiers[1].reserve_min, 10);
//!
//! // Unknown ids fall back to the default profile.
//! assert_eq!(table.resolve(DeviceId(0x1234)).name, "default");
//! ```

mod device;
mod error;
mod size;
mod table;
mod tier;

pub use device::DeviceId;
pub use error::ProfileError;
pub use size::BlockSize;
pub use table::{Profile, ProfileTable};
pub use tier::TierSpec;
