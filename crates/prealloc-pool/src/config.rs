// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! lookup = "table-scan"
//! zero_blocks = true
//! wait_retry_ms = 5000
//! max_tracking_capacity = 4096
//! ```
//! Every key is optional; missing keys take their defaults.

use crate::lookup::{DirectMapping, OwnerLookup, TableScan};
use crate::PoolError;
use std::path::Path;
use std::time::Duration;

/// Configuration shared by every tier of a pool set.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Release lookup strategy: `"table-scan"` or `"direct-mapping"`.
    pub lookup: String,
    /// Zero-fill every block before handing it out.
    pub zero_blocks: bool,
    /// Upper bound on a single blocking wait before the backing cache is
    /// retried, in milliseconds.
    pub wait_retry_ms: u64,
    /// Largest capacity a tracking table may grow to. Unbounded if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tracking_capacity: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            lookup: "table-scan".into(),
            zero_blocks: true,
            wait_retry_ms: 5000,
            max_tracking_capacity: None,
        }
    }
}

impl PoolConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PoolError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PoolError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, PoolError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| PoolError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, PoolError> {
        toml::to_string_pretty(self)
            .map_err(|e| PoolError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks values that would make the pool unusable.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.wait_retry_ms == 0 {
            return Err(PoolError::Config("wait_retry_ms must be positive".into()));
        }
        self.create_lookup().map(|_| ())
    }

    /// The blocking-wait slice as a [`Duration`].
    pub fn wait_retry(&self) -> Duration {
        Duration::from_millis(self.wait_retry_ms.max(1))
    }

    /// Creates the release lookup strategy named by this config.
    pub fn create_lookup(&self) -> Result<Box<dyn OwnerLookup>, PoolError> {
        match self.lookup.to_lowercase().as_str() {
            "table-scan" | "scan" => Ok(Box::new(TableScan::new())),
            "direct-mapping" | "direct" => Ok(Box::new(DirectMapping::new())),
            other => Err(PoolError::Config(format!(
                "unknown lookup '{other}'; expected 'table-scan' or 'direct-mapping'"
            ))),
        }
    }

    /// Returns a copy using the given lookup strategy name.
    pub fn with_lookup(mut self, lookup: &str) -> Self {
        self.lookup = lookup.to_string();
        self
    }

    /// Returns a copy with a tracking-table capacity ceiling.
    pub fn with_max_tracking_capacity(mut self, max: usize) -> Self {
        self.max_tracking_capacity = Some(max);
        self
    }
}
