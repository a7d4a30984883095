// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Leak audit results.

use std::fmt;

/// One block still on loan when the audit ran.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LeakEntry {
    /// Name of the tier the block belongs to.
    pub tier: String,
    /// Tracking-table slot holding the address.
    pub slot: usize,
    /// Address of the block.
    pub addr: usize,
}

impl fmt::Display for LeakEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} not freed in {} at index {}", self.addr, self.tier, self.slot)
    }
}

/// Every outstanding block found by [`PoolSet::audit_leaks`](crate::PoolSet::audit_leaks).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LeakReport {
    pub entries: Vec<LeakEntry>,
}

impl LeakReport {
    /// `true` when nothing is on loan.
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Leaks belonging to one tier.
    pub fn for_tier<'a>(&'a self, tier: &'a str) -> impl Iterator<Item = &'a LeakEntry> + 'a {
        self.entries.iter().filter(move |e| e.tier == tier)
    }

    /// Returns `true` if `addr` is reported as leaked.
    pub fn contains(&self, addr: usize) -> bool {
        self.entries.iter().any(|e| e.addr == addr)
    }
}

impl fmt::Display for LeakReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("no outstanding blocks");
        }
        writeln!(f, "{} outstanding block(s):", self.entries.len())?;
        for entry in &self.entries {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_report() {
        let report = LeakReport::default();
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "no outstanding blocks");
    }

    #[test]
    fn test_report_lookup() {
        let report = LeakReport {
            entries: vec![
                LeakEntry { tier: "pool-8k".into(), slot: 0, addr: 0x1000 },
                LeakEntry { tier: "pool-16k".into(), slot: 3, addr: 0x8000 },
            ],
        };
        assert_eq!(report.len(), 2);
        assert_eq!(report.for_tier("pool-16k").count(), 1);
        assert!(report.contains(0x8000));
        assert!(report.to_string().contains("0x8000 not freed in pool-16k at index 3"));
    }
}
