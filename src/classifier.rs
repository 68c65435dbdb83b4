//! Physical vs. virtual table classification.
//!
//! Virtual GPIO tables are short, sit at one of a few canonical sizes and
//! are dominated by deep-sleep pads with the alternate-function write enable
//! bit set. Physical tables are neither.

use serde::Serialize;

use crate::codec;
use crate::platform::PlatformDescription;
use crate::types::{CandidateTable, ResetDomain, TableEntry, VgpioBucket};

/// Classification of a candidate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// Physical pin table
    Physical,
    /// Virtual GPIO table; bucket is `None` when no size range matched
    Virtual(Option<VgpioBucket>),
}

/// Bit statistics over the leading entries of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStats {
    /// Entries sampled
    pub sampled: usize,
    /// Fraction with DW0 bit 27 set
    pub alt_function_ratio: f64,
    /// Fraction in the deep-sleep reset domain
    pub deep_sleep_ratio: f64,
}

/// Compute sample statistics over the first `sample_size` entries.
pub fn sample_stats(entries: &[TableEntry], sample_size: usize) -> SampleStats {
    let sample = &entries[..entries.len().min(sample_size)];
    if sample.is_empty() {
        return SampleStats::default();
    }

    let alt = sample
        .iter()
        .filter(|e| codec::has_alt_function_write(e.raw.dw0))
        .count();
    let deep = sample
        .iter()
        .filter(|e| codec::reset_domain(e.raw.dw0) == ResetDomain::DeepSleep)
        .count();

    let n = sample.len() as f64;
    SampleStats {
        sampled: sample.len(),
        alt_function_ratio: alt as f64 / n,
        deep_sleep_ratio: deep as f64 / n,
    }
}

/// Whether a run of entries looks like a virtual GPIO table.
pub fn is_vgpio(entries: &[TableEntry], entry_count: usize, platform: &PlatformDescription) -> bool {
    let h = &platform.heuristics;

    let size_match = platform
        .vgpio_sizes
        .iter()
        .any(|&size| entry_count.abs_diff(size) <= h.size_tolerance);
    if !size_match {
        return false;
    }

    let stats = sample_stats(entries, h.sample_size);
    stats.alt_function_ratio > h.alt_function_ratio || stats.deep_sleep_ratio > h.deep_sleep_ratio
}

/// Classify a table that has already been through the scanner.
pub fn classify(table: &CandidateTable, platform: &PlatformDescription) -> TableKind {
    if table.is_vgpio {
        TableKind::Virtual(platform.bucket_for(table.entry_count))
    } else {
        TableKind::Physical
    }
}
