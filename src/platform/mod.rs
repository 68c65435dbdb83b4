//! Platform descriptions.
//!
//! A [`PlatformDescription`] carries every chipset-specific constant the
//! pipeline needs: the physical group layout, the scan signature, canonical
//! table sizes, VGPIO bucket ranges, classifier thresholds and the virtual
//! pad universe used by gap synthesis. It is built once and passed by
//! reference into each stage.

pub mod alderlake;

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::types::{PadMode, RawRegisterPair, ResetDomain, VgpioBucket};

/// Thresholds used to tell virtual GPIO tables from physical ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VgpioHeuristics {
    /// Entries sampled from the start of a table
    pub sample_size: usize,
    /// Allowed distance from a canonical VGPIO table size
    pub size_tolerance: usize,
    /// Ratio of sampled entries with NAFVWE set above which a table is virtual
    pub alt_function_ratio: f64,
    /// Ratio of sampled entries in the deep-sleep domain above which a table is virtual
    pub deep_sleep_ratio: f64,
}

impl Default for VgpioHeuristics {
    fn default() -> Self {
        Self {
            sample_size: 10,
            size_tolerance: 2,
            alt_function_ratio: 0.5,
            deep_sleep_ratio: 0.7,
        }
    }
}

/// One physical pad group in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PadGroup {
    /// Group name (`GPP_B`, `GPD`, ...)
    pub name: &'static str,
    /// Number of pads in the group
    pub count: usize,
}

/// Entry-count range that maps a virtual table to a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketRange {
    /// Target bucket
    pub bucket: VgpioBucket,
    /// Inclusive entry-count range
    pub entries: RangeInclusive<usize>,
}

/// Chipset-specific constants shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct PlatformDescription {
    /// Human-readable platform name
    pub name: &'static str,
    /// Physical groups in table order
    pub groups: Vec<PadGroup>,
    /// Leading `(mode, reset)` fingerprint of the physical table
    pub signature: Vec<(PadMode, ResetDomain)>,
    /// Expected size of the physical table
    pub canonical_physical_count: usize,
    /// Canonical VGPIO table sizes
    pub vgpio_sizes: Vec<usize>,
    /// Classifier thresholds
    pub heuristics: VgpioHeuristics,
    /// VGPIO bucket ranges by entry count
    pub buckets: Vec<BucketRange>,
    /// Virtual pads always present in a complete state: `(bucket, count)`
    pub synthesis_universe: Vec<(VgpioBucket, usize)>,
    /// Register value used for synthesized pads with no hint
    pub default_synthetic: RawRegisterPair,
    /// Largest run the signature scan will collect
    pub signature_max_entries: usize,
    /// Smallest run the signature scan will keep
    pub signature_min_entries: usize,
    /// Consecutive invalid entries tolerated inside a signature run
    pub signature_max_invalid_streak: usize,
    /// Generic runs reaching this size are treated as noise
    pub generic_max_entries: usize,
    /// Physical table size above which the generic scan may be skipped
    pub short_circuit_physical: usize,
}

impl PlatformDescription {
    /// Total number of physical pads across all groups.
    pub fn physical_pad_count(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Bucket for a virtual table with the given entry count.
    pub fn bucket_for(&self, entry_count: usize) -> Option<VgpioBucket> {
        self.buckets
            .iter()
            .find(|b| b.entries.contains(&entry_count))
            .map(|b| b.bucket)
    }

    /// Position of a physical group in wire order.
    pub fn group_position(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }
}

impl Default for PlatformDescription {
    fn default() -> Self {
        Self::alder_lake_s()
    }
}
