//! Alder Lake S PCH (600-series) layout.

use super::{BucketRange, PadGroup, PlatformDescription, VgpioHeuristics};
use crate::types::{PadMode, RawRegisterPair, ResetDomain, VgpioBucket};

/// Physical groups in the order the vendor table lists them.
pub const GROUPS: &[PadGroup] = &[
    PadGroup { name: "GPP_I", count: 23 },
    PadGroup { name: "GPP_R", count: 22 },
    PadGroup { name: "GPP_J", count: 12 },
    PadGroup { name: "GPP_B", count: 24 },
    PadGroup { name: "GPP_G", count: 8 },
    PadGroup { name: "GPP_H", count: 24 },
    PadGroup { name: "GPD", count: 13 },
    PadGroup { name: "GPP_A", count: 15 },
    PadGroup { name: "GPP_C", count: 24 },
    PadGroup { name: "GPP_S", count: 8 },
    PadGroup { name: "GPP_E", count: 22 },
    PadGroup { name: "GPP_K", count: 12 },
    PadGroup { name: "GPP_F", count: 24 },
    PadGroup { name: "GPP_D", count: 24 },
];

/// Modes of the first five physical entries (GPP_I0..4).
pub const SIGNATURE_MODES: [PadMode; 5] = [
    PadMode::Gpio,
    PadMode::Nf1,
    PadMode::Nf1,
    PadMode::Nf1,
    PadMode::Nf1,
];

/// Physical pads in a complete vendor table.
pub const CANONICAL_PHYSICAL_COUNT: usize = 252;

/// USB, standard and PCIe VGPIO table sizes.
pub const VGPIO_SIZES: [usize; 3] = [12, 38, 80];

/// NF1, deep-sleep reset, no termination, input.
pub const DEFAULT_SYNTHETIC_DW0: u32 = 0x4400_0400;

impl PlatformDescription {
    /// Alder Lake S PCH.
    pub fn alder_lake_s() -> Self {
        Self {
            name: "Alder Lake S",
            groups: GROUPS.to_vec(),
            signature: SIGNATURE_MODES
                .iter()
                .map(|&mode| (mode, ResetDomain::PlatformReset))
                .collect(),
            canonical_physical_count: CANONICAL_PHYSICAL_COUNT,
            vgpio_sizes: VGPIO_SIZES.to_vec(),
            heuristics: VgpioHeuristics::default(),
            buckets: vec![
                BucketRange {
                    bucket: VgpioBucket::Usb,
                    entries: 10..=14,
                },
                BucketRange {
                    bucket: VgpioBucket::Standard,
                    entries: 35..=42,
                },
                BucketRange {
                    bucket: VgpioBucket::Pcie,
                    entries: 75..=85,
                },
            ],
            synthesis_universe: vec![(VgpioBucket::Usb, 12), (VgpioBucket::Standard, 39)],
            default_synthetic: RawRegisterPair::new(DEFAULT_SYNTHETIC_DW0, 0),
            signature_max_entries: 320,
            signature_min_entries: 20,
            signature_max_invalid_streak: 2,
            generic_max_entries: 350,
            short_circuit_physical: 200,
        }
    }
}
