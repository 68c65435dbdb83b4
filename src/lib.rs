//! padscan - Intel PCH GPIO Pad Table Recovery
//!
//! This library recovers the GPIO pad configuration of an Intel PCH
//! platform from an unstructured vendor firmware image. There is no fixed
//! offset and no container metadata to go by, and images often carry more
//! than one partially-correct copy of the tables.
//!
//! # Features
//!
//! - **Table Scanning**: Finds fixed-stride register tables by signature and by plausibility runs
//! - **Bitfield Decoding**: Turns DW0/DW1 register pairs into typed pad records
//! - **Classification**: Separates physical pin tables from virtual GPIO tables
//! - **Composition**: Reconciles several candidate tables into one pad state, with or without a reference
//! - **Gap Synthesis**: Fills canonical virtual pads that no table provides
//! - **Comparison**: Scores a result against a reference and diffs two results
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use padscan::{recover_file, RecoveryOutcome};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     match recover_file("path/to/bios.bin")? {
//!         RecoveryOutcome::Recovered(recovery) => {
//!             for pad in recovery.pads() {
//!                 println!("{}: {}", pad.name, pad.record.mode);
//!             }
//!         }
//!         other => println!("nothing recovered: {:?}", other),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Composition Modes
//!
//! - **Oracle**: a coreboot `gpio.h` (or JSON map) supplies the expected
//!   mode of each pad; only agreeing entries from other tables are taken
//! - **Blind**: the best virtual table per size bucket is layered over the
//!   physical base table
//!
//! # Platform Support
//!
//! - Alder Lake S PCH (600-series)

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

pub mod classifier;
pub mod codec;
pub mod compare;
pub mod compose;
pub mod error;
pub mod formatter;
pub mod hints;
pub mod oracle;
pub mod platform;
pub mod resolver;
pub mod scanner;
pub mod selector;
pub mod types;

pub use compare::AccuracyReport;
pub use compose::CompositionReport;
pub use error::{RecoveryError, Result};
pub use hints::Hints;
pub use oracle::Oracle;
pub use platform::PlatformDescription;
pub use types::{
    CandidateTable, ComposedPad, ComposedState, CompositionMode, PadMode, PadName, PadRecord,
    Provenance, RawRegisterPair, ScanOptions,
};

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

/// Options for a full recovery run.
#[derive(Debug, Clone, Default)]
pub struct RecoveryOptions {
    /// Scanner options
    pub scan: ScanOptions,
    /// Requested composition mode
    pub mode: CompositionMode,
    /// Platform layout
    pub platform: PlatformDescription,
    /// Ground truth, if available
    pub oracle: Option<Oracle>,
    /// Synthesis hints, if available
    pub hints: Option<Hints>,
}

impl RecoveryOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with the strict scan preset.
    pub fn strict() -> Self {
        Self {
            scan: ScanOptions::strict(),
            ..Self::default()
        }
    }

    /// Options with the thorough scan preset.
    pub fn thorough() -> Self {
        Self {
            scan: ScanOptions::thorough(),
            ..Self::default()
        }
    }

    /// Attach an oracle.
    pub fn with_oracle(mut self, oracle: Oracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Attach hints.
    pub fn with_hints(mut self, hints: Hints) -> Self {
        self.hints = Some(hints);
        self
    }
}

/// A successful recovery.
#[derive(Debug, Clone, Serialize)]
pub struct Recovery {
    /// Every candidate table the scanner produced
    pub tables: Vec<CandidateTable>,
    /// Id of the physical base table
    pub base_table_id: usize,
    /// Composition summary
    pub report: CompositionReport,
    /// Final pad state
    pub state: ComposedState,
    /// Agreement with the oracle, when one was given
    pub accuracy: Option<AccuracyReport>,
    #[serde(skip)]
    platform: PlatformDescription,
}

impl Recovery {
    /// Pads in canonical order: physical groups in table order, then the
    /// USB, standard and PCIe virtual groups, each by local index.
    pub fn pads(&self) -> Vec<&ComposedPad> {
        let mut pads: Vec<&ComposedPad> = self.state.iter().collect();
        pads.sort_by_key(|p| resolver::sort_key(&p.name, &self.platform));
        pads
    }

    /// The physical base table.
    pub fn base_table(&self) -> Option<&CandidateTable> {
        self.tables.iter().find(|t| t.id == self.base_table_id)
    }

    /// Platform the recovery ran against.
    pub fn platform(&self) -> &PlatformDescription {
        &self.platform
    }
}

/// Result of a recovery run that did not fail outright.
#[derive(Debug, Clone)]
pub enum RecoveryOutcome {
    /// A pad state was composed
    Recovered(Box<Recovery>),
    /// The scanner found no candidate tables
    NoTablesFound,
    /// Only virtual tables were found
    NoBaseTable {
        /// Tables that were found
        tables: Vec<CandidateTable>,
    },
}

impl RecoveryOutcome {
    /// The recovery, if one was produced.
    pub fn recovery(&self) -> Option<&Recovery> {
        match self {
            Self::Recovered(r) => Some(r.as_ref()),
            _ => None,
        }
    }

    /// Consume the outcome, returning the recovery if one was produced.
    pub fn into_recovery(self) -> Option<Recovery> {
        match self {
            Self::Recovered(r) => Some(*r),
            _ => None,
        }
    }

    /// Whether a pad state was composed.
    pub fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered(_))
    }
}

/// Recover the pad state from a firmware file.
///
/// # Example
///
/// ```rust,no_run
/// use padscan::recover_file;
///
/// let outcome = recover_file("bios.bin")?;
/// println!("recovered: {}", outcome.is_recovered());
/// # Ok::<(), padscan::RecoveryError>(())
/// ```
pub fn recover_file<P: AsRef<Path>>(path: P) -> Result<RecoveryOutcome> {
    let data = std::fs::read(path)?;
    recover_bytes(&data)
}

/// Recover the pad state from a firmware image in memory.
pub fn recover_bytes(data: &[u8]) -> Result<RecoveryOutcome> {
    recover_bytes_with_options(data, &RecoveryOptions::new())
}

/// Recover the pad state with custom options.
///
/// Scans for candidate tables, selects the base table (by oracle agreement
/// when composing in oracle mode), composes, and scores the result when an
/// oracle is present. Finding nothing is an outcome, not an error.
pub fn recover_bytes_with_options(
    data: &[u8],
    options: &RecoveryOptions,
) -> Result<RecoveryOutcome> {
    let platform = &options.platform;
    let tables = scanner::scan_for_tables(data, &options.scan, platform)?;
    if tables.is_empty() {
        warn!("No candidate tables found");
        return Ok(RecoveryOutcome::NoTablesFound);
    }
    info!("Found {} candidate table(s)", tables.len());

    let oracle = options.oracle.as_ref();
    let mode = compose::effective_mode(options.mode, oracle);

    let base = match (mode, oracle) {
        (CompositionMode::Oracle, Some(oracle)) => {
            selector::select_base_by_oracle(&tables, oracle, platform)
        }
        _ => selector::filter_best(&tables, platform).base,
    };
    let Some(base) = base else {
        warn!("No physical base table among {} candidate(s)", tables.len());
        return Ok(RecoveryOutcome::NoBaseTable { tables });
    };

    let composition = compose::compose(
        &tables,
        base,
        mode,
        oracle,
        options.hints.as_ref(),
        platform,
    );
    let base_table_id = base.id;

    let accuracy = oracle.map(|o| compare::accuracy(&composition.state, o));
    if let Some(report) = &accuracy {
        info!(
            "Oracle accuracy: {}/{} ({:.1}%)",
            report.matched, report.total, report.percent
        );
    }

    Ok(RecoveryOutcome::Recovered(Box::new(Recovery {
        tables,
        base_table_id,
        report: composition.report,
        state: composition.state,
        accuracy,
        platform: platform.clone(),
    })))
}

/// Load an oracle, logging and returning `None` when it is unusable.
///
/// Callers then compose blind.
pub fn load_oracle_or_blind<P: AsRef<Path>>(path: P) -> Option<Oracle> {
    match Oracle::load(path.as_ref()) {
        Ok(oracle) => {
            info!("Loaded {} oracle pad(s)", oracle.len());
            Some(oracle)
        }
        Err(e) => {
            warn!("{}; composing blind", e);
            None
        }
    }
}

/// Load hints, logging and returning `None` when they are unusable.
pub fn load_hints_or_none<P: AsRef<Path>>(path: P) -> Option<Hints> {
    match Hints::load(path.as_ref()) {
        Ok(hints) => Some(hints),
        Err(e) => {
            warn!("{}; using default synthesis", e);
            None
        }
    }
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::test_support::{physical_table, virtual_table};

    fn image() -> Vec<u8> {
        let mut data = vec![0u8; 256];
        data.extend_from_slice(&physical_table(252));
        data.extend(std::iter::repeat(0xFF).take(64));
        data.extend_from_slice(&virtual_table(12));
        data.extend(std::iter::repeat(0xFF).take(64));
        data.extend_from_slice(&virtual_table(38));
        data.extend(std::iter::repeat(0xFF).take(1024));
        data
    }

    #[test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
    }

    #[test]
    fn test_recover_bytes() {
        let outcome = recover_bytes(&image()).unwrap();
        let recovery = outcome.recovery().unwrap();

        assert_eq!(recovery.report.mode, CompositionMode::Blind);
        assert_eq!(recovery.base_table().unwrap().entry_count, 252);
        assert_eq!(recovery.report.layered.len(), 2);

        let pads = recovery.pads();
        assert_eq!(pads[0].name.name, "GPP_I0");
        assert_eq!(pads.last().unwrap().name.name, "VGPIO_38");
        // 252 physical, 12 USB, 38 standard plus VGPIO_38 synthesized
        assert_eq!(pads.len(), 252 + 12 + 39);
        assert_eq!(recovery.report.synthesized, 1);
    }

    #[test]
    fn test_no_tables() {
        let outcome = recover_bytes(&[0xFF; 4096]).unwrap();
        assert!(matches!(outcome, RecoveryOutcome::NoTablesFound));
    }

    #[test]
    fn test_no_base_table() {
        let mut data = vec![0u8; 64];
        data.extend_from_slice(&virtual_table(12));
        data.extend(std::iter::repeat(0xFF).take(256));

        let outcome = recover_bytes(&data).unwrap();
        assert!(matches!(outcome, RecoveryOutcome::NoBaseTable { .. }));
        assert!(outcome.into_recovery().is_none());
    }

    #[test]
    fn test_bad_oracle_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpio.h");
        std::fs::write(&path, "/* empty */").unwrap();
        assert!(load_oracle_or_blind(&path).is_none());
        assert!(load_hints_or_none(dir.path().join("missing.json")).is_none());
    }
}
