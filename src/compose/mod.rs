//! Composition of candidate tables into one pad state.
//!
//! Vendor images routinely carry several partially-correct copies of the
//! pad tables. Composition starts from the physical base table and layers
//! other tables on top, either guided by an oracle (only pads that agree
//! with it are taken) or blind (the best virtual table per bucket wins).
//! Gap synthesis runs last.

pub mod synth;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec;
use crate::hints::Hints;
use crate::oracle::Oracle;
use crate::platform::PlatformDescription;
use crate::resolver;
use crate::selector;
use crate::types::{
    CandidateTable, ComposedPad, ComposedState, CompositionMode, Provenance, VgpioBucket,
};

/// A virtual table layered in blind mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayeredTable {
    /// Bucket the table was chosen for
    pub bucket: VgpioBucket,
    /// Table id
    pub table_id: usize,
}

/// Summary of one composition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionReport {
    /// Mode actually used (never `Auto`)
    pub mode: CompositionMode,
    /// Base table id
    pub base_table_id: usize,
    /// Oracle-mode overwrites
    pub corrections: usize,
    /// Blind-mode layered tables
    pub layered: Vec<LayeredTable>,
    /// Pads inserted by gap synthesis
    pub synthesized: usize,
}

/// Composed state together with its report.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// Final pad state
    pub state: ComposedState,
    /// What happened
    pub report: CompositionReport,
}

/// Mode actually used for a request, given whether an oracle is loaded.
pub fn effective_mode(requested: CompositionMode, oracle: Option<&Oracle>) -> CompositionMode {
    match (requested, oracle.is_some()) {
        (CompositionMode::Auto, true) | (CompositionMode::Oracle, true) => CompositionMode::Oracle,
        (CompositionMode::Oracle, false) => {
            warn!("Oracle composition requested without an oracle, using blind mode");
            CompositionMode::Blind
        }
        _ => CompositionMode::Blind,
    }
}

/// Named, valid pads of a table with table provenance.
pub fn table_pads<'a>(
    table: &'a CandidateTable,
    platform: &'a PlatformDescription,
) -> impl Iterator<Item = ComposedPad> + 'a {
    resolver::resolve_table(table, platform)
        .into_iter()
        .filter_map(move |(name, entry)| {
            codec::decode_valid(&entry.raw).map(|record| ComposedPad {
                name,
                record,
                provenance: Provenance::Table {
                    table_id: table.id,
                    table_offset: table.offset,
                    entry_offset: entry.offset,
                },
            })
        })
}

fn base_state(base: &CandidateTable, platform: &PlatformDescription) -> ComposedState {
    let mut state = ComposedState::new();
    for pad in table_pads(base, platform) {
        state.insert(pad);
    }
    debug!("Base state: {} pads from table #{}", state.len(), base.id);
    state
}

/// Oracle-guided composition.
///
/// Starts from the base table. For every other table in ascending
/// `(offset, stride)` order, a pad whose mode matches the oracle replaces
/// the current record when that record is missing or disagrees with the
/// oracle. Returns the state and the number of replacements.
pub fn compose_oracle(
    tables: &[CandidateTable],
    base: &CandidateTable,
    oracle: &Oracle,
    platform: &PlatformDescription,
) -> (ComposedState, usize) {
    let mut state = base_state(base, platform);
    let mut corrections = 0;

    for table in selector::composition_order(tables) {
        if table.id == base.id {
            continue;
        }

        let mut applied = 0;
        for pad in table_pads(table, platform) {
            let Some(expected) = oracle.expected(&pad.name.name) else {
                continue;
            };
            if pad.record.mode.code() != expected {
                continue;
            }
            let current_ok = state
                .get(&pad.name.name)
                .is_some_and(|p| p.record.mode.code() == expected);
            if !current_ok {
                state.insert(pad);
                applied += 1;
            }
        }

        if applied > 0 {
            debug!("Table #{}: {} correction(s)", table.id, applied);
            corrections += applied;
        }
    }

    info!("Oracle composition: {} correction(s)", corrections);
    (state, corrections)
}

/// Composition without ground truth.
///
/// Starts from the base table and, per VGPIO bucket, copies every valid
/// entry of the table with the most valid named entries over the state.
pub fn compose_blind(
    tables: &[CandidateTable],
    base: &CandidateTable,
    platform: &PlatformDescription,
) -> (ComposedState, Vec<LayeredTable>) {
    let mut state = base_state(base, platform);
    let mut layered = Vec::new();

    for bucket in VgpioBucket::ALL {
        let Some(table) = selector::best_virtual(tables, bucket, platform) else {
            continue;
        };

        for pad in table_pads(table, platform) {
            let name = pad.name.name.clone();
            let new_raw = (pad.record.dw0, pad.record.dw1);
            if let Some(previous) = state.insert(pad) {
                if (previous.record.dw0, previous.record.dw1) != new_raw {
                    debug!(
                        "{}: table #{} replaces {:08x}/{:08x} with {:08x}/{:08x}",
                        name,
                        table.id,
                        previous.record.dw0,
                        previous.record.dw1,
                        new_raw.0,
                        new_raw.1
                    );
                }
            }
        }

        debug!("Layered {} table #{}", bucket, table.id);
        layered.push(LayeredTable {
            bucket,
            table_id: table.id,
        });
    }

    info!("Blind composition: {} virtual table(s) layered", layered.len());
    (state, layered)
}

/// Compose the final state for `base` and run gap synthesis.
pub fn compose(
    tables: &[CandidateTable],
    base: &CandidateTable,
    requested: CompositionMode,
    oracle: Option<&Oracle>,
    hints: Option<&Hints>,
    platform: &PlatformDescription,
) -> Composition {
    let mode = effective_mode(requested, oracle);

    let (mut state, corrections, layered) = match (mode, oracle) {
        (CompositionMode::Oracle, Some(oracle)) => {
            let (state, corrections) = compose_oracle(tables, base, oracle, platform);
            (state, corrections, Vec::new())
        }
        _ => {
            let (state, layered) = compose_blind(tables, base, platform);
            (state, 0, layered)
        }
    };

    let synthesized = synth::synthesize(&mut state, oracle, hints, platform);

    Composition {
        state,
        report: CompositionReport {
            mode,
            base_table_id: base.id,
            corrections,
            layered,
            synthesized,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PadMode, RawRegisterPair, TableEntry};
    use std::collections::BTreeMap;

    fn table(id: usize, offset: usize, dw0s: &[u32], vgpio: bool) -> CandidateTable {
        let entries: Vec<TableEntry> = dw0s
            .iter()
            .enumerate()
            .map(|(i, &dw0)| TableEntry {
                index: i,
                offset: offset + i * 8,
                raw: RawRegisterPair::new(dw0, 0),
            })
            .collect();
        CandidateTable {
            id,
            offset,
            stride: 8,
            entry_count: entries.len(),
            entries,
            confidence: 1.0,
            is_signature_match: !vgpio,
            is_vgpio: vgpio,
        }
    }

    fn oracle(pairs: &[(&str, u8)]) -> Oracle {
        Oracle::from_map(
            pairs
                .iter()
                .map(|&(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_effective_mode() {
        let o = oracle(&[("GPP_I0", 0)]);
        assert_eq!(effective_mode(CompositionMode::Auto, Some(&o)), CompositionMode::Oracle);
        assert_eq!(effective_mode(CompositionMode::Auto, None), CompositionMode::Blind);
        assert_eq!(effective_mode(CompositionMode::Oracle, None), CompositionMode::Blind);
        assert_eq!(effective_mode(CompositionMode::Blind, Some(&o)), CompositionMode::Blind);
    }

    #[test]
    fn test_oracle_corrections() {
        let platform = PlatformDescription::alder_lake_s();
        // base has GPP_I1 wrong (GPIO instead of NF1)
        let base = table(0, 0x100, &[0x8000_0000, 0x8000_0000, 0x8000_0400], false);
        // later table has GPP_I1 right and GPP_I2 wrong
        let other = table(1, 0x800, &[0x8000_0000, 0x8000_0400, 0x8000_0000], false);
        let o = oracle(&[("GPP_I0", 0), ("GPP_I1", 1), ("GPP_I2", 1)]);

        let tables = vec![base.clone(), other];
        let (state, corrections) = compose_oracle(&tables, &base, &o, &platform);

        assert_eq!(corrections, 1);
        assert_eq!(state.get("GPP_I1").unwrap().record.mode, PadMode::Nf1);
        assert_eq!(state.get("GPP_I1").unwrap().provenance.table_id(), Some(1));
        // correct base value is kept
        assert_eq!(state.get("GPP_I2").unwrap().provenance.table_id(), Some(0));
    }

    #[test]
    fn test_blind_layers_virtual_tables() {
        let platform = PlatformDescription::alder_lake_s();
        let base = table(0, 0x100, &[0x8000_0000; 30], false);
        let usb = table(1, 0x1000, &[0x4000_0400; 12], true);
        let standard = table(2, 0x2000, &[0x4000_0800; 38], true);

        let tables = vec![base.clone(), usb, standard];
        let (state, layered) = compose_blind(&tables, &base, &platform);

        assert_eq!(layered.len(), 2);
        assert_eq!(layered[0].bucket, VgpioBucket::Usb);
        assert_eq!(state.len(), 30 + 12 + 38);
        assert_eq!(state.get("VGPIO_37").unwrap().record.mode, PadMode::Nf2);
    }

    #[test]
    fn test_compose_report() {
        let platform = PlatformDescription::alder_lake_s();
        let base = table(0, 0x100, &[0x8000_0000; 30], false);
        let tables = vec![base.clone()];

        let composition = compose(
            &tables,
            &base,
            CompositionMode::Auto,
            None,
            None,
            &platform,
        );
        assert_eq!(composition.report.mode, CompositionMode::Blind);
        assert_eq!(composition.report.base_table_id, 0);
        assert_eq!(composition.report.synthesized, 51);
        assert_eq!(composition.state.len(), 30 + 51);
    }
}
