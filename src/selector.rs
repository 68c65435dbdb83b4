//! Candidate table ranking.
//!
//! Chooses the physical base table and one virtual table per bucket from
//! everything the scanner produced, either by shape alone or by agreement
//! with an oracle.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, info};

use crate::codec;
use crate::oracle::Oracle;
use crate::platform::PlatformDescription;
use crate::resolver;
use crate::types::{CandidateTable, VgpioBucket};

/// Tables chosen for composition.
#[derive(Debug, Clone, Default)]
pub struct Selection<'a> {
    /// Physical base table
    pub base: Option<&'a CandidateTable>,
    /// Best virtual table per bucket, in bucket order
    pub virtual_tables: Vec<(VgpioBucket, &'a CandidateTable)>,
}

/// Agreement between a table and an oracle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableScore {
    /// Named entries whose mode equals the oracle's
    pub matched: usize,
    /// Pads in the oracle
    pub oracle_size: usize,
    /// `matched / oracle_size`, 0 for an empty oracle
    pub accuracy: f64,
}

/// Entries of `table` that decode and resolve to a pad name.
pub fn valid_named_count(table: &CandidateTable, platform: &PlatformDescription) -> usize {
    resolver::resolve_table(table, platform)
        .into_iter()
        .filter(|(_, entry)| codec::decode_valid(&entry.raw).is_some())
        .count()
}

/// Pick the base and virtual tables by shape.
///
/// The base is the signature-matched physical table closest to the
/// canonical pad count, or failing that the most confident physical table.
pub fn filter_best<'a>(
    tables: &'a [CandidateTable],
    platform: &PlatformDescription,
) -> Selection<'a> {
    let base = select_base(tables, platform);
    if let Some(base) = base {
        info!(
            "Base table #{}: {} entries at 0x{:x}",
            base.id, base.entry_count, base.offset
        );
    }

    let virtual_tables = VgpioBucket::ALL
        .iter()
        .filter_map(|&bucket| best_virtual(tables, bucket, platform).map(|t| (bucket, t)))
        .collect::<Vec<_>>();
    for (bucket, table) in &virtual_tables {
        info!(
            "{} table #{}: {} entries at 0x{:x}, stride {}",
            bucket, table.id, table.entry_count, table.offset, table.stride
        );
    }

    Selection {
        base,
        virtual_tables,
    }
}

/// Physical base table by shape alone.
pub fn select_base<'a>(
    tables: &'a [CandidateTable],
    platform: &PlatformDescription,
) -> Option<&'a CandidateTable> {
    let canonical = platform.canonical_physical_count;

    let signature = tables
        .iter()
        .filter(|t| t.is_signature_match && !t.is_vgpio)
        .min_by_key(|t| t.entry_count.abs_diff(canonical));
    if signature.is_some() {
        return signature;
    }

    tables
        .iter()
        .filter(|t| !t.is_vgpio)
        .max_by(|a, b| {
            a.confidence
                .total_cmp(&b.confidence)
                .then(a.entry_count.cmp(&b.entry_count))
                .then(b.offset.cmp(&a.offset))
                .then(b.stride.cmp(&a.stride))
        })
}

/// Virtual table for `bucket` with the most valid named entries.
///
/// Ties go to the lowest offset.
pub fn best_virtual<'a>(
    tables: &'a [CandidateTable],
    bucket: VgpioBucket,
    platform: &PlatformDescription,
) -> Option<&'a CandidateTable> {
    tables
        .iter()
        .filter(|t| t.is_vgpio && platform.bucket_for(t.entry_count) == Some(bucket))
        .map(|t| (valid_named_count(t, platform), t))
        .max_by(|(a_count, a), (b_count, b)| {
            a_count
                .cmp(b_count)
                .then(b.offset.cmp(&a.offset))
                .then(b.stride.cmp(&a.stride))
        })
        .map(|(_, t)| t)
}

/// Score a table against an oracle.
pub fn score_table(
    table: &CandidateTable,
    oracle: &Oracle,
    platform: &PlatformDescription,
) -> TableScore {
    let matched = resolver::resolve_table(table, platform)
        .into_iter()
        .filter(|(name, entry)| {
            let Some(record) = codec::decode_valid(&entry.raw) else {
                return false;
            };
            oracle.expected(&name.name) == Some(record.mode.code())
        })
        .count();

    let oracle_size = oracle.len();
    let accuracy = if oracle_size == 0 {
        0.0
    } else {
        matched as f64 / oracle_size as f64
    };

    TableScore {
        matched,
        oracle_size,
        accuracy,
    }
}

/// Physical base table by oracle agreement.
///
/// Ties go to signature matches, then to the table closest to the canonical
/// pad count, then to the lowest offset.
pub fn select_base_by_oracle<'a>(
    tables: &'a [CandidateTable],
    oracle: &Oracle,
    platform: &PlatformDescription,
) -> Option<&'a CandidateTable> {
    let canonical = platform.canonical_physical_count;

    let mut scored: Vec<(TableScore, &CandidateTable)> = tables
        .iter()
        .filter(|t| !t.is_vgpio)
        .map(|t| (score_table(t, oracle, platform), t))
        .collect();
    for (score, table) in &scored {
        debug!(
            "Table #{} matches {}/{} oracle pads",
            table.id, score.matched, score.oracle_size
        );
    }

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.accuracy
            .total_cmp(&sa.accuracy)
            .then(b.is_signature_match.cmp(&a.is_signature_match))
            .then(
                a.entry_count
                    .abs_diff(canonical)
                    .cmp(&b.entry_count.abs_diff(canonical)),
            )
            .then(a.offset.cmp(&b.offset))
            .then(a.stride.cmp(&b.stride))
    });

    let best = scored.first().map(|(score, table)| (*score, *table));
    if let Some((score, table)) = best {
        info!(
            "Oracle base table #{} (accuracy {:.1}%)",
            table.id,
            score.accuracy * 100.0
        );
    }
    best.map(|(_, table)| table)
}

/// Order tables by ascending `(offset, stride)`.
pub fn composition_order(tables: &[CandidateTable]) -> Vec<&CandidateTable> {
    let mut ordered: Vec<&CandidateTable> = tables.iter().collect();
    ordered.sort_by(|a, b| match a.offset.cmp(&b.offset) {
        Ordering::Equal => a.stride.cmp(&b.stride),
        other => other,
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawRegisterPair, TableEntry};
    use std::collections::BTreeMap;

    fn table(
        id: usize,
        offset: usize,
        dw0s: &[u32],
        signature: bool,
        vgpio: bool,
    ) -> CandidateTable {
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
            confidence: if signature { 1.0 } else { 0.5 },
            is_signature_match: signature,
            is_vgpio: vgpio,
        }
    }

    #[test]
    fn test_base_prefers_canonical_size() {
        let platform = PlatformDescription::alder_lake_s();
        let tables = vec![
            table(0, 0, &[0x8000_0000; 150], true, false),
            table(1, 0x1000, &[0x8000_0000; 250], true, false),
            table(2, 0x3000, &[0x8000_0000; 254], true, false),
        ];
        let sel = filter_best(&tables, &platform);
        // 250 and 254 tie; first wins
        assert_eq!(sel.base.unwrap().id, 1);
    }

    #[test]
    fn test_base_fallback_to_confidence() {
        let platform = PlatformDescription::alder_lake_s();
        let mut low = table(0, 0, &[0x8000_0000; 40], false, false);
        low.confidence = 0.4;
        let mut high = table(1, 0x800, &[0x8000_0000; 120], false, false);
        high.confidence = 1.0;
        let mut high_late = table(2, 0x2000, &[0x8000_0000; 120], false, false);
        high_late.confidence = 1.0;
        let vgpio = table(3, 0x4000, &[0x4000_0400; 38], false, true);

        let tables = vec![low, high, high_late, vgpio];
        assert_eq!(filter_best(&tables, &platform).base.unwrap().id, 1);
    }

    #[test]
    fn test_no_physical_table() {
        let platform = PlatformDescription::alder_lake_s();
        let tables = vec![table(0, 0, &[0x4000_0400; 12], false, true)];
        let sel = filter_best(&tables, &platform);
        assert!(sel.base.is_none());
        assert_eq!(sel.virtual_tables.len(), 1);
        assert_eq!(sel.virtual_tables[0].0, VgpioBucket::Usb);
    }

    #[test]
    fn test_virtual_most_valid_wins() {
        let platform = PlatformDescription::alder_lake_s();
        let mut sparse = vec![0x4000_0400; 38];
        sparse[3] = 0;
        let tables = vec![
            table(0, 0x100, &sparse, false, true),
            table(1, 0x900, &[0x4000_0400; 38], false, true),
            table(2, 0x1900, &[0x4000_0400; 38], false, true),
        ];
        let best = best_virtual(&tables, VgpioBucket::Standard, &platform).unwrap();
        assert_eq!(best.id, 1);
    }

    #[test]
    fn test_score_and_oracle_base() {
        let platform = PlatformDescription::alder_lake_s();
        let mut modes = BTreeMap::new();
        modes.insert("GPP_I0".to_string(), 0);
        modes.insert("GPP_I1".to_string(), 1);
        modes.insert("GPP_I2".to_string(), 1);
        modes.insert("GPP_I3".to_string(), 1);
        let oracle = Oracle::from_map(modes);

        let good = table(0, 0x2000, &[0x8000_0000, 0x8000_0400, 0x8000_0400, 0x8000_0400], false, false);
        let bad = table(1, 0x100, &[0x8000_0000; 4], true, false);

        let score = score_table(&good, &oracle, &platform);
        assert_eq!(score.matched, 4);
        assert_eq!(score.oracle_size, 4);
        assert_eq!(score.accuracy, 1.0);
        assert_eq!(score_table(&bad, &oracle, &platform).matched, 1);

        let tables = vec![bad, good];
        assert_eq!(
            select_base_by_oracle(&tables, &oracle, &platform).unwrap().id,
            0
        );
    }

    #[test]
    fn test_composition_order() {
        let tables = vec![
            table(0, 0x300, &[1], false, false),
            table(1, 0x100, &[1], false, false),
            table(2, 0x200, &[1], false, false),
        ];
        let order: Vec<_> = composition_order(&tables).iter().map(|t| t.id).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
