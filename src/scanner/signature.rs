//! Signature-anchored table scan.

use tracing::{debug, info};

use crate::codec;
use crate::platform::PlatformDescription;
use crate::types::{CandidateTable, ScanOptions, TableEntry};

/// Scan `data` at one stride for tables led by the platform signature.
///
/// Every 4-byte-aligned offset is tried. A match consumes entries until the
/// platform's cap is reached or too many consecutive invalid entries are
/// seen; single invalid entries inside the run are skipped.
pub fn scan(
    data: &[u8],
    stride: usize,
    options: &ScanOptions,
    platform: &PlatformDescription,
) -> Vec<CandidateTable> {
    let mut tables = Vec::new();
    let sig_len = platform.signature.len();
    if sig_len == 0 {
        return tables;
    }

    let limit = data.len().saturating_sub(stride.saturating_mul(sig_len));
    let min_keep = platform.signature_min_entries.max(options.min_entries);

    for offset in (0..limit).step_by(4) {
        if !matches_signature(data, offset, stride, platform) {
            continue;
        }
        debug!("Signature match at 0x{:x} (stride {})", offset, stride);

        let entries = collect_run(data, offset, stride, platform);
        if entries.len() < min_keep {
            debug!(
                "  dropped: {} entries, need {}",
                entries.len(),
                min_keep
            );
            continue;
        }

        info!(
            "Signature table at 0x{:x}: {} entries, stride {}",
            offset,
            entries.len(),
            stride
        );
        tables.push(super::build_table(offset, stride, entries, 1.0, true, platform));
    }

    tables
}

/// Whether the signature's `(mode, reset)` pairs appear at `offset`.
pub fn matches_signature(
    data: &[u8],
    offset: usize,
    stride: usize,
    platform: &PlatformDescription,
) -> bool {
    platform
        .signature
        .iter()
        .enumerate()
        .all(|(i, &(mode, reset))| {
            match codec::read_entry(data, offset + i * stride, stride) {
                Some(raw) => {
                    codec::mode_nibble(raw.dw0) == mode.code()
                        && codec::reset_domain(raw.dw0) == reset
                }
                None => false,
            }
        })
}

fn collect_run(
    data: &[u8],
    start: usize,
    stride: usize,
    platform: &PlatformDescription,
) -> Vec<TableEntry> {
    let mut entries = Vec::new();
    let mut streak = 0;
    let mut pos = start;

    while entries.len() < platform.signature_max_entries {
        let Some(raw) = codec::read_entry(data, pos, stride) else {
            break;
        };
        if codec::validate(&raw) {
            entries.push(TableEntry {
                index: (pos - start) / stride,
                offset: pos,
                raw,
            });
            streak = 0;
        } else {
            streak += 1;
            if streak > platform.signature_max_invalid_streak {
                break;
            }
        }
        pos += stride;
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn buffer(table: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; 256];
        data.extend_from_slice(table);
        data.extend(std::iter::repeat(0xFF).take(1024));
        data
    }

    #[test]
    fn test_signature_recovery() {
        let platform = PlatformDescription::alder_lake_s();
        let data = buffer(&physical_table(150));

        let tables: Vec<_> = [8, 12, 16]
            .iter()
            .flat_map(|&stride| scan(&data, stride, &ScanOptions::new(), &platform))
            .collect();

        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.offset, 256);
        assert_eq!(table.stride, 8);
        assert_eq!(table.entry_count, 150);
        assert!(table.is_signature_match);
        assert_eq!(table.confidence, 1.0);
        assert!(!table.is_vgpio);
    }

    #[test]
    fn test_isolated_invalid_entries_skipped() {
        let platform = PlatformDescription::alder_lake_s();
        let mut table = physical_table(60);
        // blank out entries 30 and 31: a streak of two is tolerated
        for b in &mut table[30 * 8..32 * 8] {
            *b = 0;
        }
        let data = buffer(&table);
        let tables = scan(&data, 8, &ScanOptions::new(), &platform);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].entry_count, 58);
        // positional indices keep counting across the gap
        assert_eq!(tables[0].entries[30].index, 32);
    }

    #[test]
    fn test_long_invalid_streak_ends_run() {
        let platform = PlatformDescription::alder_lake_s();
        let mut table = physical_table(60);
        for b in &mut table[25 * 8..28 * 8] {
            *b = 0;
        }
        let data = buffer(&table);
        let tables = scan(&data, 8, &ScanOptions::new(), &platform);

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].entry_count, 25);
    }

    #[test]
    fn test_short_run_dropped() {
        let platform = PlatformDescription::alder_lake_s();
        let data = buffer(&physical_table(19));
        assert!(scan(&data, 8, &ScanOptions::new(), &platform).is_empty());
    }

    #[test]
    fn test_cap() {
        let platform = PlatformDescription::alder_lake_s();
        let data = buffer(&physical_table(400));
        let tables = scan(&data, 8, &ScanOptions::new(), &platform);
        assert_eq!(tables[0].entry_count, 320);
    }

    #[test]
    fn test_reset_must_match() {
        let platform = PlatformDescription::alder_lake_s();
        let mut table = physical_table(40);
        // first entry in deep sleep instead of platform reset
        table[3] = 0x40;
        let data = buffer(&table);
        assert!(scan(&data, 8, &ScanOptions::new(), &platform).is_empty());
    }
}
