//! Fixed-stride scan for runs of plausible entries.

use tracing::debug;

use crate::codec;
use crate::platform::PlatformDescription;
use crate::types::{CandidateTable, ScanOptions, TableEntry};

/// Confidence for a generic run of `count` entries.
pub fn confidence(count: usize, max_entries: usize) -> f64 {
    if count == 0 || count > max_entries {
        return 0.0;
    }
    (count as f64 / 100.0).min(1.0)
}

/// Scan `data` at one stride for runs of consecutive valid entries.
///
/// A run stops at the first invalid entry. Runs of at least
/// `options.min_entries` and below the platform cap become tables and the
/// scan resumes after them; anything else advances the offset by 4.
pub fn scan(
    data: &[u8],
    stride: usize,
    options: &ScanOptions,
    platform: &PlatformDescription,
) -> Vec<CandidateTable> {
    let mut tables = Vec::new();
    let limit = data
        .len()
        .saturating_sub(stride.saturating_mul(options.min_entries));
    let max_entries = platform.generic_max_entries;
    let mut offset = 0;

    while offset < limit {
        let entries = collect_run(data, offset, stride, max_entries);
        let count = entries.len();

        if count < options.min_entries || count >= max_entries {
            offset += 4;
            continue;
        }

        let next = offset + count * stride;
        let table = super::build_table(
            offset,
            stride,
            entries,
            confidence(count, max_entries),
            false,
            platform,
        );

        let noise = options
            .physical_noise_floor
            .is_some_and(|floor| !table.is_vgpio && count <= floor);
        if noise {
            debug!(
                "Dropping {}-entry fragment at 0x{:x} (stride {})",
                count, offset, stride
            );
        } else {
            debug!(
                "Generic table at 0x{:x}: {} entries, stride {}, vgpio={}",
                offset, count, stride, table.is_vgpio
            );
            tables.push(table);
        }

        offset = next;
    }

    tables
}

fn collect_run(data: &[u8], start: usize, stride: usize, max_entries: usize) -> Vec<TableEntry> {
    let mut entries = Vec::new();
    let mut pos = start;

    while entries.len() < max_entries {
        match codec::read_entry(data, pos, stride) {
            Some(raw) if codec::validate(&raw) => {
                entries.push(TableEntry {
                    index: entries.len(),
                    offset: pos,
                    raw,
                });
                pos += stride;
            }
            _ => break,
        }
    }

    entries
}
