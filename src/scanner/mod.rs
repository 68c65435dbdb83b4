//! Candidate table discovery.
//!
//! Two strategies run over the raw buffer. The signature scan looks for the
//! platform's leading `(mode, reset)` fingerprint and tolerates short gaps;
//! the generic scan accepts any run of plausible entries. The generic pass
//! is skipped when the signature pass already produced both a large physical
//! table and a virtual table.

pub mod generic;
pub mod signature;

use tracing::{debug, info};

use crate::classifier;
use crate::error::{RecoveryError, Result};
use crate::platform::PlatformDescription;
use crate::types::{CandidateTable, ScanOptions, TableEntry};

/// Scan a buffer for candidate pad tables.
///
/// Tables are returned in discovery order: signature tables by stride, then
/// generic tables by stride, with `id` numbering that order. A generic table
/// at an `(offset, stride)` already found by the signature scan is dropped.
/// Options that fail validation, or whose `min_entries` reaches the
/// platform's generic-run cap, are a `ConfigError`.
pub fn scan_for_tables(
    data: &[u8],
    options: &ScanOptions,
    platform: &PlatformDescription,
) -> Result<Vec<CandidateTable>> {
    options.validate()?;
    if options.min_entries >= platform.generic_max_entries {
        return Err(RecoveryError::ConfigError {
            message: format!(
                "min_entries {} leaves no room below the {}-entry cap",
                options.min_entries, platform.generic_max_entries
            ),
        });
    }

    let mut tables = per_stride(&options.signature_strides, |stride| {
        signature::scan(data, stride, options, platform)
    });
    if !tables.is_empty() {
        info!("Signature scan found {} table(s)", tables.len());
    }

    let physical = tables
        .iter()
        .filter(|t| !t.is_vgpio && t.entry_count > platform.short_circuit_physical)
        .count();
    let virtual_tables = tables.iter().filter(|t| t.is_vgpio).count();

    if physical > 0 && virtual_tables > 0 && !options.force_generic {
        info!(
            "Signature scan found {} physical + {} virtual table(s), skipping generic scan",
            physical, virtual_tables
        );
    } else {
        debug!("Running generic scan");
        let generic = per_stride(&options.generic_strides, |stride| {
            generic::scan(data, stride, options, platform)
        });
        for table in generic {
            let duplicate = tables
                .iter()
                .any(|t| t.offset == table.offset && t.stride == table.stride);
            if !duplicate {
                tables.push(table);
            }
        }
    }

    for (id, table) in tables.iter_mut().enumerate() {
        table.id = id;
    }

    Ok(tables)
}

/// Run a per-stride scan for every stride and join results in stride order.
#[cfg(not(feature = "parallel"))]
fn per_stride<F>(strides: &[usize], scan: F) -> Vec<CandidateTable>
where
    F: Fn(usize) -> Vec<CandidateTable>,
{
    strides.iter().flat_map(|&stride| scan(stride)).collect()
}

/// Run a per-stride scan for every stride and join results in stride order.
#[cfg(feature = "parallel")]
fn per_stride<F>(strides: &[usize], scan: F) -> Vec<CandidateTable>
where
    F: Fn(usize) -> Vec<CandidateTable> + Sync + Send,
{
    use rayon::prelude::*;

    let per: Vec<Vec<CandidateTable>> = strides.par_iter().map(|&stride| scan(stride)).collect();
    per.into_iter().flatten().collect()
}

/// Assemble a table from a collected run, classifying it on the way.
pub(crate) fn build_table(
    offset: usize,
    stride: usize,
    entries: Vec<TableEntry>,
    confidence: f64,
    is_signature_match: bool,
    platform: &PlatformDescription,
) -> CandidateTable {
    let entry_count = entries.len();
    let is_vgpio = classifier::is_vgpio(&entries, entry_count, platform);
    CandidateTable {
        id: 0,
        offset,
        stride,
        entries,
        entry_count,
        confidence,
        is_signature_match,
        is_vgpio,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Synthetic firmware images shared by scanner and pipeline tests.

    /// NF1 / deep sleep / NAFVWE, the shape of a virtual pad
    pub const VIRTUAL_DW0: u32 = 0x4800_0400;
    /// UP_20K in DW1 keeps misaligned windows invalid
    pub const PULL_DW1: u32 = 0xC << 10;

    pub fn push(buf: &mut Vec<u8>, dw0: u32, dw1: u32) {
        buf.extend_from_slice(&dw0.to_le_bytes());
        buf.extend_from_slice(&dw1.to_le_bytes());
    }

    /// Physical table of `n` entries starting with the Alder Lake signature.
    pub fn physical_table(n: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(n * 8);
        for i in 0..n {
            let mode: u32 = if (1..5).contains(&i) { 1 } else { 0 };
            push(&mut buf, 0x8000_0000 | (mode << 10), PULL_DW1);
        }
        buf
    }

    /// Virtual table of `n` entries.
    pub fn virtual_table(n: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(n * 8);
        for _ in 0..n {
            push(&mut buf, VIRTUAL_DW0, PULL_DW1);
        }
        buf
    }

    /// Words past DW1 in wide entries; mode nibbles above 7 keep
    /// misaligned windows invalid.
    pub const TRAILING_WORDS: [u32; 3] = [0x0000_3C00, 0x0000_3000, 0x0000_3C00];

    /// Re-lay an 8-byte-stride table at a wider stride.
    pub fn widen(table: &[u8], stride: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(table.len() / 8 * stride);
        for entry in table.chunks_exact(8) {
            buf.extend_from_slice(entry);
            for word in TRAILING_WORDS.iter().take((stride - 8) / 4) {
                buf.extend_from_slice(&word.to_le_bytes());
            }
        }
        buf
    }
}
