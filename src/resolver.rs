//! Entry index to pad name resolution.

use crate::platform::PlatformDescription;
use crate::types::{CandidateTable, PadKind, PadName, TableEntry, VgpioBucket};

/// Name of the physical pad at linear `index`, or `None` past the last group.
pub fn resolve_physical(index: usize, platform: &PlatformDescription) -> Option<PadName> {
    let mut remaining = index;
    for group in &platform.groups {
        if remaining < group.count {
            return Some(PadName::physical(group.name, remaining));
        }
        remaining -= group.count;
    }
    None
}

/// Name of the virtual pad at `index` in a table of `entry_count` entries.
///
/// Tables whose size falls in no bucket range have no names.
pub fn resolve_virtual(
    index: usize,
    entry_count: usize,
    platform: &PlatformDescription,
) -> Option<PadName> {
    platform
        .bucket_for(entry_count)
        .map(|bucket| PadName::virtual_pad(bucket, index))
}

/// Name of one entry of `table`, using its positional index.
pub fn resolve_entry(
    table: &CandidateTable,
    entry: &TableEntry,
    platform: &PlatformDescription,
) -> Option<PadName> {
    if table.is_vgpio {
        resolve_virtual(entry.index, table.entry_count, platform)
    } else {
        resolve_physical(entry.index, platform)
    }
}

/// All named entries of `table`; entries with no name are dropped.
pub fn resolve_table<'a>(
    table: &'a CandidateTable,
    platform: &PlatformDescription,
) -> Vec<(PadName, &'a TableEntry)> {
    table
        .entries
        .iter()
        .filter_map(|entry| resolve_entry(table, entry, platform).map(|name| (name, entry)))
        .collect()
}

/// Canonical ordering rank of a pad's group.
///
/// Physical groups come first in wire order, then the USB, standard and
/// PCIe virtual groups. Unknown physical groups sort after every known group.
pub fn group_rank(name: &PadName, platform: &PlatformDescription) -> usize {
    let physical = platform.groups.len();
    match name.kind {
        PadKind::Physical => platform.group_position(&name.group).unwrap_or(physical + 3),
        PadKind::Virtual(bucket) => {
            physical
                + match bucket {
                    VgpioBucket::Usb => 0,
                    VgpioBucket::Standard => 1,
                    VgpioBucket::Pcie => 2,
                }
        }
    }
}

/// Sort key placing pads in canonical output order.
pub fn sort_key(name: &PadName, platform: &PlatformDescription) -> (usize, usize) {
    (group_rank(name, platform), name.local_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawRegisterPair;

    #[test]
    fn test_physical_boundaries() {
        let platform = PlatformDescription::alder_lake_s();
        assert_eq!(resolve_physical(0, &platform).unwrap().name, "GPP_I0");
        assert_eq!(resolve_physical(22, &platform).unwrap().name, "GPP_I22");
        assert_eq!(resolve_physical(23, &platform).unwrap().name, "GPP_R0");
        assert_eq!(resolve_physical(57, &platform).unwrap().name, "GPP_B0");
        assert_eq!(resolve_physical(254, &platform).unwrap().name, "GPP_D23");
        assert!(resolve_physical(255, &platform).is_none());
    }

    #[test]
    fn test_virtual_buckets() {
        let platform = PlatformDescription::alder_lake_s();
        assert_eq!(resolve_virtual(3, 12, &platform).unwrap().name, "VGPIO_USB_3");
        assert_eq!(resolve_virtual(3, 38, &platform).unwrap().name, "VGPIO_3");
        assert_eq!(resolve_virtual(3, 80, &platform).unwrap().name, "VGPIO_PCIE_3");
        assert!(resolve_virtual(3, 50, &platform).is_none());
    }

    #[test]
    fn test_names_unique_within_table() {
        let platform = PlatformDescription::alder_lake_s();
        let entries = (0..300)
            .map(|i| TableEntry {
                index: i,
                offset: i * 8,
                raw: RawRegisterPair::new(0x8000_0000, 0),
            })
            .collect::<Vec<_>>();
        let table = CandidateTable {
            id: 0,
            offset: 0,
            stride: 8,
            entry_count: entries.len(),
            entries,
            confidence: 1.0,
            is_signature_match: true,
            is_vgpio: false,
        };
        let named = resolve_table(&table, &platform);
        assert_eq!(named.len(), 255);
        let mut names: Vec<_> = named.iter().map(|(n, _)| n.name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 255);
    }

    #[test]
    fn test_group_rank_order() {
        let platform = PlatformDescription::alder_lake_s();
        let i0 = PadName::physical("GPP_I", 0);
        let d0 = PadName::physical("GPP_D", 0);
        let usb = PadName::virtual_pad(VgpioBucket::Usb, 0);
        let std = PadName::virtual_pad(VgpioBucket::Standard, 0);
        let pcie = PadName::virtual_pad(VgpioBucket::Pcie, 0);

        assert!(group_rank(&i0, &platform) < group_rank(&d0, &platform));
        assert!(group_rank(&d0, &platform) < group_rank(&usb, &platform));
        assert!(group_rank(&usb, &platform) < group_rank(&std, &platform));
        assert!(group_rank(&std, &platform) < group_rank(&pcie, &platform));
    }
}
