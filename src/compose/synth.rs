//! Gap synthesis for virtual pads missing from every table.

use tracing::{debug, info};

use crate::codec;
use crate::hints::Hints;
use crate::oracle::Oracle;
use crate::platform::PlatformDescription;
use crate::types::{ComposedPad, ComposedState, PadName, Provenance, RawRegisterPair};

/// Fill canonical virtual pads absent from `state`.
///
/// With an oracle, only pads the oracle names are filled. Each filled pad
/// takes the best hint whose value decodes, or the platform default.
/// Existing pads are never touched. Returns the number of pads inserted.
pub fn synthesize(
    state: &mut ComposedState,
    oracle: Option<&Oracle>,
    hints: Option<&Hints>,
    platform: &PlatformDescription,
) -> usize {
    let mut inserted = 0;

    for &(bucket, count) in &platform.synthesis_universe {
        for index in 0..count {
            let name = PadName::virtual_pad(bucket, index);
            if state.contains(&name.name) {
                continue;
            }
            if oracle.is_some_and(|o| !o.contains(&name.name)) {
                continue;
            }

            let hint = hints.and_then(|h| {
                h.best_matching(&name.name, |hint| {
                    codec::decode_valid(&RawRegisterPair::new(hint.value, 0)).is_some()
                })
            });
            let raw = match hint {
                Some(hint) => {
                    debug!(
                        "{}: using hint 0x{:08x} from 0x{:x}",
                        name, hint.value, hint.address
                    );
                    RawRegisterPair::new(hint.value, 0)
                }
                None => platform.default_synthetic,
            };

            let Some(record) = codec::decode_valid(&raw) else {
                debug!("{}: default register does not decode, skipped", name);
                continue;
            };

            state.insert(ComposedPad {
                name,
                record,
                provenance: Provenance::Synthesized {
                    hint: hint.copied(),
                },
            });
            inserted += 1;
        }
    }

    if inserted > 0 {
        info!("Synthesized {} missing virtual pad(s)", inserted);
    }
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HintSource, PadMode, VgpioBucket};
    use std::collections::BTreeMap;

    fn existing(name: PadName, dw0: u32) -> ComposedPad {
        let raw = RawRegisterPair::new(dw0, 0);
        ComposedPad {
            name,
            record: codec::to_logical(&raw).unwrap(),
            provenance: Provenance::Table {
                table_id: 7,
                table_offset: 0x100,
                entry_offset: 0x128,
            },
        }
    }

    #[test]
    fn test_fills_full_universe() {
        let platform = PlatformDescription::alder_lake_s();
        let mut state = ComposedState::new();
        let n = synthesize(&mut state, None, None, &platform);
        assert_eq!(n, 12 + 39);
        assert!(state.contains("VGPIO_USB_11"));
        assert!(state.contains("VGPIO_38"));
        assert!(!state.contains("VGPIO_39"));
        let pad = state.get("VGPIO_0").unwrap();
        assert_eq!(pad.record.dw0, 0x4400_0400);
        assert_eq!(pad.record.mode, PadMode::Nf1);
        assert!(pad.provenance.is_synthesized());
    }

    #[test]
    fn test_never_overwrites() {
        let platform = PlatformDescription::alder_lake_s();
        let mut state = ComposedState::new();
        // NF2, deep sleep
        state.insert(existing(PadName::virtual_pad(VgpioBucket::Standard, 5), 0x4000_0800));

        synthesize(&mut state, None, None, &platform);

        let pad = state.get("VGPIO_5").unwrap();
        assert_eq!(pad.record.mode, PadMode::Nf2);
        assert_eq!(pad.provenance.table_id(), Some(7));
    }

    #[test]
    fn test_oracle_limits_universe() {
        let platform = PlatformDescription::alder_lake_s();
        let mut modes = BTreeMap::new();
        modes.insert("VGPIO_USB_0".to_string(), 1);
        modes.insert("GPP_B0".to_string(), 0);
        let oracle = Oracle::from_map(modes);

        let mut state = ComposedState::new();
        let n = synthesize(&mut state, Some(&oracle), None, &platform);
        assert_eq!(n, 1);
        assert!(state.contains("VGPIO_USB_0"));
        assert!(!state.contains("GPP_B0"));
    }

    #[test]
    fn test_hint_preferred() {
        let platform = PlatformDescription::alder_lake_s();
        let mut hints = Hints::new();
        hints.insert(
            "VGPIO_USB_0",
            HintSource {
                address: 0xdead_0000,
                value: 0xFFFF_FFFF,
                confidence: Some(0.99),
            },
        );
        hints.insert(
            "VGPIO_USB_0",
            HintSource {
                address: 0xffd0_1234,
                value: 0x4400_0600,
                confidence: Some(0.5),
            },
        );

        let mut state = ComposedState::new();
        synthesize(&mut state, None, Some(&hints), &platform);

        let pad = state.get("VGPIO_USB_0").unwrap();
        assert_eq!(pad.record.dw0, 0x4400_0600);
        assert_eq!(pad.record.dw1, 0);
        match pad.provenance {
            Provenance::Synthesized { hint: Some(h) } => assert_eq!(h.address, 0xffd0_1234),
            other => panic!("unexpected provenance {:?}", other),
        }
        // no hint for the rest
        assert!(matches!(
            state.get("VGPIO_USB_1").unwrap().provenance,
            Provenance::Synthesized { hint: None }
        ));
    }
}
