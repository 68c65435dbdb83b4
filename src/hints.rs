//! Register-value hints from static analysis.
//!
//! Hints name a pad and propose DW0 values found elsewhere in the image.
//! Gap synthesis prefers them over the platform default when a pad is
//! missing from every table.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{RecoveryError, Result};
use crate::types::HintSource;

/// Keys of the legacy dump that carry no hint candidates.
const LEGACY_METADATA_KEYS: &[&str] = &["table_references", "gpio_functions"];

/// Suffix marking a candidate list in the legacy dump.
const LEGACY_SUFFIX: &str = "_candidates";

/// Ranked hint candidates per pad name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hints {
    candidates: BTreeMap<String, Vec<HintSource>>,
}

/// JSON integer, or a string that is always hexadecimal.
///
/// The disassembly dumps write addresses as bare hex (`"ffd01234"`), so a
/// string never falls back to decimal; `"1234"` is 0x1234. A `0x` prefix is
/// optional.
#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

impl Number {
    fn parse(&self) -> Option<u64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Text(s) => {
                let s = s.trim();
                let digits = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                u64::from_str_radix(digits, 16).ok()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawHint {
    address: Number,
    value: Number,
    #[serde(default)]
    confidence: Option<f64>,
}

impl Hints {
    /// Create an empty hint set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate for a pad; list order is rank order on ties.
    pub fn insert(&mut self, name: impl Into<String>, hint: HintSource) {
        self.candidates.entry(name.into()).or_default().push(hint);
    }

    /// All candidates for a pad in file order.
    pub fn candidates(&self, name: &str) -> &[HintSource] {
        self.candidates.get(name).map_or(&[], Vec::as_slice)
    }

    /// Highest-confidence candidate for a pad, first on ties.
    pub fn best(&self, name: &str) -> Option<&HintSource> {
        self.best_matching(name, |_| true)
    }

    /// Highest-confidence candidate accepted by `accept`, first on ties.
    pub fn best_matching<F>(&self, name: &str, accept: F) -> Option<&HintSource>
    where
        F: Fn(&HintSource) -> bool,
    {
        let mut best: Option<&HintSource> = None;
        for hint in self.candidates(name).iter().filter(|h| accept(h)) {
            let better = match best {
                None => true,
                Some(current) => rank(hint) > rank(current),
            };
            if better {
                best = Some(hint);
            }
        }
        best
    }

    /// Number of pads with at least one candidate.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Whether no pad has a candidate.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Parse hints from JSON.
    ///
    /// Accepts `{ "NAME": [ {address, value, confidence?} ] }` as well as the
    /// legacy dump, where `vgpio_usb_0_candidates` holds candidates for
    /// `VGPIO_USB_0`. Addresses and values are JSON integers or hex strings;
    /// write decimal values as integers.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(text).map_err(|e| RecoveryError::HintsUnavailable {
                message: format!("invalid JSON: {}", e),
            })?;

        let mut hints = Self::new();
        for (key, value) in raw {
            if LEGACY_METADATA_KEYS.contains(&key.as_str()) {
                continue;
            }
            let name = match key.strip_suffix(LEGACY_SUFFIX) {
                Some(stem) => stem.to_ascii_uppercase(),
                None => key.clone(),
            };

            let list: Vec<RawHint> =
                serde_json::from_value(value).map_err(|e| RecoveryError::HintsUnavailable {
                    message: format!("{}: {}", key, e),
                })?;
            for entry in list {
                let (Some(address), Some(value)) = (entry.address.parse(), entry.value.parse())
                else {
                    return Err(RecoveryError::HintsUnavailable {
                        message: format!("{}: unparseable address or value", key),
                    });
                };
                let value = u32::try_from(value).map_err(|_| RecoveryError::HintsUnavailable {
                    message: format!("{}: value 0x{:x} exceeds 32 bits", key, value),
                })?;
                hints.insert(
                    name.clone(),
                    HintSource {
                        address,
                        value,
                        confidence: entry.confidence,
                    },
                );
            }
        }

        debug!("Loaded hints for {} pad(s)", hints.len());
        Ok(hints)
    }

    /// Load hints from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RecoveryError::HintsUnavailable {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_json(&text)
    }
}

fn rank(hint: &HintSource) -> f64 {
    hint.confidence.unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_form() {
        let hints = Hints::from_json(
            r#"{
                "VGPIO_USB_0": [
                    {"address": "0xffd00010", "value": "0x44000600", "confidence": 0.4},
                    {"address": 4291821600, "value": 1140851712, "confidence": 0.9}
                ]
            }"#,
        )
        .unwrap();
        let best = hints.best("VGPIO_USB_0").unwrap();
        assert_eq!(best.value, 0x4400_0400);
        assert_eq!(best.confidence, Some(0.9));
        assert_eq!(hints.candidates("VGPIO_USB_0").len(), 2);
        assert!(hints.best("VGPIO_3").is_none());
    }

    #[test]
    fn test_legacy_dump() {
        let hints = Hints::from_json(
            r#"{
                "vgpio_usb_0_candidates": [
                    {"address": "ffd01234", "value": "0x44000600", "references": []},
                    {"address": "ffd05678", "value": "0x44000400", "references": []}
                ],
                "table_references": [],
                "gpio_functions": [{"name": "FUN_1"}]
            }"#,
        )
        .unwrap();
        assert_eq!(hints.len(), 1);
        let best = hints.best("VGPIO_USB_0").unwrap();
        // no confidence given: list order decides
        assert_eq!(best.value, 0x4400_0600);
        assert_eq!(best.address, 0xffd0_1234);
    }

    #[test]
    fn test_best_matching_filters() {
        let mut hints = Hints::new();
        hints.insert(
            "VGPIO_1",
            HintSource {
                address: 0,
                value: 0xFFFF_FFFF,
                confidence: Some(1.0),
            },
        );
        hints.insert(
            "VGPIO_1",
            HintSource {
                address: 4,
                value: 0x4400_0400,
                confidence: Some(0.1),
            },
        );
        let best = hints.best_matching("VGPIO_1", |h| h.value != u32::MAX).unwrap();
        assert_eq!(best.address, 4);
    }

    #[test]
    fn test_strings_are_hex() {
        let hints = Hints::from_json(
            r#"{"VGPIO_2": [
                {"address": "1234", "value": "44000400"},
                {"address": "0X10", "value": 1140851712}
            ]}"#,
        )
        .unwrap();
        let candidates = hints.candidates("VGPIO_2");
        assert_eq!(candidates[0].address, 0x1234);
        assert_eq!(candidates[0].value, 0x4400_0400);
        assert_eq!(candidates[1].address, 0x10);
        assert_eq!(candidates[1].value, candidates[0].value);
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            Hints::from_json("not json"),
            Err(RecoveryError::HintsUnavailable { .. })
        ));
        assert!(Hints::from_json(r#"{"VGPIO_0": [{"address": "zz", "value": 1}]}"#).is_err());
        assert!(Hints::from_json(r#"{"VGPIO_0": [{"address": 0, "value": 4294967296}]}"#).is_err());
    }
}
