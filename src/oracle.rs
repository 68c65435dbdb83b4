//! Ground-truth pad modes.
//!
//! An [`Oracle`] maps pad names to the mode a known-good configuration
//! assigns them. It is read from a coreboot `gpio.h` reference header or a
//! flat JSON object, and is never modified once loaded.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RecoveryError, Result, ResultExt};
use crate::types::PadMode;

/// Pad name to expected mode code (0 = GPIO, 1..=7 = native function).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oracle {
    modes: BTreeMap<String, u8>,
}

/// Mode as written in a JSON oracle: a bare code or a name like `NF2`.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonMode {
    Code(u8),
    Name(String),
}

impl Oracle {
    /// Build an oracle from an existing map.
    pub fn from_map(modes: BTreeMap<String, u8>) -> Self {
        Self { modes }
    }

    /// Expected mode for a pad.
    pub fn expected(&self, name: &str) -> Option<u8> {
        self.modes.get(name).copied()
    }

    /// Whether the oracle names this pad.
    pub fn contains(&self, name: &str) -> bool {
        self.modes.contains_key(name)
    }

    /// Number of pads in the oracle.
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Whether the oracle is empty.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Iterate `(name, mode)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.modes.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Parse a coreboot `gpio.h` pad table.
    ///
    /// `PAD_CFG_*` macros give mode 0 unless the macro kind contains `NF`,
    /// in which case the fourth argument (`NFn`) supplies the mode, falling
    /// back to 1. `_PAD_CFG_STRUCT` entries take the mode from
    /// `PAD_FUNC(NFn)` in their flags.
    pub fn from_reference_header(text: &str) -> Result<Self> {
        let macro_re = Regex::new(r"^\s*PAD_CFG_([A-Z0-9_]+)\s*\(([^,]+),")
            .oracle_context("macro pattern")?;
        let struct_re = Regex::new(r"^\s*_PAD_CFG_STRUCT\s*\(([^,]+),\s*(.+?),")
            .oracle_context("struct pattern")?;
        let func_re = Regex::new(r"PAD_FUNC\(NF(\d+)\)").oracle_context("function pattern")?;

        let mut modes = BTreeMap::new();
        for line in text.lines() {
            if let Some(caps) = macro_re.captures(line) {
                let kind = &caps[1];
                let pad = caps[2].trim().to_string();
                let mode = if kind.contains("NF") {
                    native_function_arg(line)
                } else {
                    0
                };
                modes.insert(pad, mode);
                continue;
            }

            if let Some(caps) = struct_re.captures(line) {
                let pad = caps[1].trim().to_string();
                let flags = &caps[2];
                let mode = if flags.contains("PAD_FUNC(NF") {
                    func_re
                        .captures(flags)
                        .and_then(|c| c[1].parse().ok())
                        .unwrap_or(1)
                } else {
                    0
                };
                modes.insert(pad, mode);
            }
        }

        non_empty(Self { modes })
    }

    /// Parse a JSON object of pad name to mode.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, JsonMode> =
            serde_json::from_str(text).oracle_context("invalid JSON oracle")?;

        let mut modes = BTreeMap::new();
        for (name, mode) in raw {
            let code = match mode {
                JsonMode::Code(code) => code,
                JsonMode::Name(s) => parse_mode_name(&s).ok_or_else(|| {
                    RecoveryError::OracleUnavailable {
                        message: format!("unknown mode '{}' for {}", s, name),
                    }
                })?,
            };
            if PadMode::from_code(code).is_none() {
                return Err(RecoveryError::OracleUnavailable {
                    message: format!("mode {} for {} is out of range", code, name),
                });
            }
            modes.insert(name, code);
        }

        non_empty(Self { modes })
    }

    /// Load an oracle from disk: JSON for `.json` files, a header otherwise.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .oracle_context(format!("cannot read {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_reference_header(&text)
        }
    }
}

/// Mode from the fourth comma-separated field of a `PAD_CFG_NF*` line.
fn native_function_arg(line: &str) -> u8 {
    line.split(',')
        .nth(3)
        .filter(|arg| arg.contains("NF"))
        .and_then(|arg| arg.trim().replace("NF", "").replace(')', "").trim().parse().ok())
        .unwrap_or(1)
}

fn parse_mode_name(s: &str) -> Option<u8> {
    let upper = s.trim().to_ascii_uppercase();
    if upper == "GPIO" {
        return Some(0);
    }
    upper.strip_prefix("NF").and_then(|n| n.parse().ok())
}

fn non_empty(oracle: Oracle) -> Result<Oracle> {
    if oracle.is_empty() {
        return Err(RecoveryError::OracleUnavailable {
            message: "no pads found".to_string(),
        });
    }
    Ok(oracle)
}
