//! Accuracy scoring and state diffs.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::oracle::Oracle;
use crate::types::{ComposedPad, ComposedState, PadMode};

/// An oracle pad the state gets wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Pad name
    pub name: String,
    /// Mode the oracle expects
    pub expected: u8,
    /// Mode in the state, `None` when the pad is missing
    pub actual: Option<u8>,
}

/// Agreement of a composed state with an oracle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    /// Oracle pads whose mode matches
    pub matched: usize,
    /// Pads in the oracle
    pub total: usize,
    /// `matched / total` as a percentage
    pub percent: f64,
    /// Every oracle pad that did not match, in name order
    pub mismatches: Vec<Mismatch>,
}

/// Score a state against an oracle.
pub fn accuracy(state: &ComposedState, oracle: &Oracle) -> AccuracyReport {
    let mut matched = 0;
    let mut mismatches = Vec::new();

    for (name, expected) in oracle.iter() {
        let actual = state.get(name).map(|p| p.record.mode.code());
        if actual == Some(expected) {
            matched += 1;
        } else {
            mismatches.push(Mismatch {
                name: name.to_string(),
                expected,
                actual,
            });
        }
    }

    let total = oracle.len();
    let percent = if total == 0 {
        0.0
    } else {
        matched as f64 * 100.0 / total as f64
    };

    AccuracyReport {
        matched,
        total,
        percent,
        mismatches,
    }
}

/// Field that differs between two records of the same pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffField {
    /// Pad mode
    Mode,
    /// GPIO direction
    Direction,
    /// GPIO output level
    Output,
    /// Reset domain
    Reset,
    /// Termination
    Termination,
    /// Raw registers differ with equal decoded fields
    Raw,
}

impl fmt::Display for DiffField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mode => "Mode",
            Self::Direction => "Dir",
            Self::Output => "Val",
            Self::Reset => "Reset",
            Self::Termination => "Term",
            Self::Raw => "Raw",
        };
        write!(f, "{}", s)
    }
}

/// One differing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    /// Which field
    pub field: DiffField,
    /// Value on the left
    pub a: String,
    /// Value on the right
    pub b: String,
}

/// How one pad differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PadDifference {
    /// Only the right state has the pad
    MissingInA,
    /// Only the left state has the pad
    MissingInB,
    /// Both have it with different fields
    Fields {
        /// Differing fields
        fields: Vec<FieldDiff>,
    },
}

/// A differing pad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PadDiff {
    /// Pad name
    pub name: String,
    /// What differs
    pub difference: PadDifference,
}

/// Diff over one class of pads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetDiff {
    /// Pads identical in both states
    pub matches: usize,
    /// Pads present in both with differences
    pub mismatches: usize,
    /// Pads only in the right state
    pub missing_a: usize,
    /// Pads only in the left state
    pub missing_b: usize,
    /// Every differing pad, in name order
    pub details: Vec<PadDiff>,
}

impl SetDiff {
    /// Pads seen in either state.
    pub fn total(&self) -> usize {
        self.matches + self.mismatches + self.missing_a + self.missing_b
    }

    /// Whether both states agree completely.
    pub fn is_identical(&self) -> bool {
        self.mismatches == 0 && self.missing_a == 0 && self.missing_b == 0
    }
}

/// Diff of two composed states, physical and virtual pads apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateDiff {
    /// Physical pads
    pub physical: SetDiff,
    /// Virtual pads
    pub virtual_pads: SetDiff,
}

/// Field-level differences between two records of one pad.
///
/// Mode first; direction and output only when both are GPIO; then reset.
/// When the decoded fields agree but the registers do not, termination or
/// the raw words are reported.
pub fn field_diffs(a: &ComposedPad, b: &ComposedPad) -> Vec<FieldDiff> {
    let (ra, rb) = (&a.record, &b.record);
    let mut diffs = Vec::new();

    if ra.mode != rb.mode {
        diffs.push(FieldDiff {
            field: DiffField::Mode,
            a: ra.mode.to_string(),
            b: rb.mode.to_string(),
        });
    } else if ra.mode == PadMode::Gpio {
        if ra.direction != rb.direction {
            diffs.push(FieldDiff {
                field: DiffField::Direction,
                a: ra.direction.to_string(),
                b: rb.direction.to_string(),
            });
        }
        if ra.output_value != rb.output_value {
            diffs.push(FieldDiff {
                field: DiffField::Output,
                a: format_output(ra.output_value),
                b: format_output(rb.output_value),
            });
        }
    }

    if ra.reset_domain != rb.reset_domain {
        diffs.push(FieldDiff {
            field: DiffField::Reset,
            a: ra.reset_domain.to_string(),
            b: rb.reset_domain.to_string(),
        });
    }

    if diffs.is_empty() && (ra.dw0 != rb.dw0 || ra.dw1 != rb.dw1) {
        if ra.termination != rb.termination {
            diffs.push(FieldDiff {
                field: DiffField::Termination,
                a: ra.termination.to_string(),
                b: rb.termination.to_string(),
            });
        } else {
            diffs.push(FieldDiff {
                field: DiffField::Raw,
                a: format!("{:08x}/{:08x}", ra.dw0, ra.dw1),
                b: format!("{:08x}/{:08x}", rb.dw0, rb.dw1),
            });
        }
    }

    diffs
}

fn format_output(value: Option<u8>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Diff two composed states pad by pad.
pub fn diff_states(a: &ComposedState, b: &ComposedState) -> StateDiff {
    let names: BTreeSet<&str> = a
        .iter()
        .chain(b.iter())
        .map(|p| p.name.name.as_str())
        .collect();

    let mut diff = StateDiff::default();
    for name in names {
        let (pad_a, pad_b) = (a.get(name), b.get(name));
        let is_virtual = pad_a.or(pad_b).is_some_and(|p| p.name.is_virtual());
        let set = if is_virtual {
            &mut diff.virtual_pads
        } else {
            &mut diff.physical
        };

        let difference = match (pad_a, pad_b) {
            (None, Some(_)) => {
                set.missing_a += 1;
                PadDifference::MissingInA
            }
            (Some(_), None) => {
                set.missing_b += 1;
                PadDifference::MissingInB
            }
            (Some(pa), Some(pb)) => {
                let fields = field_diffs(pa, pb);
                if fields.is_empty() {
                    set.matches += 1;
                    continue;
                }
                set.mismatches += 1;
                PadDifference::Fields { fields }
            }
            (None, None) => continue,
        };
        set.details.push(PadDiff {
            name: name.to_string(),
            difference,
        });
    }

    diff
}
