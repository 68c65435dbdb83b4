//! Core types for pad table recovery.
//!
//! This module defines the register-level and logical views of a pad
//! configuration entry, the candidate tables produced by the scanner,
//! pad names, and the composed pad state handed to renderers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pad mode selection (DW0[13:10]).
///
/// Only codes 0..=7 exist on hardware. Larger nibbles are rejected by the
/// codec instead of being folded into a default member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadMode {
    /// General purpose I/O
    Gpio,
    /// Native function 1
    Nf1,
    /// Native function 2
    Nf2,
    /// Native function 3
    Nf3,
    /// Native function 4
    Nf4,
    /// Native function 5
    Nf5,
    /// Native function 6
    Nf6,
    /// Native function 7
    Nf7,
}

impl PadMode {
    /// Decode a mode nibble, `None` for codes above 7.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Gpio,
            1 => Self::Nf1,
            2 => Self::Nf2,
            3 => Self::Nf3,
            4 => Self::Nf4,
            5 => Self::Nf5,
            6 => Self::Nf6,
            7 => Self::Nf7,
            _ => return None,
        })
    }

    /// Integer code (0 = GPIO, 1..=7 = native function number).
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Name as used by coreboot pad macros.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gpio => "GPIO",
            Self::Nf1 => "NF1",
            Self::Nf2 => "NF2",
            Self::Nf3 => "NF3",
            Self::Nf4 => "NF4",
            Self::Nf5 => "NF5",
            Self::Nf6 => "NF6",
            Self::Nf7 => "NF7",
        }
    }
}

impl fmt::Display for PadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// GPIO direction, meaningful only in GPIO mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Input (also reported for bidirectional and Hi-Z buffers)
    Input,
    /// Output
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "INPUT"),
            Self::Output => write!(f, "OUTPUT"),
        }
    }
}

/// Pad reset domain (DW0[31:30]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetDomain {
    /// Power good (RSMRST on older parts)
    PowerGood,
    /// Deep sleep reset
    DeepSleep,
    /// Platform reset
    PlatformReset,
    /// Resume reset
    ResumeReset,
}

impl ResetDomain {
    /// Decode the two-bit reset field.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::PowerGood,
            0b01 => Self::DeepSleep,
            0b10 => Self::PlatformReset,
            _ => Self::ResumeReset,
        }
    }

    /// Two-bit field value.
    pub fn bits(self) -> u8 {
        match self {
            Self::PowerGood => 0b00,
            Self::DeepSleep => 0b01,
            Self::PlatformReset => 0b10,
            Self::ResumeReset => 0b11,
        }
    }

    /// Short name as used by coreboot pad macros.
    pub fn name(self) -> &'static str {
        match self {
            Self::PowerGood => "PWROK",
            Self::DeepSleep => "DEEP",
            Self::PlatformReset => "PLTRST",
            Self::ResumeReset => "RSMRST",
        }
    }
}

impl fmt::Display for ResetDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Termination / pull configuration (DW1[13:10]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No termination
    None,
    /// 5K pull-down
    PullDown5k,
    /// 20K pull-down
    PullDown20k,
    /// 1K pull-up
    PullUp1k,
    /// 2K pull-up
    PullUp2k,
    /// 5K pull-up
    PullUp5k,
    /// 20K pull-up
    PullUp20k,
    /// 1K and 2K pull-ups in parallel
    PullUp1k2k,
    /// Native function controls termination
    Native,
    /// Code with no defined meaning, kept verbatim
    Reserved(u8),
}

impl Termination {
    /// Decode a four-bit termination code.
    pub fn from_code(code: u8) -> Self {
        match code & 0xF {
            0x0 => Self::None,
            0x2 => Self::PullDown5k,
            0x4 => Self::PullDown20k,
            0x9 => Self::PullUp1k,
            0xB => Self::PullUp2k,
            0xA => Self::PullUp5k,
            0xC => Self::PullUp20k,
            0xD => Self::PullUp1k2k,
            0xF => Self::Native,
            other => Self::Reserved(other),
        }
    }

    /// Four-bit field value.
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0x0,
            Self::PullDown5k => 0x2,
            Self::PullDown20k => 0x4,
            Self::PullUp1k => 0x9,
            Self::PullUp2k => 0xB,
            Self::PullUp5k => 0xA,
            Self::PullUp20k => 0xC,
            Self::PullUp1k2k => 0xD,
            Self::Native => 0xF,
            Self::Reserved(code) => code & 0xF,
        }
    }

    /// Short name as used by coreboot pad macros.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::PullDown5k => "DN_5K",
            Self::PullDown20k => "DN_20K",
            Self::PullUp1k => "UP_1K",
            Self::PullUp2k => "UP_2K",
            Self::PullUp5k => "UP_5K",
            Self::PullUp20k => "UP_20K",
            Self::PullUp1k2k => "UP_1K_2K",
            Self::Native => "NATIVE",
            Self::Reserved(_) => "RESERVED",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved(code) => write!(f, "RESERVED(0x{:X})", code),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Interrupt routing (DW0[20:17]); the first set route wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptRoute {
    /// Not routed
    None,
    /// IOxAPIC
    Apic,
    /// SCI
    Sci,
    /// SMI
    Smi,
    /// NMI
    Nmi,
}

impl fmt::Display for InterruptRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Apic => "APIC",
            Self::Sci => "SCI",
            Self::Smi => "SMI",
            Self::Nmi => "NMI",
        };
        write!(f, "{}", s)
    }
}

/// RX event configuration (DW0[26:25]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Level triggered
    Level,
    /// Single edge
    EdgeSingle,
    /// Disabled
    Off,
    /// Both edges
    EdgeBoth,
}

impl Trigger {
    /// Decode the two-bit RX event field.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Level,
            0b01 => Self::EdgeSingle,
            0b10 => Self::Off,
            _ => Self::EdgeBoth,
        }
    }
}

/// Raw DW0/DW1 words read from one table entry.
///
/// `dw2`/`dw3` are only present when the window was 16 bytes or wider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRegisterPair {
    /// First configuration word
    pub dw0: u32,
    /// Second configuration word
    pub dw1: u32,
    /// Third word, if the window carried one
    pub dw2: Option<u32>,
    /// Fourth word, if the window carried one
    pub dw3: Option<u32>,
}

impl RawRegisterPair {
    /// Build a pair with no trailing words.
    pub fn new(dw0: u32, dw1: u32) -> Self {
        Self {
            dw0,
            dw1,
            dw2: None,
            dw3: None,
        }
    }
}

/// Decoded logical view of a [`RawRegisterPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadRecord {
    /// Pad mode
    pub mode: PadMode,
    /// Direction (meaningful only in GPIO mode)
    pub direction: Direction,
    /// Output level, present only for output pads
    pub output_value: Option<u8>,
    /// Reset domain
    pub reset_domain: ResetDomain,
    /// Termination
    pub termination: Termination,
    /// Interrupt routing
    pub interrupt_route: InterruptRoute,
    /// RX event configuration
    pub trigger: Trigger,
    /// RX inversion
    pub rx_invert: bool,
    /// Raw DW0
    pub dw0: u32,
    /// Raw DW1
    pub dw1: u32,
}

impl PadRecord {
    /// Direction, only when the pad is in GPIO mode.
    pub fn gpio_direction(&self) -> Option<Direction> {
        if self.mode == PadMode::Gpio {
            Some(self.direction)
        } else {
            None
        }
    }

    /// Whether any interrupt route is enabled.
    pub fn has_interrupt(&self) -> bool {
        self.interrupt_route != InterruptRoute::None
    }
}

/// One entry of a candidate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Position within the table, counted in strides from the table start
    pub index: usize,
    /// Absolute byte offset in the scanned buffer
    pub offset: usize,
    /// Raw register words
    pub raw: RawRegisterPair,
}

/// A run of plausible pad entries found by the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTable {
    /// Discovery order within one scan pass
    pub id: usize,
    /// Byte offset of the first entry
    pub offset: usize,
    /// Entry size in bytes (8, 12, 16 or 20)
    pub stride: usize,
    /// Entries in table order
    pub entries: Vec<TableEntry>,
    /// Number of entries
    pub entry_count: usize,
    /// Detection confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Found by the signature scan
    pub is_signature_match: bool,
    /// Classified as a virtual GPIO table
    pub is_vgpio: bool,
}

/// Size bucket of a virtual GPIO table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VgpioBucket {
    /// USB virtual pads (`VGPIO_USB_n`)
    Usb,
    /// Standard virtual pads (`VGPIO_n`)
    Standard,
    /// PCIe virtual pads (`VGPIO_PCIE_n`)
    Pcie,
}

impl VgpioBucket {
    /// All buckets in canonical output order.
    pub const ALL: [VgpioBucket; 3] = [Self::Usb, Self::Standard, Self::Pcie];

    /// Group name used for this bucket.
    pub fn group_name(self) -> &'static str {
        match self {
            Self::Usb => "VGPIO_USB",
            Self::Standard => "VGPIO",
            Self::Pcie => "VGPIO_PCIE",
        }
    }

    /// Render a pad name within this bucket.
    pub fn pad_name(self, index: usize) -> String {
        format!("{}_{}", self.group_name(), index)
    }
}

impl fmt::Display for VgpioBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group_name())
    }
}

/// Whether a pad is a physical pin or a virtual pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadKind {
    /// Physical pin from the community/group layout
    Physical,
    /// Virtual pad from one of the VGPIO buckets
    Virtual(VgpioBucket),
}

/// Semantic pad name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PadName {
    /// Group name (`GPP_B`, `VGPIO_USB`, ...)
    pub group: String,
    /// Index within the group
    pub local_index: usize,
    /// Physical or virtual
    pub kind: PadKind,
    /// Rendered name (`GPP_B3`, `VGPIO_USB_0`, ...)
    pub name: String,
}

impl PadName {
    /// Name of a physical pad.
    pub fn physical(group: &str, local_index: usize) -> Self {
        Self {
            group: group.to_string(),
            local_index,
            kind: PadKind::Physical,
            name: format!("{}{}", group, local_index),
        }
    }

    /// Name of a virtual pad.
    pub fn virtual_pad(bucket: VgpioBucket, local_index: usize) -> Self {
        Self {
            group: bucket.group_name().to_string(),
            local_index,
            kind: PadKind::Virtual(bucket),
            name: bucket.pad_name(local_index),
        }
    }

    /// Whether this is a virtual pad.
    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, PadKind::Virtual(_))
    }
}

impl fmt::Display for PadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A hint value used in place of the synthetic default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HintSource {
    /// Address reported by the static-analysis collaborator
    pub address: u64,
    /// Register value used as DW0
    pub value: u32,
    /// Confidence reported with the hint, if any
    pub confidence: Option<f64>,
}

/// Where a composed pad record came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// Copied from a discovered table
    Table {
        /// Id of the source table
        table_id: usize,
        /// Offset of the source table
        table_offset: usize,
        /// Offset of the entry itself
        entry_offset: usize,
    },
    /// Inserted by gap synthesis
    Synthesized {
        /// Hint used instead of the default register value
        hint: Option<HintSource>,
    },
}

impl Provenance {
    /// Whether the record was synthesized rather than read from a table.
    pub fn is_synthesized(&self) -> bool {
        matches!(self, Self::Synthesized { .. })
    }

    /// Source table id, if the record came from a table.
    pub fn table_id(&self) -> Option<usize> {
        match self {
            Self::Table { table_id, .. } => Some(*table_id),
            Self::Synthesized { .. } => None,
        }
    }
}

/// A named, decoded pad with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedPad {
    /// Pad name
    pub name: PadName,
    /// Decoded configuration
    pub record: PadRecord,
    /// Where the record came from
    pub provenance: Provenance,
}

/// Final pad state keyed by rendered pad name.
///
/// Each name maps to at most one record; later writes replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposedState {
    pads: BTreeMap<String, ComposedPad>,
}

impl ComposedState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a pad, returning the previous record for that name.
    pub fn insert(&mut self, pad: ComposedPad) -> Option<ComposedPad> {
        self.pads.insert(pad.name.name.clone(), pad)
    }

    /// Look up a pad by rendered name.
    pub fn get(&self, name: &str) -> Option<&ComposedPad> {
        self.pads.get(name)
    }

    /// Whether a pad is present.
    pub fn contains(&self, name: &str) -> bool {
        self.pads.contains_key(name)
    }

    /// Number of pads.
    pub fn len(&self) -> usize {
        self.pads.len()
    }

    /// Whether the state is empty.
    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }

    /// Iterate pads in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ComposedPad> {
        self.pads.values()
    }

    /// Number of synthesized pads.
    pub fn synthesized_count(&self) -> usize {
        self.pads
            .values()
            .filter(|p| p.provenance.is_synthesized())
            .count()
    }
}

/// Requested composition strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    /// Oracle when one is available, blind otherwise
    #[default]
    Auto,
    /// Reference-guided correction
    Oracle,
    /// Heuristic layering without ground truth
    Blind,
}

impl fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Oracle => write!(f, "oracle"),
            Self::Blind => write!(f, "blind"),
        }
    }
}

/// Options for the table scanner.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Minimum entries for a generic-scan run to become a table
    pub min_entries: usize,
    /// Strides tried by the signature scan
    pub signature_strides: Vec<usize>,
    /// Strides tried by the generic scan
    pub generic_strides: Vec<usize>,
    /// Drop generic runs that are neither virtual nor larger than this
    pub physical_noise_floor: Option<usize>,
    /// Always run the generic scan, even when signature tables cover both classes
    pub force_generic: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            min_entries: 10,
            signature_strides: vec![8, 12, 16],
            generic_strides: vec![8, 12, 16, 20],
            physical_noise_floor: None,
            force_generic: false,
        }
    }

    /// Options that discard small physical-looking fragments.
    pub fn strict() -> Self {
        Self {
            physical_noise_floor: Some(100),
            ..Self::new()
        }
    }

    /// Options for exhaustive scanning.
    pub fn thorough() -> Self {
        Self {
            min_entries: 8,
            force_generic: true,
            ..Self::new()
        }
    }

    /// Check the options for values the scanner cannot honour.
    pub fn validate(&self) -> crate::Result<()> {
        if self.min_entries == 0 {
            return Err(crate::RecoveryError::ConfigError {
                message: "min_entries must be at least 1".to_string(),
            });
        }
        let strides = self.signature_strides.iter().chain(&self.generic_strides);
        for &stride in strides {
            if stride < 8 || stride % 4 != 0 {
                return Err(crate::RecoveryError::ConfigError {
                    message: format!("stride {} is not a multiple of 4 of at least 8", stride),
                });
            }
        }
        Ok(())
    }
}
