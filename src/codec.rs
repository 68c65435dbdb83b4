//! Pad register bitfield codec.
//!
//! Decodes one table entry (a DW0/DW1 pair, optionally followed by DW2/DW3)
//! into a [`PadRecord`] and provides the cheap plausibility filter the
//! scanner uses to tell register tables from noise.

use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

use crate::error::{RecoveryError, Result};
use crate::types::{
    Direction, InterruptRoute, PadMode, PadRecord, RawRegisterPair, ResetDomain, Termination,
    Trigger,
};

/// Smallest window holding DW0 and DW1.
pub const MIN_WINDOW: usize = 8;

/// Window size from which DW2/DW3 are read.
pub const FULL_WINDOW: usize = 16;

/// DW0 field positions.
pub mod dw0 {
    pub const RESET_SHIFT: u32 = 30;
    pub const RESET_MASK: u32 = 0x3 << RESET_SHIFT;
    pub const RX_PAD_STATE_SELECT: u32 = 1 << 29;
    pub const RX_RAW_OVERRIDE: u32 = 1 << 28;
    /// Alternate-function write enable (NAFVWE)
    pub const ALT_FUNC_WRITE_ENABLE: u32 = 1 << 27;
    pub const RX_EVENT_SHIFT: u32 = 25;
    pub const RX_EVENT_MASK: u32 = 0x3 << RX_EVENT_SHIFT;
    pub const RX_INVERT: u32 = 1 << 23;
    pub const ROUTE_MASK: u32 = 0xF << 17;
    pub const MODE_SHIFT: u32 = 10;
    pub const MODE_MASK: u32 = 0xF << MODE_SHIFT;
    pub const RXTX_DISABLE_SHIFT: u32 = 8;
    pub const RXTX_DISABLE_MASK: u32 = 0x3 << RXTX_DISABLE_SHIFT;
    pub const RX_STATE: u32 = 1 << 1;
    pub const TX_STATE: u32 = 1 << 0;
}

/// DW1 field positions.
pub mod dw1 {
    pub const TERM_SHIFT: u32 = 10;
    pub const TERM_MASK: u32 = 0xF << TERM_SHIFT;
    pub const INT_SELECT_MASK: u32 = 0xFF;
}

/// RX/TX disable field value meaning "RX disabled, TX enabled".
const RXTX_OUTPUT: u32 = 0b10;

bitflags! {
    /// Interrupt routing bits of DW0.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RouteFlags: u32 {
        const NMI = 1 << 17;
        const SMI = 1 << 18;
        const SCI = 1 << 19;
        const IOAPIC = 1 << 20;
    }
}

impl RouteFlags {
    /// Extract the routing bits from a DW0 word.
    pub fn from_dw0(dw0: u32) -> Self {
        Self::from_bits_truncate(dw0 & dw0::ROUTE_MASK)
    }

    /// Primary route, in APIC > SCI > SMI > NMI priority.
    pub fn primary(self) -> InterruptRoute {
        if self.contains(Self::IOAPIC) {
            InterruptRoute::Apic
        } else if self.contains(Self::SCI) {
            InterruptRoute::Sci
        } else if self.contains(Self::SMI) {
            InterruptRoute::Smi
        } else if self.contains(Self::NMI) {
            InterruptRoute::Nmi
        } else {
            InterruptRoute::None
        }
    }
}

/// Decode a byte window into raw register words.
///
/// Reads DW0/DW1 little-endian, plus DW2/DW3 when the window is at least
/// 16 bytes.
pub fn decode(window: &[u8]) -> Result<RawRegisterPair> {
    if window.len() < MIN_WINDOW {
        return Err(RecoveryError::InsufficientData {
            expected: MIN_WINDOW,
            actual: window.len(),
        });
    }

    let mut raw = RawRegisterPair::new(
        LittleEndian::read_u32(&window[0..4]),
        LittleEndian::read_u32(&window[4..8]),
    );
    if window.len() >= FULL_WINDOW {
        raw.dw2 = Some(LittleEndian::read_u32(&window[8..12]));
        raw.dw3 = Some(LittleEndian::read_u32(&window[12..16]));
    }
    Ok(raw)
}

/// Read the entry at `offset` with the given stride, if it fits in `data`.
pub fn read_entry(data: &[u8], offset: usize, stride: usize) -> Option<RawRegisterPair> {
    let end = offset.checked_add(stride)?;
    if end > data.len() {
        return None;
    }
    decode(&data[offset..end]).ok()
}

/// Mode nibble of DW0, unchecked.
pub fn mode_nibble(dw0: u32) -> u8 {
    ((dw0 & dw0::MODE_MASK) >> dw0::MODE_SHIFT) as u8
}

/// Reset domain of DW0.
pub fn reset_domain(dw0: u32) -> ResetDomain {
    ResetDomain::from_bits(((dw0 & dw0::RESET_MASK) >> dw0::RESET_SHIFT) as u8)
}

/// Whether the alternate-function write enable bit is set.
pub fn has_alt_function_write(dw0: u32) -> bool {
    dw0 & dw0::ALT_FUNC_WRITE_ENABLE != 0
}

/// Cheap "looks like real hardware state" filter.
///
/// Rejects an all-zero pair, an all-ones word and a mode nibble above 7.
/// Anything else passes; later stages prune further.
pub fn validate(raw: &RawRegisterPair) -> bool {
    if raw.dw0 == 0 && raw.dw1 == 0 {
        return false;
    }
    if raw.dw0 == u32::MAX || raw.dw1 == u32::MAX {
        return false;
    }
    mode_nibble(raw.dw0) <= 7
}

/// Decode the logical pad configuration.
pub fn to_logical(raw: &RawRegisterPair) -> Result<PadRecord> {
    let nibble = mode_nibble(raw.dw0);
    let mode = PadMode::from_code(nibble).ok_or(RecoveryError::InvalidMode { mode: nibble })?;

    let rxtx = (raw.dw0 & dw0::RXTX_DISABLE_MASK) >> dw0::RXTX_DISABLE_SHIFT;
    let direction = if rxtx == RXTX_OUTPUT {
        Direction::Output
    } else {
        Direction::Input
    };
    let output_value = match direction {
        Direction::Output => Some((raw.dw0 & dw0::TX_STATE) as u8),
        Direction::Input => None,
    };

    Ok(PadRecord {
        mode,
        direction,
        output_value,
        reset_domain: reset_domain(raw.dw0),
        termination: Termination::from_code(((raw.dw1 & dw1::TERM_MASK) >> dw1::TERM_SHIFT) as u8),
        interrupt_route: RouteFlags::from_dw0(raw.dw0).primary(),
        trigger: Trigger::from_bits(((raw.dw0 & dw0::RX_EVENT_MASK) >> dw0::RX_EVENT_SHIFT) as u8),
        rx_invert: raw.dw0 & dw0::RX_INVERT != 0,
        dw0: raw.dw0,
        dw1: raw.dw1,
    })
}

/// Decode an entry only if it passes [`validate`].
pub fn decode_valid(raw: &RawRegisterPair) -> Option<PadRecord> {
    if validate(raw) {
        to_logical(raw).ok()
    } else {
        None
    }
}

/// Place mode, reset and termination at their register positions.
///
/// All other bits are left clear.
pub fn encode_fields(mode: PadMode, reset: ResetDomain, termination: Termination) -> (u32, u32) {
    let dw0 = (u32::from(reset.bits()) << dw0::RESET_SHIFT)
        | (u32::from(mode.code()) << dw0::MODE_SHIFT);
    let dw1 = u32::from(termination.code()) << dw1::TERM_SHIFT;
    (dw0, dw1)
}
