//! Endpoint register (EPnR) values of the STM32 USB full-speed peripheral.
//!
//! The toggle and status fields flip where a 1 is written, the completion flags
//! clear where a 0 is written. Every write is therefore computed from the current
//! register value.
use usb_device::UsbDirection;

use crate::btable::Slot;

pub const CTR_RX: u32 = 1 << 15;
pub const DTOG_RX: u32 = 1 << 14;
pub const STAT_RX: u32 = 0b11 << 12;
pub const EP_TYPE: u32 = 0b11 << 9;
pub const EP_KIND: u32 = 1 << 8;
pub const CTR_TX: u32 = 1 << 7;
pub const DTOG_TX: u32 = 1 << 6;
pub const STAT_TX: u32 = 0b11 << 4;
pub const EA: u32 = 0xf;

pub const STAT_RX_VALID: u32 = 0b11 << 12;
pub const STAT_RX_DISABLED: u32 = 0;
pub const STAT_TX_VALID: u32 = 0b11 << 4;
pub const STAT_TX_DISABLED: u32 = 0;

/// Written back unchanged.
const KEEP: u32 = EP_TYPE | EP_KIND | EA;
/// Flipped by writing 1.
const TOGGLE: u32 = DTOG_RX | DTOG_TX | STAT_RX | STAT_TX;

/// Buffer owned by software. The hardware fills or sends the buffer named by the
/// toggle of its own direction, so software owns the one named by the other toggle.
pub fn software_slot(reg: u32, dir: UsbDirection) -> Slot {
    match dir {
        UsbDirection::Out => Slot::from_bit(reg & DTOG_TX != 0),
        UsbDirection::In => Slot::from_bit(reg & DTOG_RX != 0),
    }
}

/// Flips the software buffer toggle of `dir` and clears its completion flag. The
/// completion flag of the other direction is kept.
pub fn swap_value(reg: u32, dir: UsbDirection) -> u32 {
    match dir {
        UsbDirection::Out => (reg & KEEP) | CTR_TX | DTOG_TX,
        UsbDirection::In => (reg & KEEP) | CTR_RX | DTOG_RX,
    }
}

/// Sets the double buffer kind and brings toggles and status to the start state
/// of `dir`: receive has `DTOG_TX` set so that software holds buffer B, transmit
/// has both toggles clear. Both completion flags are cleared.
pub fn baseline_value(reg: u32, dir: UsbDirection) -> u32 {
    let target = match dir {
        UsbDirection::Out => DTOG_TX | STAT_RX_VALID | STAT_TX_DISABLED,
        UsbDirection::In => STAT_TX_VALID | STAT_RX_DISABLED,
    };
    let toggles = (reg ^ target) & TOGGLE;
    (reg & (EP_TYPE | EA)) | EP_KIND | toggles
}

/// Register content after the hardware accepted a write of `value`.
#[cfg(test)]
pub(crate) fn written(reg: u32, value: u32) -> u32 {
    let toggled = (reg ^ value) & TOGGLE;
    let completions = reg & value & (CTR_RX | CTR_TX);
    toggled | completions | (value & KEEP)
}
