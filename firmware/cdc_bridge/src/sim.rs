//! Simulated USB full-speed peripheral for tests.
//!
//! Models the double buffer flow control of the hardware: a receive endpoint accepts
//! a packet into buffer `DTOG_RX` unless software owns that buffer, a transmit
//! endpoint sends buffer `DTOG_TX` unless software owns it. The software toggle of a
//! receive endpoint is its `DTOG_TX` bit and vice versa. Software writes go through
//! the same register values the firmware writes.
use std::vec::Vec;
use usb_device::UsbDirection;

use crate::btable::{Slot, MAX_ENDPOINTS};
use crate::epr::{self, CTR_RX, CTR_TX, DTOG_RX, DTOG_TX};
use crate::peripheral::UsbPeripheral;

pub struct SimUsb {
    pma: [u8; 1024],
    regs: [u32; MAX_ENDPOINTS],
}

impl SimUsb {
    pub fn new() -> SimUsb {
        SimUsb {
            pma: [0; 1024],
            regs: [0; MAX_ENDPOINTS],
        }
    }

    /// Host sends an OUT packet. Returns false when the device NAKs.
    pub fn host_out(&mut self, ep: usize, data: &[u8]) -> bool {
        let reg = self.regs[ep];
        if (reg & DTOG_RX != 0) == (reg & DTOG_TX != 0) {
            return false;
        }
        let slot = Slot::from_bit(reg & DTOG_RX != 0);
        let desc = self.descriptor(ep, slot);
        let addr = desc.addr as usize;
        self.pma[addr..addr + data.len()].copy_from_slice(data);
        self.set_descriptor(ep, slot, desc.with_len(data.len()));
        self.regs[ep] = (reg ^ DTOG_RX) | CTR_RX;
        true
    }

    /// Host polls an IN endpoint. Returns `None` when the device NAKs.
    pub fn host_in(&mut self, ep: usize) -> Option<Vec<u8>> {
        let reg = self.regs[ep];
        if (reg & DTOG_TX != 0) == (reg & DTOG_RX != 0) {
            return None;
        }
        let desc = self.descriptor(ep, Slot::from_bit(reg & DTOG_TX != 0));
        let addr = desc.addr as usize;
        let packet = self.pma[addr..addr + desc.len()].to_vec();
        self.regs[ep] = (reg ^ DTOG_TX) | CTR_TX;
        Some(packet)
    }
}

impl UsbPeripheral for SimUsb {
    const PMA_SIZE: u16 = 1024;

    fn rx_complete(&self, ep: usize) -> bool {
        self.regs[ep] & CTR_RX != 0
    }

    fn tx_complete(&self, ep: usize) -> bool {
        self.regs[ep] & CTR_TX != 0
    }

    fn software_slot(&self, ep: usize, dir: UsbDirection) -> Slot {
        epr::software_slot(self.regs[ep], dir)
    }

    fn swap_buffer(&mut self, ep: usize, dir: UsbDirection) {
        let reg = self.regs[ep];
        self.regs[ep] = epr::written(reg, epr::swap_value(reg, dir));
    }

    fn enable_double_buffer(&mut self, ep: usize, dir: UsbDirection) {
        let reg = self.regs[ep] | ep as u32;
        self.regs[ep] = epr::written(reg, epr::baseline_value(reg, dir));
    }

    fn read_pma(&self, offset: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.pma[offset..offset + buf.len()]);
    }

    fn write_pma(&mut self, offset: usize, data: &[u8]) {
        self.pma[offset..offset + data.len()].copy_from_slice(data);
    }
}
