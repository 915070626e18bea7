//! Endpoint register and packet memory access of the STM32F0 USB peripheral.
//!
//! The USB stack owns the peripheral; this only touches the endpoint registers of
//! double buffered endpoints and the packet buffers assigned to them.
use core::ptr::{read_volatile, write_volatile};

use cdc_bridge::btable::{Slot, MAX_ENDPOINTS};
use cdc_bridge::epr::{self, CTR_RX, CTR_TX};
use cdc_bridge::peripheral::UsbPeripheral;
use stm32f0xx_hal::pac::{usb, USB};
use usb_device::UsbDirection;

/// Packet memory is not part of the register block.
const PMA_BASE: usize = 0x4000_6000;

/// Runs `$body` with `$reg` bound to the endpoint register of `$ep`.
macro_rules! with_epr {
    ($regs:expr, $ep:expr, |$reg:ident| $body:expr) => {
        match $ep & 7 {
            0 => {
                let $reg = &$regs.ep0r;
                $body
            }
            1 => {
                let $reg = &$regs.ep1r;
                $body
            }
            2 => {
                let $reg = &$regs.ep2r;
                $body
            }
            3 => {
                let $reg = &$regs.ep3r;
                $body
            }
            4 => {
                let $reg = &$regs.ep4r;
                $body
            }
            5 => {
                let $reg = &$regs.ep5r;
                $body
            }
            6 => {
                let $reg = &$regs.ep6r;
                $body
            }
            _ => {
                let $reg = &$regs.ep7r;
                $body
            }
        }
    };
}

pub struct UsbFs {
    /// Transmit completions the USB stack already cleared in hardware.
    tx_latch: [bool; MAX_ENDPOINTS],
}

impl UsbFs {
    /// # Safety
    ///
    /// The USB stack keeps owning the peripheral. Only endpoints handed to the
    /// double buffer engine may be accessed through this.
    pub unsafe fn new() -> UsbFs {
        UsbFs {
            tx_latch: [false; MAX_ENDPOINTS],
        }
    }

    fn regs(&self) -> &usb::RegisterBlock {
        unsafe { &*USB::ptr() }
    }

    fn read_epr(&self, ep: usize) -> u32 {
        with_epr!(self.regs(), ep, |reg| reg.read().bits())
    }

    /// Writes the endpoint register. `value` must hold the toggle bits to flip and
    /// 0 for the completion flags to clear.
    fn write_epr(&mut self, ep: usize, value: u32) {
        with_epr!(self.regs(), ep, |reg| reg.write(|w| unsafe { w.bits(value) }))
    }

    fn pma_halfword(offset: usize) -> *mut u16 {
        (PMA_BASE + (offset & !1)) as *mut u16
    }
}

impl UsbPeripheral for UsbFs {
    const PMA_SIZE: u16 = 1024;

    fn rx_complete(&self, ep: usize) -> bool {
        self.read_epr(ep) & CTR_RX != 0
    }

    fn tx_complete(&self, ep: usize) -> bool {
        self.tx_latch[ep] || self.read_epr(ep) & CTR_TX != 0
    }

    fn latch_tx_complete(&mut self, ep: usize) {
        self.tx_latch[ep] = true;
    }

    fn software_slot(&self, ep: usize, dir: UsbDirection) -> Slot {
        epr::software_slot(self.read_epr(ep), dir)
    }

    fn swap_buffer(&mut self, ep: usize, dir: UsbDirection) {
        if dir == UsbDirection::In {
            self.tx_latch[ep] = false;
        }
        let value = epr::swap_value(self.read_epr(ep), dir);
        self.write_epr(ep, value);
    }

    fn enable_double_buffer(&mut self, ep: usize, dir: UsbDirection) {
        self.tx_latch[ep] = false;
        let value = epr::baseline_value(self.read_epr(ep), dir);
        self.write_epr(ep, value);
    }

    fn read_pma(&self, offset: usize, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            let addr = offset + i;
            let word = unsafe { read_volatile(Self::pma_halfword(addr)) };
            *b = if addr & 1 == 0 { word as u8 } else { (word >> 8) as u8 };
        }
    }

    fn write_pma(&mut self, offset: usize, data: &[u8]) {
        let mut addr = offset;
        let mut data = data;
        if addr & 1 == 1 && !data.is_empty() {
            let p = Self::pma_halfword(addr);
            unsafe {
                let word = read_volatile(p);
                write_volatile(p, (word & 0x00ff) | (data[0] as u16) << 8);
            }
            addr += 1;
            data = &data[1..];
        }
        let mut pairs = data.chunks_exact(2);
        for pair in &mut pairs {
            let word = u16::from_le_bytes([pair[0], pair[1]]);
            unsafe { write_volatile(Self::pma_halfword(addr), word) };
            addr += 2;
        }
        if let [last] = pairs.remainder() {
            let p = Self::pma_halfword(addr);
            unsafe {
                let word = read_volatile(p);
                write_volatile(p, (word & 0xff00) | *last as u16);
            }
        }
    }
}
