//! DMA1 channels serving USART1.
//!
//! RX runs circular over the receive ring forever. TX is restarted for every chunk
//! from the transfer complete interrupt.
use cdc_bridge::uart_tx::TxDma;
use stm32f0xx_hal::pac::{dma1, DMA1, USART1};

/// USART1 channels without remapping: 2 transmits, 3 receives.
pub struct Channels {
    pub rx: RxChannel,
    pub tx: TxChannel,
}

pub struct RxChannel {
    _0: (),
}

pub struct TxChannel {
    _0: (),
}

impl Channels {
    pub fn new(_dma: DMA1) -> Channels {
        Channels {
            rx: RxChannel { _0: () },
            tx: TxChannel { _0: () },
        }
    }
}

// Each channel only touches its own registers and flags.
fn regs() -> &'static dma1::RegisterBlock {
    unsafe { &*DMA1::ptr() }
}

pub struct UartRxDma {
    _channel: RxChannel,
}

impl UartRxDma {
    /// Starts filling `len` bytes at `target` in circles.
    ///
    /// # Safety
    ///
    /// `target` must stay valid for `len` bytes forever and only be read by the
    /// caller.
    pub unsafe fn start(channel: RxChannel, target: *mut u8, len: usize) -> UartRxDma {
        let ch = &regs().ch3;
        let rdr = &(*USART1::ptr()).rdr as *const _ as u32;
        ch.cr.reset();
        ch.par.write(|w| w.bits(rdr));
        ch.mar.write(|w| w.bits(target as u32));
        ch.ndtr.write(|w| w.bits(len as u32));
        ch.cr
            .write(|w| w.minc().set_bit().circ().set_bit().en().set_bit());
        UartRxDma { _channel: channel }
    }

    /// Bytes left until the transfer wraps.
    pub fn remaining(&self) -> usize {
        regs().ch3.ndtr.read().ndt().bits() as usize
    }
}

pub struct UartTxDma {
    _channel: TxChannel,
    /// Address of the transmit ring.
    base: u32,
}

impl UartTxDma {
    /// # Safety
    ///
    /// `base` must point at the transmit ring storage for the rest of the program.
    pub unsafe fn new(channel: TxChannel, base: *const u8) -> UartTxDma {
        let ch = &regs().ch2;
        let tdr = &(*USART1::ptr()).tdr as *const _ as u32;
        ch.cr.reset();
        ch.par.write(|w| w.bits(tdr));
        UartTxDma {
            _channel: channel,
            base: base as u32,
        }
    }

    /// Acknowledges the transfer complete interrupt.
    pub fn clear_complete(&self) {
        regs().ifcr.write(|w| w.cgif2().set_bit());
    }
}

impl TxDma for UartTxDma {
    fn start(&mut self, offset: usize, len: usize) {
        let ch = &regs().ch2;
        let mar = self.base + offset as u32;
        ch.cr.write(|w| w.en().clear_bit());
        ch.mar.write(|w| unsafe { w.bits(mar) });
        ch.ndtr.write(|w| unsafe { w.bits(len as u32) });
        ch.cr.write(|w| {
            w.minc()
                .set_bit()
                .dir()
                .set_bit()
                .tcie()
                .set_bit()
                .en()
                .set_bit()
        });
    }
}
