//! Moves bytes between the USB serial transport and the UART rings.
use rtic_core::Mutex;
use usb_device::{Result, UsbError};

use crate::cdc::{LineCoding, SerialState};
use crate::dbuf::DoubleBuffer;
use crate::peripheral::UsbPeripheral;
use crate::serial::{SerialHooks, SerialTransport};
use crate::uart_rx::RxRing;
use crate::uart_tx::{TxDma, TxQueue, TxStorage};
use crate::PACKET_SIZE;

pub trait UartControl {
    /// The last frame left the shift register.
    fn is_idle(&self) -> bool;

    fn apply_line_coding(&mut self, coding: &LineCoding);
}

/// Outcome of one UART to USB pass.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RxForward {
    pub received: usize,
    pub forwarded: usize,
    /// Unforwarded bytes were dropped and the host was told about the overrun.
    pub overflowed: bool,
}

pub struct UartBridge<'a> {
    rx: &'a mut RxRing,
    tx: &'a mut TxStorage,
}

impl<'a> UartBridge<'a> {
    pub fn new(rx: &'a mut RxRing, tx: &'a mut TxStorage) -> UartBridge<'a> {
        UartBridge { rx, tx }
    }

    pub fn rx(&self) -> &RxRing {
        &self.rx
    }

    /// Pulls at most one packet from USB into the transmit queue.
    ///
    /// While a line coding is staged nothing is pulled; it is applied once the
    /// queue has drained and the UART went idle. Returns the bytes queued.
    pub fn forward_usb_to_uart<P, H, D, Q, U>(
        &mut self,
        engine: &mut DoubleBuffer<P>,
        serial: &mut SerialTransport<H>,
        queue: &mut Q,
        uart: &mut U,
    ) -> Result<usize>
    where
        P: UsbPeripheral,
        H: SerialHooks,
        D: TxDma,
        Q: Mutex<T = TxQueue<D>>,
        U: UartControl,
    {
        if serial.staged_line_coding().is_some() {
            let drained = queue.lock(|queue| queue.is_empty());
            if !drained || !uart.is_idle() {
                return Ok(0);
            }
            if let Some(coding) = serial.take_line_coding() {
                uart.apply_line_coding(&coding);
            }
        }

        let (tail, free) = queue.lock(|queue| (queue.tail(), queue.free()));
        if free < PACKET_SIZE {
            return Ok(0);
        }
        let n = match serial.read(engine, self.tx.window(tail)) {
            Ok(n) => n,
            Err(UsbError::WouldBlock) => return Ok(0),
            Err(e) => return Err(e),
        };
        self.tx.fold(tail, n);
        queue.lock(|queue| queue.commit(n));
        Ok(n)
    }

    /// Folds receive DMA progress into the ring and sends at most one packet of it
    /// to the host. `remaining` is the receive channel's transfer counter.
    pub fn forward_uart_to_usb<P, H>(
        &mut self,
        engine: &mut DoubleBuffer<P>,
        serial: &mut SerialTransport<H>,
        remaining: usize,
    ) -> Result<RxForward>
    where
        P: UsbPeripheral,
        H: SerialHooks,
    {
        let update = self.rx.update(remaining);
        if update.overflowed {
            serial.queue_state(SerialState::DEFAULT | SerialState::OVERRUN);
        }
        let mut forward = RxForward {
            received: update.received,
            forwarded: 0,
            overflowed: update.overflowed,
        };
        if !serial.is_ready() {
            return Ok(forward);
        }

        if !self.rx.is_empty() {
            match serial.write(engine, self.rx.pending()) {
                Ok(n) => {
                    self.rx.consume(n);
                    forward.forwarded = n;
                }
                Err(UsbError::WouldBlock) => (),
                Err(e) => return Err(e),
            }
        }
        if self.rx.is_empty() {
            match serial.flush(engine) {
                Ok(()) | Err(UsbError::WouldBlock) => (),
                Err(e) => return Err(e),
            }
        }
        Ok(forward)
    }
}
