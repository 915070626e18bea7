//! Double buffered USB CDC-ACM transport and the UART bridge built on top of it.
//!
//! Everything in this crate is independent of the actual chip; the firmware crate
//! implements [`peripheral::UsbPeripheral`], [`uart_tx::TxDma`] and
//! [`bridge::UartControl`] for the STM32 USB full-speed peripheral, DMA and USART.
#![no_std]
#![deny(warnings)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod bridge;
pub mod btable;
pub mod cdc;
pub mod dbuf;
pub mod epr;
pub mod hid_keypad;
pub mod peripheral;
pub mod serial;
pub mod uart_rx;
pub mod uart_tx;

#[cfg(test)]
mod sim;

/// Maximum packet size of a full-speed bulk endpoint.
pub const PACKET_SIZE: usize = 64;
