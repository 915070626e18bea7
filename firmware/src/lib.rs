#![no_std]
#![deny(warnings)]

pub mod app;
pub mod board;
pub mod cdc_class;
pub mod config;
pub mod direct_drive;
pub mod dma;
pub mod hid;
pub mod reset;
pub mod uart;
pub mod usbfs;
