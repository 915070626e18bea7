use cdc_bridge::cdc::{ControlLines, LineCoding, SerialState};
use cdc_bridge::peripheral::UsbPeripheral;
use cdc_bridge::serial::{block_on, drop_if_reset, SerialHooks};
use embedded_hal::digital::v2::OutputPin;
use rtt_target::rprintln;
use usb_device::bus::UsbBus;
use usb_device::class::UsbClass;
use usb_device::prelude::*;
use usb_device::{Result, UsbError};

use crate::board::{BootPin, ResetPin};
use crate::cdc_class::CdcAcmClass;
use crate::reset::LoopWatchdog;

/// Drives the target's reset and boot strap lines from DTR and RTS.
///
/// DTR alone holds the boot strap, RTS alone holds reset. Any other combination
/// releases both so that terminals asserting both lines leave the target running.
pub struct ResetPins {
    reset: ResetPin,
    boot: BootPin,
}

impl ResetPins {
    pub fn new(reset: ResetPin, boot: BootPin) -> ResetPins {
        ResetPins { reset, boot }
    }
}

impl SerialHooks for ResetPins {
    fn control_lines_changed(&mut self, lines: ControlLines) {
        rprintln!("cdc: dtr={} rts={}", lines.dtr, lines.rts);
        let (reset, boot) = match (lines.dtr, lines.rts) {
            (true, false) => (false, true),
            (false, true) => (true, false),
            _ => (false, false),
        };
        if reset {
            self.reset.set_low().ok();
        } else {
            self.reset.set_high().ok();
        }
        if boot {
            self.boot.set_low().ok();
        } else {
            self.boot.set_high().ok();
        }
    }

    fn line_coding_accepted(&mut self, coding: &LineCoding) {
        rprintln!("cdc: line coding {} baud staged", coding.baud_rate);
    }
}

/// The USB device with its single CDC-ACM function.
pub struct UsbSerial<'a, B: UsbBus, P: UsbPeripheral, H: SerialHooks> {
    pub usb_dev: UsbDevice<'a, B>,
    pub class: CdcAcmClass<'a, B, P, H>,
}

impl<'a, B: UsbBus, P: UsbPeripheral, H: SerialHooks> UsbSerial<'a, B, P, H> {
    pub fn new(usb_dev: UsbDevice<'a, B>, class: CdcAcmClass<'a, B, P, H>) -> Self {
        UsbSerial { usb_dev, class }
    }

    /// Services the bus and follows the device in and out of the configured state.
    pub fn poll(&mut self) -> Result<()> {
        self.usb_dev.poll(&mut [&mut self.class]);

        let configured = self.usb_dev.state() == UsbDeviceState::Configured;
        if configured && !self.class.is_ready() {
            self.class.configure()?;
            rprintln!("usb: configured");
        } else if !configured && self.class.is_ready() {
            self.class.reset();
            rprintln!("usb: deconfigured");
        }
        Ok(())
    }

    /// Sends a SERIAL_STATE notification, polling the bus and feeding `watchdog`
    /// until the endpoint is free.
    pub fn send_state(&mut self, state: SerialState, watchdog: &mut LoopWatchdog) -> Result<()> {
        let packet = self.class.serial().state_notification(state);
        block_on(
            self,
            |s| {
                if !s.class.is_ready() {
                    return Err(UsbError::InvalidState);
                }
                s.class.write_notification(&packet).map(|_| ())
            },
            |s| {
                s.poll().ok();
                watchdog.feed();
            },
        )
    }

    /// Sends the queued serial state, if any, once the session is up. The state is
    /// dropped if the session goes down meanwhile.
    pub fn send_pending_state(&mut self, watchdog: &mut LoopWatchdog) -> Result<()> {
        if !self.class.is_ready() {
            return Ok(());
        }
        match self.class.serial_mut().take_pending_state() {
            Some(state) => drop_if_reset(self.send_state(state, watchdog)),
            None => Ok(()),
        }
    }
}
