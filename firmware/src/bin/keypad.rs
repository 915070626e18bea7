#![no_std]
#![no_main]
#![deny(warnings)]

#[cfg(not(feature = "semihosting"))]
use panic_rtt_target as _;
#[cfg(feature = "semihosting")]
extern crate panic_semihosting;

#[cfg(feature = "semihosting")]
use cortex_m_semihosting::hprintln;

use cdc_bridge::hid_keypad::{key_alpha, Debouncer, KeyEvent, KeyUsage};
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use rtt_target::{rprintln, rtt_init_print};
use usb_device::bus::UsbBusAllocator;
use usb_device::prelude::*;

use firmware::board::{self, UsbBusType};
use firmware::config::*;
use firmware::direct_drive::{Switches, N_SWITCHES};
use firmware::hid::HidKeypadClass;
use firmware::reset::{reset_system, LoopWatchdog};

static KEYMAP: [KeyUsage; N_SWITCHES] = [
    key_alpha(0),
    key_alpha(1),
    key_alpha(2),
    key_alpha(3),
    key_alpha(4),
    key_alpha(5),
    key_alpha(6),
    key_alpha(7),
    key_alpha(8),
    key_alpha(9),
];

#[rtic::app(device = stm32f0xx_hal::pac, peripherals = true)]
const APP: () = {
    struct Resources {
        usb_dev: UsbDevice<'static, UsbBusType>,
        hid: HidKeypadClass<'static, UsbBusType>,
        switches: Switches,
        debouncer: Debouncer<N_SWITCHES>,
        syst: SYST,
        watchdog: LoopWatchdog,
    }

    #[init]
    fn init(cx: init::Context) -> init::LateResources {
        static mut USB_BUS: Option<UsbBusAllocator<UsbBusType>> = None;
        static mut REPORT_DESCRIPTOR: [u8; 128] = [0; 128];

        rtt_init_print!();
        rprintln!("usb-hid-keypad");
        #[cfg(feature = "semihosting")]
        hprintln!("usb-hid-keypad");

        // millisecond tick, polled through the wrap flag
        let mut syst = cx.core.SYST;
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(SYSCLK_HZ / SYSTICK_HZ - 1);
        syst.clear_current();
        syst.enable_counter();

        let board = board::split_keypad(cx.device);
        let usb_bus: &'static UsbBusAllocator<UsbBusType> = USB_BUS.insert(board.usb_bus);

        let hid = HidKeypadClass::new(usb_bus, &KEYMAP, REPORT_DESCRIPTOR).unwrap();

        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(USB_VID, USB_PID))
            .manufacturer(MANUFACTURER)
            .product(KEYPAD_PRODUCT)
            .serial_number(SERIAL_NUMBER)
            .device_class(0)
            .build();

        let watchdog = LoopWatchdog::start(board.iwdg);

        init::LateResources {
            usb_dev,
            hid,
            switches: board.switches,
            debouncer: Debouncer::new(DEBOUNCE_MS),
            syst,
            watchdog,
        }
    }

    #[idle(resources = [usb_dev, hid, switches, debouncer, syst, watchdog])]
    fn idle(cx: idle::Context) -> ! {
        let usb_dev = cx.resources.usb_dev;
        let hid = cx.resources.hid;
        let debouncer = cx.resources.debouncer;

        loop {
            usb_dev.poll(&mut [&mut *hid]);

            if cx.resources.syst.has_wrapped() {
                debouncer.tick();
            }
            for (index, &pressed) in cx.resources.switches.scan().iter().enumerate() {
                match debouncer.update(index, pressed) {
                    Some(KeyEvent::Down(key)) => hid.key_down(KEYMAP[key]),
                    Some(KeyEvent::Up(key)) => hid.key_up(KEYMAP[key]),
                    None => (),
                }
            }

            if usb_dev.state() == UsbDeviceState::Configured {
                match hid.send() {
                    Ok(()) | Err(UsbError::WouldBlock) => (),
                    Err(e) => {
                        rprintln!("hid: {:?}, resetting", e);
                        #[cfg(feature = "semihosting")]
                        hprintln!("hid: {:?}, resetting", e);
                        reset_system();
                    }
                }
            }

            cx.resources.watchdog.feed();
        }
    }
};
