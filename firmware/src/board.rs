use embedded_hal::digital::v2::OutputPin;
use stm32f0xx_hal::gpio::gpioa::{PA0, PA1};
use stm32f0xx_hal::gpio::gpiob::{PB6, PB7};
use stm32f0xx_hal::gpio::{Alternate, OpenDrain, Output, AF0};
use stm32f0xx_hal::pac::{Peripherals, CRS, DMA1, FLASH, IWDG, RCC, SYSCFG, USART1};
use stm32f0xx_hal::prelude::*;
use stm32f0xx_hal::rcc::Rcc;
use stm32f0xx_hal::usb::{self, Peripheral, UsbBus};
use usb_device::bus::UsbBusAllocator;

use crate::direct_drive::Switches;

pub type UsbBusType = stm32f0xx_hal::usb::UsbBusType;
/// Companion chip reset, active low.
pub type ResetPin = PA0<Output<OpenDrain>>;
/// Companion chip boot mode select, active low.
pub type BootPin = PA1<Output<OpenDrain>>;
pub type UartPins = (PB6<Alternate<AF0>>, PB7<Alternate<AF0>>);

pub struct SerialBoard {
    pub usb_bus: UsbBusAllocator<UsbBus<Peripheral>>,
    pub usart: USART1,
    pub uart_pins: UartPins,
    pub dma: DMA1,
    pub reset: ResetPin,
    pub boot: BootPin,
    pub iwdg: IWDG,
}

pub struct KeypadBoard {
    pub usb_bus: UsbBusAllocator<UsbBus<Peripheral>>,
    pub switches: Switches,
    pub iwdg: IWDG,
}

// The 20 pin package shares PA11/PA12 with PA9/PA10 and must be remapped to reach
// the USB pins.
fn clocks(mut rcc: RCC, crs: CRS, mut syscfg: SYSCFG, mut flash: FLASH) -> Rcc {
    usb::remap_pins(&mut rcc, &mut syscfg);
    rcc.configure()
        .hsi48()
        .enable_crs(crs)
        .sysclk(48.mhz())
        .pclk(48.mhz())
        .freeze(&mut flash)
}

pub fn split_serial(device: Peripherals) -> SerialBoard {
    // clocks of peripherals the HAL has no driver for
    device.RCC.ahbenr.modify(|_, w| w.dmaen().set_bit());
    device.RCC.apb2enr.modify(|_, w| w.usart1en().set_bit());

    let mut rcc = clocks(device.RCC, device.CRS, device.SYSCFG, device.FLASH);
    let gpioa = device.GPIOA.split(&mut rcc);
    let gpiob = device.GPIOB.split(&mut rcc);
    let (usb, usart, dma, iwdg) = (device.USB, device.USART1, device.DMA1, device.IWDG);

    cortex_m::interrupt::free(move |_| {
        // SAFETY: inside a critical section; the HAL wants the bare-metal 1.0 token
        let cs = unsafe { &bare_metal::CriticalSection::new() };

        let uart_pins = (gpiob.pb6.into_alternate_af0(cs), gpiob.pb7.into_alternate_af0(cs));

        // Released: both lines float high through the companion's pull-ups.
        let mut reset = gpioa.pa0.into_open_drain_output(cs);
        let mut boot = gpioa.pa1.into_open_drain_output(cs);
        reset.set_high().ok();
        boot.set_high().ok();

        let usb = Peripheral {
            usb,
            pin_dm: gpioa.pa11,
            pin_dp: gpioa.pa12,
        };

        SerialBoard {
            usb_bus: UsbBus::new(usb),
            usart,
            uart_pins,
            dma,
            reset,
            boot,
            iwdg,
        }
    })
}

pub fn split_keypad(device: Peripherals) -> KeypadBoard {
    let mut rcc = clocks(device.RCC, device.CRS, device.SYSCFG, device.FLASH);
    let gpioa = device.GPIOA.split(&mut rcc);
    let gpiob = device.GPIOB.split(&mut rcc);
    let (usb, iwdg) = (device.USB, device.IWDG);

    cortex_m::interrupt::free(move |_| {
        // SAFETY: see split_serial
        let cs = unsafe { &bare_metal::CriticalSection::new() };

        let switches = Switches::new(
            gpioa.pa7.into_pull_up_input(cs),
            gpioa.pa6.into_pull_up_input(cs),
            gpioa.pa5.into_pull_up_input(cs),
            gpioa.pa4.into_pull_up_input(cs),
            gpioa.pa3.into_pull_up_input(cs),
            gpioa.pa2.into_pull_up_input(cs),
            gpioa.pa1.into_pull_up_input(cs),
            gpioa.pa0.into_pull_up_input(cs),
            gpiob.pb7.into_pull_up_input(cs),
            gpiob.pb6.into_pull_up_input(cs),
        );

        let usb = Peripheral {
            usb,
            pin_dm: gpioa.pa11,
            pin_dp: gpioa.pa12,
        };

        KeypadBoard {
            usb_bus: UsbBus::new(usb),
            switches,
            iwdg,
        }
    })
}
