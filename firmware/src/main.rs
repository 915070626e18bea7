#![no_std]
#![no_main]
#![deny(warnings)]

#[cfg(not(feature = "semihosting"))]
use panic_rtt_target as _;
#[cfg(feature = "semihosting")]
extern crate panic_semihosting;

#[cfg(feature = "semihosting")]
use cortex_m_semihosting::hprintln;

use cdc_bridge::bridge::UartBridge;
use cdc_bridge::cdc::{LineCoding, USB_CLASS_CDC};
use cdc_bridge::uart_rx::{RxRing, RX_CAPACITY};
use cdc_bridge::uart_tx::{TxQueue, TxStorage};
use rtic::Mutex;
use rtt_target::{rprintln, rtt_init_print};
use usb_device::bus::UsbBusAllocator;
use usb_device::prelude::*;

use firmware::app::{ResetPins, UsbSerial};
use firmware::board::{self, UsbBusType};
use firmware::cdc_class::CdcAcmClass;
use firmware::config::*;
use firmware::dma::{Channels, UartRxDma, UartTxDma};
use firmware::reset::{reset_system, LoopWatchdog};
use firmware::uart::Uart;
use firmware::usbfs::UsbFs;

type SerialUsb = UsbSerial<'static, UsbBusType, UsbFs, ResetPins>;

#[rtic::app(device = stm32f0xx_hal::pac, peripherals = true)]
const APP: () = {
    struct Resources {
        usb: SerialUsb,
        bridge: UartBridge<'static>,
        uart: Uart,
        rx_dma: UartRxDma,
        tx_queue: TxQueue<UartTxDma>,
        watchdog: LoopWatchdog,
    }

    #[init]
    fn init(cx: init::Context) -> init::LateResources {
        static mut USB_BUS: Option<UsbBusAllocator<UsbBusType>> = None;
        static mut RX_RING: RxRing = RxRing::new();
        static mut TX_STORAGE: TxStorage = TxStorage::new();

        rtt_init_print!();
        rprintln!("usb-serial-bridge");
        #[cfg(feature = "semihosting")]
        hprintln!("usb-serial-bridge");

        let board = board::split_serial(cx.device);
        let usb_bus: &'static UsbBusAllocator<UsbBusType> = USB_BUS.insert(board.usb_bus);

        let line_coding = LineCoding::new(DEFAULT_BAUDRATE);
        let uart = Uart::new(board.usart, board.uart_pins, &line_coding);

        let dma = Channels::new(board.dma);
        // SAFETY: both rings are statics only reachable through the bridge from here on
        let rx_dma = unsafe { UartRxDma::start(dma.rx, RX_RING.dma_target(), RX_CAPACITY) };
        let tx_dma = unsafe { UartTxDma::new(dma.tx, TX_STORAGE.as_ptr()) };
        let bridge = UartBridge::new(RX_RING, TX_STORAGE);

        let class = CdcAcmClass::new(
            usb_bus,
            // SAFETY: only the data endpoints are touched, after the stack set them up
            unsafe { UsbFs::new() },
            DOUBLE_BUFFER_PMA_BASE,
            LINE_CODING_LIMITS,
            line_coding,
            ResetPins::new(board.reset, board.boot),
        )
        .unwrap();

        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(USB_VID, USB_PID))
            .manufacturer(MANUFACTURER)
            .product(SERIAL_PRODUCT)
            .serial_number(SERIAL_NUMBER)
            .device_class(USB_CLASS_CDC)
            .build();

        let watchdog = LoopWatchdog::start(board.iwdg);

        init::LateResources {
            usb: UsbSerial::new(usb_dev, class),
            bridge,
            uart,
            rx_dma,
            tx_queue: TxQueue::new(tx_dma),
            watchdog,
        }
    }

    #[idle(resources = [usb, bridge, uart, rx_dma, tx_queue, watchdog])]
    fn idle(mut cx: idle::Context) -> ! {
        loop {
            if let Err(e) = service(
                cx.resources.usb,
                cx.resources.bridge,
                &mut cx.resources.tx_queue,
                cx.resources.uart,
                cx.resources.rx_dma,
                cx.resources.watchdog,
            ) {
                rprintln!("usb: {:?}, resetting", e);
                #[cfg(feature = "semihosting")]
                hprintln!("usb: {:?}, resetting", e);
                reset_system();
            }
            cx.resources.watchdog.feed();
        }
    }

    #[task(binds = DMA1_CH2_3, resources = [tx_queue], priority = 2)]
    fn uart_tx_complete(cx: uart_tx_complete::Context) {
        let queue = cx.resources.tx_queue;
        queue.dma().clear_complete();
        queue.transfer_complete();
    }
};

/// One pass of the main loop.
fn service<Q>(
    usb: &mut SerialUsb,
    bridge: &mut UartBridge<'static>,
    tx_queue: &mut Q,
    uart: &mut Uart,
    rx_dma: &UartRxDma,
    watchdog: &mut LoopWatchdog,
) -> usb_device::Result<()>
where
    Q: Mutex<T = TxQueue<UartTxDma>>,
{
    usb.poll()?;

    let (engine, serial) = usb.class.split();
    bridge.forward_usb_to_uart(engine, serial, tx_queue, uart)?;
    let forward = bridge.forward_uart_to_usb(engine, serial, rx_dma.remaining())?;
    if forward.overflowed {
        rprintln!("uart: receive overrun");
    }

    usb.send_pending_state(watchdog)
}
