// Board configuration.
use cdc_bridge::cdc::LineCodingLimits;

pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;
pub const MANUFACTURER: &str = "minemu";
pub const SERIAL_PRODUCT: &str = "USB serial bridge";
pub const KEYPAD_PRODUCT: &str = "USB keypad";
pub const SERIAL_NUMBER: &str = "00000001";

pub const SYSCLK_HZ: u32 = 48_000_000;
/// USART kernel clock, PCLK runs undivided.
pub const PCLK_HZ: u32 = SYSCLK_HZ;

pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const MIN_BAUDRATE: u32 = 2400;
pub const MAX_BAUDRATE: u32 = 4_000_000;

pub const LINE_CODING_LIMITS: LineCodingLimits = LineCodingLimits {
    min_baud: MIN_BAUDRATE,
    max_baud: MAX_BAUDRATE,
};

/// Packet memory below this offset belongs to the USB stack's own endpoint buffers.
pub const DOUBLE_BUFFER_PMA_BASE: u16 = 0x200;

pub const WATCHDOG_PERIOD_MS: u32 = 500;

/// Key debounce time in SysTick periods.
pub const DEBOUNCE_MS: u16 = 20;
pub const SYSTICK_HZ: u32 = 1000;
