use embedded_hal::watchdog::{Watchdog as _, WatchdogEnable as _};
use rtt_target::rprintln;
use stm32f0xx_hal::pac::IWDG;
use stm32f0xx_hal::time::Hertz;
use stm32f0xx_hal::watchdog::Watchdog;

use crate::config::WATCHDOG_PERIOD_MS;

/// Independent watchdog; resets the chip unless fed once per main loop pass.
pub struct LoopWatchdog {
    wd: Watchdog,
}

impl LoopWatchdog {
    pub fn start(iwdg: IWDG) -> LoopWatchdog {
        let mut wd = Watchdog::new(iwdg);
        wd.start(Hertz(1000 / WATCHDOG_PERIOD_MS));
        rprintln!("watchdog: {} ms", WATCHDOG_PERIOD_MS);
        LoopWatchdog { wd }
    }

    pub fn feed(&mut self) {
        self.wd.feed();
    }
}

pub fn reset_system() -> ! {
    cortex_m::peripheral::SCB::sys_reset()
}
