// Direct drive switches, closed to ground.
use embedded_hal::digital::v2::InputPin;
use stm32f0xx_hal::gpio::gpioa::{PA0, PA1, PA2, PA3, PA4, PA5, PA6, PA7};
use stm32f0xx_hal::gpio::gpiob::{PB6, PB7};
use stm32f0xx_hal::gpio::{Input, PullUp};

pub const N_SWITCHES: usize = 10;

type SW1 = PA7<Input<PullUp>>;
type SW2 = PA6<Input<PullUp>>;
type SW3 = PA5<Input<PullUp>>;
type SW4 = PA4<Input<PullUp>>;
type SW5 = PA3<Input<PullUp>>;
type SW6 = PA2<Input<PullUp>>;
type SW7 = PA1<Input<PullUp>>;
type SW8 = PA0<Input<PullUp>>;
type SW9 = PB7<Input<PullUp>>;
type SW10 = PB6<Input<PullUp>>;

pub struct Switches {
    sw1: SW1,
    sw2: SW2,
    sw3: SW3,
    sw4: SW4,
    sw5: SW5,
    sw6: SW6,
    sw7: SW7,
    sw8: SW8,
    sw9: SW9,
    sw10: SW10,
}

impl Switches {
    pub fn new(
        sw1: SW1,
        sw2: SW2,
        sw3: SW3,
        sw4: SW4,
        sw5: SW5,
        sw6: SW6,
        sw7: SW7,
        sw8: SW8,
        sw9: SW9,
        sw10: SW10,
    ) -> Switches {
        Switches {
            sw1,
            sw2,
            sw3,
            sw4,
            sw5,
            sw6,
            sw7,
            sw8,
            sw9,
            sw10,
        }
    }

    /// Pressed state of every switch, in key order.
    pub fn scan(&self) -> [bool; N_SWITCHES] {
        // GPIO reads on this chip cannot fail
        [
            self.sw1.is_low().unwrap_or(false),
            self.sw2.is_low().unwrap_or(false),
            self.sw3.is_low().unwrap_or(false),
            self.sw4.is_low().unwrap_or(false),
            self.sw5.is_low().unwrap_or(false),
            self.sw6.is_low().unwrap_or(false),
            self.sw7.is_low().unwrap_or(false),
            self.sw8.is_low().unwrap_or(false),
            self.sw9.is_low().unwrap_or(false),
            self.sw10.is_low().unwrap_or(false),
        ]
    }
}
