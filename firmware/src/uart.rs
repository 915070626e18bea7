use cdc_bridge::bridge::UartControl;
use cdc_bridge::cdc::{LineCoding, Parity, StopBits};
use rtt_target::rprintln;
use stm32f0xx_hal::pac::USART1;

use crate::board::UartPins;
use crate::config::PCLK_HZ;

/// USART1 moving all data through DMA.
pub struct Uart {
    usart: USART1,
    _pins: UartPins,
}

impl Uart {
    pub fn new(usart: USART1, pins: UartPins, coding: &LineCoding) -> Uart {
        let mut uart = Uart { usart, _pins: pins };
        uart.apply_line_coding(coding);
        uart.usart.cr3.write(|w| w.dmar().set_bit().dmat().set_bit());
        uart
    }
}

/// BRR value and whether 8x oversampling is needed for `baud_rate`.
fn divider(baud_rate: u32) -> (u32, bool) {
    let prescale = (PCLK_HZ + baud_rate / 2) / baud_rate;
    if prescale < 16 {
        // BRR[2:0] holds USARTDIV[3:0] shifted right by one
        (prescale + (prescale & !7), true)
    } else {
        (prescale, false)
    }
}

impl UartControl for Uart {
    fn is_idle(&self) -> bool {
        self.usart.isr.read().tc().bit_is_set()
    }

    fn apply_line_coding(&mut self, coding: &LineCoding) {
        let (brr, over8) = divider(coding.baud_rate);
        let word_length = coding.word_length();
        let (pce, ps) = match coding.parity {
            Parity::Odd => (true, true),
            Parity::Even => (true, false),
            _ => (false, false),
        };

        // frame format is only writable while disabled
        self.usart.cr1.modify(|_, w| w.ue().clear_bit());
        self.usart.brr.write(|w| unsafe { w.bits(brr) });
        self.usart.cr2.write(|w| match coding.stop_bits {
            StopBits::One => w.stop().stop1(),
            StopBits::Two => w.stop().stop2(),
            StopBits::OnePointFive => w.stop().stop1p5(),
        });
        self.usart.cr1.write(|w| {
            w.over8()
                .bit(over8)
                .m1()
                .bit(word_length == 7)
                .m0()
                .bit(word_length == 9)
                .pce()
                .bit(pce)
                .ps()
                .bit(ps)
                .re()
                .set_bit()
                .te()
                .set_bit()
                .ue()
                .set_bit()
        });
        rprintln!(
            "uart: {} baud, {} bits, {:?} parity, {:?} stop",
            coding.baud_rate,
            coding.data_bits,
            coding.parity,
            coding.stop_bits
        );
    }
}
