//! RX (PB0) and TX (PD5) indicator LEDs. Both are active low.

use avr_device::atmega32u4::Peripherals;

use twikbd_core::blink::LedPattern;

const RX_MASK: u8 = 1 << 0;
const TX_MASK: u8 = 1 << 5;

pub fn init(dp: &Peripherals) {
    dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(r.bits() | RX_MASK) });
    dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(r.bits() | TX_MASK) });
    show(dp, LedPattern::Off);
}

pub fn show(dp: &Peripherals, pattern: LedPattern) {
    let (rx, tx) = match pattern {
        LedPattern::Off => (false, false),
        LedPattern::Rx => (true, false),
        LedPattern::Tx => (false, true),
        LedPattern::Both => (true, true),
    };

    // Pin low = LED on
    dp.PORTB.portb.modify(|r, w| unsafe {
        w.bits(if rx { r.bits() & !RX_MASK } else { r.bits() | RX_MASK })
    });
    dp.PORTD.portd.modify(|r, w| unsafe {
        w.bits(if tx { r.bits() & !TX_MASK } else { r.bits() | TX_MASK })
    });
}
