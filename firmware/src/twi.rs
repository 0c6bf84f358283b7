//! TWI (I2C) slave front end.
//!
//! Every bus event raises the TWI interrupt. The handler decodes the status
//! register, runs it through the core protocol table and writes TWCR back.
//! It never blocks: each event is a handful of register accesses.

use avr_device::atmega32u4::Peripherals;
use avr_device::interrupt::{self, Mutex};
use core::cell::Cell;

use twikbd_core::bus::{BusSlave, Control, Event};
use twikbd_core::Mailbox;

use crate::serial;

// TWCR bits
const TWINT: u8 = 1 << 7;
const TWEA: u8 = 1 << 6;
const TWSTO: u8 = 1 << 4;
const TWEN: u8 = 1 << 2;
const TWIE: u8 = 1 << 0;

const TWCR_ACK: u8 = TWINT | TWEA | TWEN | TWIE;
const TWCR_NACK: u8 = TWINT | TWEN | TWIE;
const TWCR_RECOVER: u8 = TWINT | TWSTO | TWEA | TWEN | TWIE;

/// Marker sent on the debug channel before the offending status byte.
const FATAL_MARKER: &[u8] = b"\nTWI!";

/// The pending command, filled here and drained by the main loop.
pub static MAILBOX: Mailbox = Mailbox::new();

static SLAVE: Mutex<Cell<BusSlave>> = Mutex::new(Cell::new(BusSlave::new()));

/// Start listening as a slave at the given 7-bit address.
pub fn init(twi: &avr_device::atmega32u4::TWI, address: u8) {
    twi.twar.write(|w| unsafe { w.bits(address << 1) });
    twi.twcr.write(|w| unsafe { w.bits(TWEA | TWEN | TWIE) });
}

#[avr_device::interrupt(atmega32u4)]
fn TWI() {
    let dp = unsafe { Peripherals::steal() };
    let twi = &dp.TWI;

    let status = twi.twsr.read().bits();
    let event = Event::decode(status, || twi.twdr.read().bits());

    let result = interrupt::free(|cs| {
        let cell = SLAVE.borrow(cs);
        let mut slave = cell.get();
        let result = slave.handle(event, &MAILBOX);
        cell.set(slave);
        result
    });

    match result {
        Ok(Control::Ack) => twi.twcr.write(|w| unsafe { w.bits(TWCR_ACK) }),
        Ok(Control::Nack) => twi.twcr.write(|w| unsafe { w.bits(TWCR_NACK) }),
        Ok(Control::Transmit(byte)) => {
            twi.twdr.write(|w| unsafe { w.bits(byte) });
            twi.twcr.write(|w| unsafe { w.bits(TWCR_ACK) });
        }
        Ok(Control::RecoverBus) => twi.twcr.write(|w| unsafe { w.bits(TWCR_RECOVER) }),
        Err(status) => {
            // Only reachable if the peripheral ends up in a master mode.
            serial::write_bytes(&dp.USART1, FATAL_MARKER);
            serial::write_byte(&dp.USART1, status);
            crate::halt();
        }
    }
}
