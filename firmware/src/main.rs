//! TWI keyboard firmware for ATmega32U4 (Leonardo-class boards, Caterina
//! bootloader).
//!
//! A bus master writes one-byte commands to this device over TWI (I2C); each
//! key command becomes a single, timed key press on the USB host:
//! - TWI slave receiver at an address read from EEPROM
//! - One pending command at a time, handed from the TWI interrupt to the
//!   main loop through a one-byte mailbox
//! - Press/release timing on the free-running Timer1
//! - USB HID keyboard reports
//! - Debug output on USART1

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod board;
mod eeprom;
mod hid;
mod led;
mod serial;
mod twi;

use avr_device::atmega32u4::Peripherals;

use twikbd_core::{resolve_address, Context};

use board::Board;
use hid::{KeyboardReport, UsbKeyboard};

/// Panic handler: stop everything.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    halt()
}

/// Disable interrupts and spin until an external reset.
pub fn halt() -> ! {
    avr_device::interrupt::disable();
    loop {}
}

#[avr_device::entry]
fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // A watchdog reset (e.g. after a bootloader request) leaves it running
    board::disable_watchdog(&dp.CPU, &dp.WDT);

    // Clock prescaler = 1
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    led::init(&dp);
    serial::init(&dp.USART1);
    board::init_timer(&dp.TC1);

    let address = resolve_address(&eeprom::read_address_table(&dp.EEPROM));
    serial::write_byte(&dp.USART1, b'A');
    serial::write_hex(&dp.USART1, address);
    serial::write_byte(&dp.USART1, b'\n');

    // Give the host time to notice the bootloader is gone, otherwise it
    // does not re-enumerate us.
    delay_ms(500);

    let mut usb = UsbKeyboard::new();
    usb.init(&dp);

    // The TWI interrupt fires as soon as a master addresses us
    twi::init(&dp.TWI, address);
    unsafe { avr_device::interrupt::enable() };

    let mut board = Board::new(&dp);
    let mut ctx = Context::new();
    let mut last_state = None;

    loop {
        let state = usb.state();
        if last_state != Some(state) {
            last_state = Some(state);
            serial::write_bytes(&dp.USART1, &[b'S', b'0' + state as u8, b'\n']);
        }

        usb.poll(&dp);

        ctx.step(&twi::MAILBOX, &mut board);

        if let Some(pattern) = ctx.advance_blink() {
            led::show(&dp, pattern);
        }

        usb.send_report(&dp, &KeyboardReport::for_key(ctx.pressed_key()));
    }
}

/// Busy-wait delay in milliseconds (approximate, at 16MHz).
fn delay_ms(ms: u16) {
    for _ in 0..ms {
        // ~1ms at 16MHz: 16000 cycles / 4 cycles per loop iteration
        for _ in 0..4000u16 {
            unsafe { core::arch::asm!("nop") };
        }
    }
}
