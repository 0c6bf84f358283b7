//! Transmit-only debug output on USART1 (115200 8N1).

use avr_device::atmega32u4::USART1;

/// UBRR for 115200 baud at 16 MHz, normal speed: 16e6 / (16 * 115200) - 1, rounded.
const UBRR_VALUE: u16 = 8;

pub fn init(usart: &USART1) {
    usart.ubrr1.write(|w| unsafe { w.bits(UBRR_VALUE) });
    usart.ucsr1a.write(|w| unsafe { w.bits(0) });
    // 8 data bits, no parity, 1 stop bit
    usart.ucsr1c.write(|w| unsafe { w.bits(0x06) });
    usart.ucsr1b.write(|w| w.txen1().set_bit());
}

pub fn write_byte(usart: &USART1, byte: u8) {
    while usart.ucsr1a.read().udre1().bit_is_clear() {}
    usart.udr1.write(|w| unsafe { w.bits(byte) });
}

pub fn write_bytes(usart: &USART1, bytes: &[u8]) {
    for &byte in bytes {
        write_byte(usart, byte);
    }
}

/// Two uppercase hex digits.
pub fn write_hex(usart: &USART1, value: u8) {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    write_byte(usart, DIGITS[(value >> 4) as usize]);
    write_byte(usart, DIGITS[(value & 0x0F) as usize]);
}
