//! EEPROM access for the bus address table.

use avr_device::atmega32u4::EEPROM;

use twikbd_core::address::AddressTable;
use twikbd_core::config::{ADDRESS_TABLE_LEN, ADDRESS_TABLE_OFFSET};

fn read_byte(eeprom: &EEPROM, address: u16) -> u8 {
    // Wait for any write in progress
    while eeprom.eecr.read().eepe().bit_is_set() {}
    eeprom.eear.write(|w| unsafe { w.bits(address) });
    eeprom.eecr.write(|w| w.eere().set_bit());
    eeprom.eedr.read().bits()
}

/// Read the whole address table in one go.
pub fn read_address_table(eeprom: &EEPROM) -> AddressTable {
    let mut table = [0u8; ADDRESS_TABLE_LEN];
    for (offset, byte) in table.iter_mut().enumerate() {
        *byte = read_byte(eeprom, ADDRESS_TABLE_OFFSET + offset as u16);
    }
    table
}
