//! Compile-time configuration shared by the firmware and the CLI.
//!
//! Timings are expressed in Timer1 ticks: 16 MHz CPU clock with a /1024
//! prescaler gives 15 625 ticks per second (64 us per tick). The counter is
//! 16 bits wide, so anything longer than ~4.19 s would overflow.

/// Timer1 ticks per second at 16 MHz with the /1024 prescaler.
pub const TICKS_PER_SECOND: u32 = 15_625;

/// Convert milliseconds to Timer1 ticks (truncating).
pub const fn ms_to_ticks(ms: u32) -> u16 {
    (ms * TICKS_PER_SECOND / 1000) as u16
}

/// How long a normal key press is held down (50 ms).
pub const PRESS_NORMAL_TICKS: u16 = ms_to_ticks(50);

/// How long a long key press is held down (1.5 s), for keys the host only
/// acts on when held, e.g. media track skipping on some players.
pub const PRESS_LONG_TICKS: u16 = ms_to_ticks(1500);

/// Minimum key-up time between two presses (30 ms).
pub const RELEASE_HOLD_TICKS: u16 = ms_to_ticks(30);

/// Number of indicator/value cells in the persistent address table.
pub const ADDRESS_CELLS: usize = 16;

/// Total size of the address table in EEPROM: all indicators, then all values.
pub const ADDRESS_TABLE_LEN: usize = ADDRESS_CELLS * 2;

/// EEPROM offset of the address table.
pub const ADDRESS_TABLE_OFFSET: u16 = 0;

/// Bus address used when no cell of the table holds a usable address.
pub const DEFAULT_ADDRESS: u8 = 0x2A;

/// Lowest and highest non-reserved 7-bit I2C addresses.
pub const FIRST_ADDRESS: u8 = 0x08;
pub const LAST_ADDRESS: u8 = 0x77;

// Release must be strictly shorter than any press.
const _: () = assert!(RELEASE_HOLD_TICKS < PRESS_NORMAL_TICKS);
const _: () = assert!(PRESS_NORMAL_TICKS < PRESS_LONG_TICKS);
const _: () = assert!(DEFAULT_ADDRESS >= FIRST_ADDRESS && DEFAULT_ADDRESS <= LAST_ADDRESS);
