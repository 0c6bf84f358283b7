//! Wear-leveled bus address table.
//!
//! The table holds `ADDRESS_CELLS` cells, each an (indicator, value) pair,
//! stored as two halves: every indicator byte first, then every value byte.
//! An indicator of 0xFF means the cell was never written and 0x00 means it
//! was retired; anything else marks the cell active. Each address change
//! programs a fresh cell instead of rewriting the same EEPROM byte.
//!
//! The device only ever reads the table. Writing it is done out of band
//! (see the `twikbd-cli address set` command).

use crate::config::{
    ADDRESS_CELLS, ADDRESS_TABLE_LEN, DEFAULT_ADDRESS, FIRST_ADDRESS, LAST_ADDRESS,
};

/// Raw EEPROM image of the table.
pub type AddressTable = [u8; ADDRESS_TABLE_LEN];

/// Indicator of a never-programmed cell (erased EEPROM).
pub const INDICATOR_UNUSED: u8 = 0xFF;
/// Indicator of a cell that held an address which has since been replaced.
pub const INDICATOR_RETIRED: u8 = 0x00;
/// Indicator written by the CLI when activating a cell.
pub const INDICATOR_ACTIVE: u8 = 0x5A;

/// True if the indicator byte marks its cell as active.
pub const fn is_active(indicator: u8) -> bool {
    indicator != INDICATOR_RETIRED && indicator != INDICATOR_UNUSED
}

/// True if `address` is a 7-bit address outside the reserved ranges.
pub const fn is_valid_address(address: u8) -> bool {
    address >= FIRST_ADDRESS && address <= LAST_ADDRESS
}

/// Index of the last active cell holding a usable address, if any.
///
/// While an update is in progress two cells may be active at once; the
/// highest index is the newer one. An active cell whose value is not a
/// usable address (e.g. still erased after an interrupted write) is skipped.
/// The whole table is always scanned, so the scan takes the same time
/// wherever the active cell sits.
pub fn active_cell(table: &AddressTable) -> Option<usize> {
    let (indicators, values) = table.split_at(ADDRESS_CELLS);
    let mut active = None;
    for (index, (&indicator, &value)) in indicators.iter().zip(values).enumerate() {
        if is_active(indicator) && is_valid_address(value) {
            active = Some(index);
        }
    }
    active
}

/// Bus address stored in the table, or `DEFAULT_ADDRESS` if no cell holds one.
pub fn resolve_address(table: &AddressTable) -> u8 {
    match active_cell(table) {
        Some(index) => table[ADDRESS_CELLS + index],
        None => DEFAULT_ADDRESS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> AddressTable {
        [INDICATOR_UNUSED; ADDRESS_TABLE_LEN]
    }

    fn with_cell(mut table: AddressTable, index: usize, indicator: u8, value: u8) -> AddressTable {
        table[index] = indicator;
        table[ADDRESS_CELLS + index] = value;
        table
    }

    #[test]
    fn test_single_active_cell_anywhere() {
        for index in [0, ADDRESS_CELLS / 2, ADDRESS_CELLS - 1] {
            let table = with_cell(blank(), index, INDICATOR_ACTIVE, 0x31);
            assert_eq!(resolve_address(&table), 0x31, "cell {}", index);
        }
    }

    #[test]
    fn test_blank_table_uses_default() {
        assert_eq!(resolve_address(&blank()), DEFAULT_ADDRESS);
    }

    #[test]
    fn test_retired_cells_are_inactive() {
        let mut table = [INDICATOR_RETIRED; ADDRESS_TABLE_LEN];
        table[ADDRESS_CELLS + 3] = 0x44;
        assert_eq!(resolve_address(&table), DEFAULT_ADDRESS);
        assert_eq!(active_cell(&table), None);
    }

    #[test]
    fn test_last_active_cell_wins() {
        let table = with_cell(blank(), 2, INDICATOR_ACTIVE, 0x10);
        let table = with_cell(table, 9, 0x01, 0x20);
        assert_eq!(active_cell(&table), Some(9));
        assert_eq!(resolve_address(&table), 0x20);
    }

    #[test]
    fn test_interrupted_write_never_yields_unusable_address() {
        // Indicators are written before values: the new cell is active but
        // its value byte is still erased, and the old cell is retired.
        let mut table = with_cell(blank(), 0, INDICATOR_RETIRED, 0x30);
        table[1] = INDICATOR_ACTIVE;
        assert_eq!(resolve_address(&table), DEFAULT_ADDRESS);

        // Same, but the old cell had not been retired yet.
        let mut table = with_cell(blank(), 0, INDICATOR_ACTIVE, 0x30);
        table[1] = INDICATOR_ACTIVE;
        assert_eq!(active_cell(&table), Some(0));
        assert_eq!(resolve_address(&table), 0x30);
    }

    #[test]
    fn test_reserved_values_are_skipped() {
        for value in [0x00, 0x07, 0x78, 0x80, 0xFF] {
            let table = with_cell(blank(), 3, INDICATOR_ACTIVE, value);
            assert_eq!(resolve_address(&table), DEFAULT_ADDRESS, "value 0x{:02X}", value);
        }
        assert!(is_valid_address(0x08));
        assert!(is_valid_address(0x77));
    }

    #[test]
    fn test_values_of_inactive_cells_ignored() {
        let mut table = with_cell(blank(), 5, INDICATOR_ACTIVE, 0x33);
        table[ADDRESS_CELLS + 6] = 0x77;
        table[6] = INDICATOR_RETIRED;
        assert_eq!(resolve_address(&table), 0x33);
    }
}
