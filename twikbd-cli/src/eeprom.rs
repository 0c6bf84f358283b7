//! Out-of-band editing of the wear-leveled address table.
//!
//! An update never rewrites a cell in place. The new address goes into the
//! next never-used cell after the active one (wrapping around) and the
//! previous cell is retired in the same image. avrdude writes the image in
//! ascending order, indicators before values, so an interrupted write can
//! leave the new cell active with an erased value; the device skips cells
//! without a usable address and falls back to the default address.

use anyhow::{bail, Result};

use twikbd_core::address::{
    active_cell, is_active, is_valid_address, resolve_address, AddressTable, INDICATOR_ACTIVE,
    INDICATOR_RETIRED, INDICATOR_UNUSED,
};
use twikbd_core::config::{ADDRESS_CELLS, ADDRESS_TABLE_LEN, FIRST_ADDRESS, LAST_ADDRESS};

use crate::hex::{self, HexSegment};

/// Extract the address table from a parsed EEPROM image.
pub fn table_from_segments(segments: &[HexSegment]) -> AddressTable {
    let image = hex::fill_image(segments, ADDRESS_TABLE_LEN);
    let mut table = [INDICATOR_UNUSED; ADDRESS_TABLE_LEN];
    table.copy_from_slice(&image);
    table
}

pub fn blank_table() -> AddressTable {
    [INDICATOR_UNUSED; ADDRESS_TABLE_LEN]
}

pub fn validate_address(address: u8) -> Result<()> {
    if !is_valid_address(address) {
        bail!(
            "address 0x{:02X} is outside the usable 7-bit range 0x{:02X}..=0x{:02X}",
            address,
            FIRST_ADDRESS,
            LAST_ADDRESS
        );
    }
    Ok(())
}

/// Table with `address` programmed into a fresh cell and every other active
/// cell retired. Returns `None` if the table already resolves to `address`.
pub fn plan_update(table: &AddressTable, address: u8) -> Result<Option<AddressTable>> {
    validate_address(address)?;

    let active = active_cell(table);
    if active.is_some() && resolve_address(table) == address {
        return Ok(None);
    }

    let start = active.map_or(0, |index| index + 1);
    let Some(next) = (start..ADDRESS_CELLS)
        .chain(0..start)
        .find(|&index| table[index] == INDICATOR_UNUSED)
    else {
        bail!(
            "all {} address cells have been used; erase the EEPROM table to start over",
            ADDRESS_CELLS
        );
    };

    let mut updated = *table;
    updated[next] = INDICATOR_ACTIVE;
    updated[ADDRESS_CELLS + next] = address;
    for index in 0..ADDRESS_CELLS {
        if index != next && is_active(updated[index]) {
            updated[index] = INDICATOR_RETIRED;
        }
    }

    Ok(Some(updated))
}

/// Number of cells that can still take a new address.
pub fn unused_cells(table: &AddressTable) -> usize {
    table[..ADDRESS_CELLS]
        .iter()
        .filter(|&&indicator| indicator == INDICATOR_UNUSED)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use twikbd_core::config::DEFAULT_ADDRESS;

    #[test]
    fn test_first_update_uses_cell_zero() {
        let table = plan_update(&blank_table(), 0x30).unwrap().unwrap();
        assert_eq!(active_cell(&table), Some(0));
        assert_eq!(resolve_address(&table), 0x30);
        assert_eq!(unused_cells(&table), ADDRESS_CELLS - 1);
    }

    #[test]
    fn test_update_moves_to_next_cell_and_retires_old() {
        let first = plan_update(&blank_table(), 0x30).unwrap().unwrap();
        let second = plan_update(&first, 0x31).unwrap().unwrap();
        assert_eq!(second[0], INDICATOR_RETIRED);
        assert_eq!(active_cell(&second), Some(1));
        assert_eq!(resolve_address(&second), 0x31);
    }

    #[test]
    fn test_same_address_is_noop() {
        let table = plan_update(&blank_table(), 0x30).unwrap().unwrap();
        assert!(plan_update(&table, 0x30).unwrap().is_none());
    }

    #[test]
    fn test_default_address_still_written_on_blank_table() {
        let table = plan_update(&blank_table(), DEFAULT_ADDRESS).unwrap();
        assert!(table.is_some());
    }

    #[test]
    fn test_wraps_to_unused_cell() {
        let mut table = blank_table();
        for index in 0..ADDRESS_CELLS {
            table[index] = INDICATOR_RETIRED;
        }
        table[2] = INDICATOR_UNUSED;
        table[ADDRESS_CELLS - 1] = INDICATOR_ACTIVE;
        table[ADDRESS_CELLS * 2 - 1] = 0x20;

        let updated = plan_update(&table, 0x21).unwrap().unwrap();
        assert_eq!(active_cell(&updated), Some(2));
        assert_eq!(updated[ADDRESS_CELLS - 1], INDICATOR_RETIRED);
        assert_eq!(resolve_address(&updated), 0x21);
    }

    #[test]
    fn test_exhausted_table_fails() {
        let mut table = [INDICATOR_RETIRED; ADDRESS_TABLE_LEN];
        table[4] = INDICATOR_ACTIVE;
        assert!(plan_update(&table, 0x40).is_err());
    }

    #[test]
    fn test_rejects_reserved_addresses() {
        assert!(plan_update(&blank_table(), 0x03).is_err());
        assert!(plan_update(&blank_table(), 0x78).is_err());
        assert!(plan_update(&blank_table(), 0x80).is_err());
    }

    #[test]
    fn test_table_from_short_image() {
        let segments = vec![HexSegment {
            address: 0,
            data: vec![INDICATOR_ACTIVE],
        }];
        let table = table_from_segments(&segments);
        assert_eq!(table[0], INDICATOR_ACTIVE);
        assert_eq!(table[1], INDICATOR_UNUSED);
        // Value byte of cell 0 is still erased
        assert_eq!(active_cell(&table), None);
        assert_eq!(resolve_address(&table), DEFAULT_ADDRESS);
    }

    #[test]
    fn test_interrupted_image_write_falls_back_to_default() {
        let old = plan_update(&blank_table(), 0x30).unwrap().unwrap();
        let new = plan_update(&old, 0x31).unwrap().unwrap();

        // Indicator half of the new image landed, value half did not.
        let mut torn = old;
        torn[..ADDRESS_CELLS].copy_from_slice(&new[..ADDRESS_CELLS]);
        assert_eq!(resolve_address(&torn), DEFAULT_ADDRESS);

        // Re-running the update on the torn table skips the half-written cell.
        let repaired = plan_update(&torn, 0x31).unwrap().unwrap();
        assert_eq!(resolve_address(&repaired), 0x31);
        assert_eq!(active_cell(&repaired), Some(2));
    }
}
