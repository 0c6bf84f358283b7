mod eeprom;
mod hex;
mod usb;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use twikbd_core::address::{active_cell, resolve_address};
use twikbd_core::config::DEFAULT_ADDRESS;

#[derive(Parser)]
#[command(name = "twikbd-cli")]
#[command(about = "Configuration tool for the TWI keyboard")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect or change the bus address stored in an EEPROM image
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Detect whether the keyboard or its bootloader is connected
    Detect,
}

#[derive(Subcommand)]
enum AddressAction {
    /// Print the address the device would use with this EEPROM image
    Show {
        /// Intel HEX EEPROM dump (e.g. from `avrdude -U eeprom:r:dump.hex:i`)
        image: PathBuf,
    },
    /// Write a new address into the next free cell of the table
    Set {
        /// 7-bit bus address, decimal or 0x-prefixed hex
        #[arg(value_parser = parse_address)]
        address: u8,
        /// Current EEPROM dump; a blank table is assumed if omitted
        #[arg(long)]
        image: Option<PathBuf>,
        /// Where to write the updated Intel HEX EEPROM image
        #[arg(long, short)]
        out: PathBuf,
    },
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

fn read_table(path: &Path) -> Result<twikbd_core::address::AddressTable> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let segments = hex::parse_hex(&contents).context("parsing Intel HEX file")?;
    Ok(eeprom::table_from_segments(&segments))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Address { action } => match action {
            AddressAction::Show { image } => {
                let table = read_table(&image)?;
                let address = resolve_address(&table);
                match active_cell(&table) {
                    Some(cell) => println!("Address 0x{:02X} (cell {})", address, cell),
                    None => println!("No active cell, default address 0x{:02X}", DEFAULT_ADDRESS),
                }
                println!("{} unused cells left", eeprom::unused_cells(&table));
            }
            AddressAction::Set {
                address,
                image,
                out,
            } => {
                let table = match &image {
                    Some(path) => read_table(path)?,
                    None => eeprom::blank_table(),
                };

                let updated = match eeprom::plan_update(&table, address)? {
                    Some(updated) => updated,
                    None => {
                        println!("Address is already 0x{:02X}, writing image unchanged.", address);
                        table
                    }
                };

                fs::write(&out, hex::write_hex(&updated))
                    .with_context(|| format!("writing {}", out.display()))?;
                println!(
                    "Wrote {} (address 0x{:02X}, {} unused cells left)",
                    out.display(),
                    resolve_address(&updated),
                    eeprom::unused_cells(&updated)
                );
                println!("Program it with: avrdude ... -U eeprom:w:{}:i", out.display());
            }
        },
        Command::Detect => match usb::detect()? {
            usb::Presence::Keyboard => println!("TWI keyboard detected."),
            usb::Presence::Bootloader => println!("Bootloader detected (Caterina)."),
            usb::Presence::Absent => {
                println!("Neither the keyboard nor its bootloader was found.");
                println!("Send command 0x02 over the bus to enter the bootloader.");
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_formats() {
        assert_eq!(parse_address("0x2A"), Ok(0x2A));
        assert_eq!(parse_address("42"), Ok(42));
        assert!(parse_address("0x100").is_err());
        assert!(parse_address("bogus").is_err());
    }
}
