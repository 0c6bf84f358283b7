use anyhow::{Context, Result};

/// The keyboard itself, as enumerated by the firmware.
pub const KEYBOARD_VID: u16 = 0x03EB;
pub const KEYBOARD_PID: u16 = 0x2042;

/// Arduino Leonardo Caterina bootloader.
pub const BOOTLOADER_VID: u16 = 0x2341;
pub const BOOTLOADER_PID: u16 = 0x0036;

/// What is currently plugged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Keyboard,
    Bootloader,
    Absent,
}

fn is_connected(vid: u16, pid: u16) -> Result<bool> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Look for the keyboard first, then for the bootloader it reboots into.
pub fn detect() -> Result<Presence> {
    if is_connected(KEYBOARD_VID, KEYBOARD_PID)? {
        return Ok(Presence::Keyboard);
    }
    if is_connected(BOOTLOADER_VID, BOOTLOADER_PID)? {
        return Ok(Presence::Bootloader);
    }
    Ok(Presence::Absent)
}
