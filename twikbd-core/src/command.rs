//! Command byte interpretation.

use crate::config::{PRESS_LONG_TICKS, PRESS_NORMAL_TICKS};
use crate::keycode::Keycode;
use crate::mailbox::{Mailbox, NO_COMMAND};
use crate::platform::Platform;
use crate::press::Context;

/// Start the diagnostic LED sequence.
pub const CMD_BLINK: u8 = 0x01;
/// Reboot into the bootloader. Never returns.
pub const CMD_BOOTLOADER: u8 = 0x02;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PressLength {
    Normal,
    Long,
}

impl PressLength {
    pub const fn ticks(self) -> u16 {
        match self {
            PressLength::Normal => PRESS_NORMAL_TICKS,
            PressLength::Long => PRESS_LONG_TICKS,
        }
    }
}

/// One entry of the command table.
#[derive(Copy, Clone, Debug)]
pub struct KeyCommand {
    pub command: u8,
    pub key: Keycode,
    pub length: PressLength,
}

const fn normal(command: u8, key: Keycode) -> KeyCommand {
    KeyCommand {
        command,
        key,
        length: PressLength::Normal,
    }
}

const fn long(command: u8, key: Keycode) -> KeyCommand {
    KeyCommand {
        command,
        key,
        length: PressLength::Long,
    }
}

/// Every command that results in a key press, in command order.
pub static KEY_COMMANDS: [KeyCommand; 13] = [
    normal(0x03, Keycode::Up),
    normal(0x04, Keycode::Down),
    normal(0x05, Keycode::Left),
    normal(0x06, Keycode::Right),
    normal(0x07, Keycode::KeypadEnter),
    normal(0x08, Keycode::Escape),
    normal(0x09, Keycode::F5),
    normal(0x0A, Keycode::Application),
    normal(0x0B, Keycode::MediaPreviousTrack),
    normal(0x0C, Keycode::MediaNextTrack),
    normal(0x0D, Keycode::Space),
    long(0x0E, Keycode::MediaPreviousTrack),
    long(0x0F, Keycode::MediaNextTrack),
];

/// Table entry for a command byte, if it presses a key.
pub fn lookup(command: u8) -> Option<&'static KeyCommand> {
    KEY_COMMANDS.iter().find(|entry| entry.command == command)
}

impl Context {
    /// Act on whatever is in the mailbox. Only meaningful while idle.
    ///
    /// Returns true when a key press was armed: the key and its deadline are
    /// set and the mailbox stays full until the press/release cycle is over.
    /// Anything else empties the mailbox right away.
    pub fn process_pending_command<P: Platform>(
        &mut self,
        mailbox: &Mailbox,
        platform: &mut P,
    ) -> bool {
        match mailbox.peek() {
            NO_COMMAND => return false,
            CMD_BLINK => self.blink.arm(),
            CMD_BOOTLOADER => platform.signal_bootloader_and_reset(),
            command => {
                if let Some(entry) = lookup(command) {
                    self.pressed = Some(entry.key);
                    self.deadline = entry.length.ticks();
                    return true;
                }
            }
        }

        mailbox.release();
        false
    }
}
