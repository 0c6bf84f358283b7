//! Single-slot command mailbox between the TWI interrupt and the main loop.
//!
//! The interrupt is the only producer and only ever fills an empty slot.
//! The main loop is the only consumer and only empties the slot once the
//! command it holds has been fully handled. Byte loads and stores are atomic
//! on AVR, so no compare-and-swap is needed for that hand-off.

use core::sync::atomic::{AtomicU8, Ordering};

/// Slot value meaning "no command pending".
pub const NO_COMMAND: u8 = 0x00;

pub struct Mailbox {
    slot: AtomicU8,
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            slot: AtomicU8::new(NO_COMMAND),
        }
    }

    /// Producer side: store `command` if the slot is empty.
    /// Returns false (and drops the byte) if a command is still pending.
    pub fn offer(&self, command: u8) -> bool {
        if self.slot.load(Ordering::Acquire) != NO_COMMAND {
            return false;
        }
        self.slot.store(command, Ordering::Release);
        true
    }

    /// Consumer side: the pending command, or `NO_COMMAND`.
    pub fn peek(&self) -> u8 {
        self.slot.load(Ordering::Acquire)
    }

    /// Consumer side: hand the slot back to the producer.
    pub fn release(&self) {
        self.slot.store(NO_COMMAND, Ordering::Release);
    }

    pub fn is_empty(&self) -> bool {
        self.peek() == NO_COMMAND
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
