//! Timed press/release state machine.
//!
//! `Idle -> Pressing -> Releasing -> Idle`, stepped once per main loop
//! pass. Every transition restarts the free-running counter, and the
//! deadline for the next state is stored before that state is entered.

use crate::blink::{BlinkSequence, LedPattern};
use crate::config::RELEASE_HOLD_TICKS;
use crate::keycode::Keycode;
use crate::mailbox::Mailbox;
use crate::platform::{expired, Platform};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Pressing,
    Releasing,
}

/// Main loop state. Owned by the main loop and lent to the HID report code.
#[derive(Debug)]
pub struct Context {
    pub(crate) state: ExecutionState,
    pub(crate) pressed: Option<Keycode>,
    /// Counter value at which the current state ends.
    pub(crate) deadline: u16,
    pub(crate) blink: BlinkSequence,
}

impl Context {
    pub const fn new() -> Self {
        Self {
            state: ExecutionState::Idle,
            pressed: None,
            deadline: 0,
            blink: BlinkSequence::new(),
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// The key to report to the host, if one is held down.
    pub fn pressed_key(&self) -> Option<Keycode> {
        self.pressed
    }

    pub fn deadline(&self) -> u16 {
        self.deadline
    }

    pub fn blink_active(&self) -> bool {
        self.blink.is_active()
    }

    /// Advance the diagnostic sequence by one loop iteration.
    pub fn advance_blink(&mut self) -> Option<LedPattern> {
        self.blink.advance()
    }

    /// One main loop pass of the press/release machine.
    pub fn step<P: Platform>(&mut self, mailbox: &Mailbox, platform: &mut P) {
        match self.state {
            ExecutionState::Idle => {
                if self.process_pending_command(mailbox, platform) {
                    platform.reset_counter();
                    self.state = ExecutionState::Pressing;
                }
            }
            ExecutionState::Pressing => {
                if expired(platform, self.deadline) {
                    self.pressed = None;
                    self.deadline = RELEASE_HOLD_TICKS;
                    platform.reset_counter();
                    self.state = ExecutionState::Releasing;
                }
            }
            ExecutionState::Releasing => {
                if expired(platform, self.deadline) {
                    mailbox.release();
                    self.state = ExecutionState::Idle;
                }
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
