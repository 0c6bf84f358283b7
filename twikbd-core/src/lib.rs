//! Platform-independent core of the TWI keyboard.
//!
//! A bus master writes one command byte at a time to this device, which
//! turns it into a single, precisely timed key press on the USB host.
//! This crate is `no_std` so the AVR firmware and the native CLI tool share
//! the exact same logic, and everything here runs under `cargo test` on the
//! host.

#![cfg_attr(not(test), no_std)]

pub mod address;
pub mod blink;
pub mod bus;
pub mod command;
pub mod config;
pub mod keycode;
pub mod mailbox;
pub mod platform;
pub mod press;

pub use address::resolve_address;
pub use mailbox::Mailbox;
pub use platform::Platform;
pub use press::{Context, ExecutionState};
