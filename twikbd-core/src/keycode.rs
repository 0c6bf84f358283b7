//! USB HID keycodes.
//! See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07).

/// The keys this device can press. Only the subset reachable from the
/// command table is listed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Keycode {
    Escape = 0x29,
    Space = 0x2C,
    F5 = 0x3E,

    // Navigation
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    KeypadEnter = 0x58,
    /// Application / context menu key.
    Application = 0x65,

    // Media keys as exposed on the keyboard page (LUFA's
    // HID_KEYBOARD_SC_MEDIA_* codes), so a plain 8-byte report can carry them.
    MediaPreviousTrack = 0xEA,
    MediaNextTrack = 0xEB,
}

impl Keycode {
    /// The raw usage ID placed in the HID report.
    pub const fn usage(self) -> u8 {
        self as u8
    }
}
