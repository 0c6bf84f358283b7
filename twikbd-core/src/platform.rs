//! Hardware capabilities the state machines depend on.

/// Implemented by the firmware over Timer1 and the watchdog, and by mocks
/// in tests.
pub trait Platform {
    /// Restart the free-running counter from zero and clear its overflow flag.
    fn reset_counter(&mut self);

    /// Current counter value in ticks.
    fn counter(&self) -> u16;

    /// Whether the counter wrapped since the last reset.
    fn counter_overflowed(&self) -> bool;

    /// Leave the bootloader's "stay in bootloader" signal and reset the chip.
    fn signal_bootloader_and_reset(&mut self) -> !;
}

/// True once `deadline` ticks have passed since the last counter reset.
/// An overflow always counts as expired.
pub fn expired<P: Platform + ?Sized>(platform: &P, deadline: u16) -> bool {
    platform.counter_overflowed() || platform.counter() > deadline
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Platform;

    /// Counter under test control; rebooting panics so tests can observe it.
    #[derive(Default)]
    pub struct MockPlatform {
        pub ticks: u16,
        pub overflowed: bool,
        pub resets: u32,
    }

    impl Platform for MockPlatform {
        fn reset_counter(&mut self) {
            self.ticks = 0;
            self.overflowed = false;
            self.resets += 1;
        }

        fn counter(&self) -> u16 {
            self.ticks
        }

        fn counter_overflowed(&self) -> bool {
            self.overflowed
        }

        fn signal_bootloader_and_reset(&mut self) -> ! {
            panic!("bootloader reset");
        }
    }
}
