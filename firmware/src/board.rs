//! Timer1, watchdog and bootloader hand-off: the hardware side of
//! [`twikbd_core::Platform`].

use avr_device::atmega32u4::{Peripherals, CPU, TC1, WDT};

use twikbd_core::Platform;

/// Timer1 clock select: clk/1024 (CS12 | CS10).
const TC1_PRESCALE_1024: u8 = 0x05;

// WDTCSR bits
const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;

/// Caterina checks this RAM word after a watchdog reset and stays in the
/// bootloader when it holds `BOOT_KEY`.
const BOOT_KEY_ADDRESS: usize = 0x0800;
const BOOT_KEY: u16 = 0x7777;

/// Clear a watchdog left running by the bootloader or a previous reboot.
pub fn disable_watchdog(cpu: &CPU, wdt: &WDT) {
    cpu.mcusr.write(|w| unsafe { w.bits(0) });
    wdt.wdtcsr.write(|w| unsafe { w.bits(WDCE | WDE) });
    wdt.wdtcsr.write(|w| unsafe { w.bits(0) });
}

/// Run Timer1 free in normal mode at 64 us per tick.
pub fn init_timer(tc1: &TC1) {
    tc1.tccr1a.write(|w| unsafe { w.bits(0) });
    tc1.tccr1b.write(|w| unsafe { w.bits(TC1_PRESCALE_1024) });
}

pub struct Board<'a> {
    dp: &'a Peripherals,
}

impl<'a> Board<'a> {
    pub fn new(dp: &'a Peripherals) -> Self {
        Self { dp }
    }
}

impl Platform for Board<'_> {
    fn reset_counter(&mut self) {
        let tc1 = &self.dp.TC1;
        tc1.tcnt1.write(|w| unsafe { w.bits(0) });
        // TOV1 is cleared by writing a one
        tc1.tifr1.write(|w| w.tov1().set_bit());
    }

    fn counter(&self) -> u16 {
        self.dp.TC1.tcnt1.read().bits()
    }

    fn counter_overflowed(&self) -> bool {
        self.dp.TC1.tifr1.read().tov1().bit_is_set()
    }

    fn signal_bootloader_and_reset(&mut self) -> ! {
        avr_device::interrupt::disable();

        unsafe { core::ptr::write_volatile(BOOT_KEY_ADDRESS as *mut u16, BOOT_KEY) };

        // Timed sequence: enable changes, then watchdog reset at the
        // shortest timeout (16 ms).
        let wdt = &self.dp.WDT;
        wdt.wdtcsr.write(|w| unsafe { w.bits(WDCE | WDE) });
        wdt.wdtcsr.write(|w| unsafe { w.bits(WDE) });

        loop {}
    }
}
