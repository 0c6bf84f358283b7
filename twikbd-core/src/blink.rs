//! Diagnostic LED blink sequence.
//!
//! Runs without blocking: the counter advances once per main loop pass and
//! the LED pattern changes when it hits one of the step thresholds.

/// Which of the two board LEDs are lit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LedPattern {
    Off,
    Rx,
    Tx,
    Both,
}

/// Pattern changes, keyed by loop iteration.
const STEPS: &[(u32, LedPattern)] = &[
    (1, LedPattern::Rx),
    (40_000, LedPattern::Tx),
    (80_000, LedPattern::Both),
    (120_000, LedPattern::Rx),
    (160_000, LedPattern::Tx),
];

/// Iteration at which the sequence ends and the LEDs go dark.
pub const BLINK_END: u32 = 200_000;

#[derive(Copy, Clone, Debug, Default)]
pub struct BlinkSequence {
    /// 0 while inactive.
    counter: u32,
}

impl BlinkSequence {
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Start (or restart) the sequence.
    pub fn arm(&mut self) {
        self.counter = 1;
    }

    pub fn is_active(&self) -> bool {
        self.counter != 0
    }

    /// Advance one iteration. Returns the new pattern when it changes.
    pub fn advance(&mut self) -> Option<LedPattern> {
        if self.counter == 0 {
            return None;
        }

        let current = self.counter;
        if current >= BLINK_END {
            self.counter = 0;
            return Some(LedPattern::Off);
        }
        self.counter += 1;

        STEPS
            .iter()
            .find(|&&(at, _)| at == current)
            .map(|&(_, pattern)| pattern)
    }
}
