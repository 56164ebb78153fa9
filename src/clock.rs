//! # Tick Clock
//!
//! The kernel's sole time base: a `u32` counter incremented exactly once per
//! SysTick interrupt. The counter wraps; callers must compare ticks only
//! through [`ticks_between`], never by absolute ordering. With a 1 kHz tick
//! a full revolution takes ~49.7 days, and wrapping differences stay
//! unambiguous for horizons up to half that range.

/// Monotonic (modulo wrap) tick counter.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    ticks: u32,
}

impl TickClock {
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Current tick count.
    #[inline]
    pub fn now(&self) -> u32 {
        self.ticks
    }

    /// Advance by one tick and return the new count. Called exclusively
    /// from the tick interrupt.
    #[inline]
    pub fn advance(&mut self) -> u32 {
        self.ticks = self.ticks.wrapping_add(1);
        self.ticks
    }
}

/// Wrapping distance from `from` to `to`, in ticks.
///
/// Valid for horizons up to half the tick range; beyond that a "future"
/// tick is indistinguishable from a distant past one.
#[inline]
pub fn ticks_between(from: u32, to: u32) -> u32 {
    to.wrapping_sub(from)
}
