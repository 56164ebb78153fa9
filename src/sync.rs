//! # Critical Sections
//!
//! Interrupt-safe access to shared kernel state. The scheduler instance is
//! mutated either from the tick/switch ISRs (serialized by interrupt
//! priority) or from thread mode inside a critical section — a single-writer
//! discipline with interrupts masked during the mutation.

use cortex_m::interrupt;

/// Run `f` with interrupts disabled, restoring them on exit.
///
/// Keep the body short: every cycle spent here adds to interrupt latency,
/// including the scheduler tick itself.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(&interrupt::CriticalSection) -> R,
{
    interrupt::free(f)
}
