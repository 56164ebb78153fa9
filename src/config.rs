//! # Configuration
//!
//! Compile-time constants governing the scheduler. All limits are fixed at
//! compile time — the kernel performs no dynamic allocation, ever.

/// Maximum number of tasks the pool can hold simultaneously.
/// Bounds the static TCB arena. Increase with care — each task carries
/// `STACK_SIZE` bytes of RAM. Must not exceed 32 (the timer wheel stores
/// task sets as `u32` bitmasks).
pub const MAX_TASKS: usize = 8;

/// SysTick frequency in Hz. Determines tick granularity: at 1 kHz one tick
/// is one millisecond, so `sleep(400)` parks a task for 400 ms.
pub const TICK_HZ: u32 = 1000;

/// Per-task stack size in bytes. Must cover the deepest call chain plus the
/// hardware exception frame (32 bytes) and the software-saved context
/// (32 bytes for R4–R11), plus the guard words at the stack base.
pub const STACK_SIZE: usize = 1024;

/// Stack size for the idle context, which only spins on WFI.
pub const IDLE_STACK_SIZE: usize = 256;

/// Number of guard words written at the base (lowest addresses) of every
/// task stack. The scheduler checks them on each tick and context switch;
/// a clobbered word means the stack overflowed.
pub const STACK_GUARD_WORDS: usize = 2;

/// Pattern stored in each guard word.
pub const STACK_GUARD_PATTERN: u32 = 0xDEAD_C0DE;

/// Number of timer-wheel buckets. Must be a power of two so the bucket
/// index `wake_tick % WHEEL_SLOTS` reduces to a mask. Sleeps longer than
/// one revolution are legal; the task stays bucketed until its revolution.
pub const WHEEL_SLOTS: usize = 64;

/// Longest accepted sleep, in ticks. Half the tick range: beyond this,
/// wrapping tick differences can no longer distinguish past from future.
pub const MAX_SLEEP_TICKS: u32 = u32::MAX / 2;

/// System clock frequency in Hz (STM32F4 on the 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

const _: () = assert!(MAX_TASKS <= 32, "wheel bitmasks are u32");
const _: () = assert!(WHEEL_SLOTS.is_power_of_two());
