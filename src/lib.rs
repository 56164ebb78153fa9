//! # coros — a minimal cooperative task scheduler
//!
//! A small, deterministic RTOS core for ARM Cortex-M4 microcontrollers:
//! fixed-pool tasks, priority scheduling with strict FIFO tie-breaking, a
//! timer wheel for sleeps, and cooperative context switching (with an
//! optional tick-preemptive round-robin policy).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Application Tasks                      │
//! ├──────────────────────────────────────────────────────────┤
//! │                Kernel API (kernel.rs)                    │
//! │   init() · spawn() · start() · yield_now() · sleep()     │
//! ├───────────────┬─────────────────┬────────────────────────┤
//! │ Scheduler Core│  Timer Wheel    │  Ready Queue           │
//! │ scheduler.rs  │  wheel.rs       │  queue.rs              │
//! │ ─ on_tick()   │  ─ insert()     │  ─ enqueue()           │
//! │ ─ schedule()  │  ─ candidates() │  ─ dequeue()           │
//! ├───────────────┴─────────────────┴────────────────────────┤
//! │    Task Model (task.rs · pool.rs)  ·  Clock (clock.rs)   │
//! │    TCB · TaskState · free-list arena · wrapping ticks    │
//! ├──────────────────────────────────────────────────────────┤
//! │           Port (arch/cortex_m4.rs · arch/host.rs)        │
//! │      PendSV · SysTick · stack frames · idle context      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling model
//!
//! Exactly one task executes at a time. All suspension points are explicit
//! — `yield_now`, `sleep`, `block`, or returning from the entry function —
//! and the scheduler core is the only code that performs context switches.
//! Among equal-priority tasks dispatch is strict FIFO; tasks woken at the
//! same tick are requeued in ascending task-ID order. Under the
//! `TickPreemptive` policy the running task is additionally demoted at tick
//! boundaries when an equal- or higher-priority task is ready.
//!
//! ## Memory model
//!
//! - No heap, no `alloc`: every structure is statically sized
//! - Fixed TCB arena with an explicit free list; slots are reused after
//!   termination
//! - Per-task inline stacks with guard words; a clobbered guard terminates
//!   only the offending task and reports through the fault hook
//! - Shared state is mutated under `cortex_m::interrupt::free` critical
//!   sections or from ISRs serialized by priority

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod clock;
pub mod config;
pub mod error;
pub mod kernel;
pub mod pool;
pub mod queue;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod wheel;
