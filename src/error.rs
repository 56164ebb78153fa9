//! # Error Taxonomy
//!
//! Every fallible kernel operation returns [`KernelError`]. Capacity errors
//! (`QueueFull`, `OutOfTasks`) are surfaced to the caller, who decides
//! whether to retry; programming errors (`InvalidDuration`,
//! `IllegalContextCall`) are surfaced synchronously and never retried.
//! Per-task faults detected asynchronously are delivered as a [`FaultKind`]
//! through the fault hook registered at init, and are fatal only to the
//! offending task.

use core::fmt;

/// Errors returned synchronously by kernel operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KernelError {
    /// Sleep duration exceeds the representable horizon
    /// ([`MAX_SLEEP_TICKS`](crate::config::MAX_SLEEP_TICKS)).
    InvalidDuration,
    /// The ready queue is at capacity. Indicates misconfiguration: the
    /// queue should be sized to hold every task in the pool.
    QueueFull,
    /// The task pool has no free slot.
    OutOfTasks,
    /// A task's stack guard words were clobbered.
    StackFault,
    /// The operation requires a running task context (or, for priority
    /// changes, requires the target *not* to be running).
    IllegalContextCall,
}

impl KernelError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            KernelError::InvalidDuration => "sleep duration out of range",
            KernelError::QueueFull => "ready queue full",
            KernelError::OutOfTasks => "task pool exhausted",
            KernelError::StackFault => "stack guard corrupted",
            KernelError::IllegalContextCall => "operation illegal in this context",
        }
    }
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecoverable per-task faults, reported through the fault hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// The task overran its stack (guard words clobbered). The task is
    /// forcibly terminated; other tasks are unaffected.
    StackOverflow,
    /// A task due to wake could not be enqueued. It stays parked for one
    /// wheel revolution and the wake is retried.
    ReadyQueueOverflow,
}
