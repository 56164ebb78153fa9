//! # Timer Wheel
//!
//! Maps sleeping tasks to wake deadlines. The wheel is an array of
//! `WHEEL_SLOTS` buckets, each a `u32` bitmask over task IDs; a task
//! sleeping until `wake_tick` sits in bucket `wake_tick % WHEEL_SLOTS`.
//! On each tick the scheduler asks for that tick's bucket and wakes the
//! members whose stored `wake_tick` actually equals the current tick —
//! tasks parked more than one revolution ahead simply stay put until their
//! revolution comes around.
//!
//! Iterating set bits from the low end yields candidates in ascending task
//! ID, which is the deterministic tie-break order for same-tick wakes.

use crate::config::WHEEL_SLOTS;
use crate::task::TaskId;

/// Bucketed set of sleeping task IDs.
pub struct TimerWheel {
    buckets: [u32; WHEEL_SLOTS],
}

impl TimerWheel {
    pub const fn new() -> Self {
        Self {
            buckets: [0; WHEEL_SLOTS],
        }
    }

    #[inline]
    const fn slot(wake_tick: u32) -> usize {
        (wake_tick as usize) & (WHEEL_SLOTS - 1)
    }

    /// Park a task in the bucket for `wake_tick`.
    pub fn insert(&mut self, task: TaskId, wake_tick: u32) {
        self.buckets[Self::slot(wake_tick)] |= 1 << task;
    }

    /// Remove a task from the bucket for `wake_tick`.
    pub fn remove(&mut self, task: TaskId, wake_tick: u32) {
        self.buckets[Self::slot(wake_tick)] &= !(1 << task);
    }

    /// Bitmask of tasks bucketed at `tick`'s slot. Candidates only: the
    /// caller must still compare each task's `wake_tick` against `tick`.
    #[inline]
    pub fn candidates(&self, tick: u32) -> u32 {
        self.buckets[Self::slot(tick)]
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|&b| b == 0)
    }
}

/// Iterate the set bits of a candidate mask in ascending task-ID order.
pub fn ids_ascending(mut mask: u32) -> impl Iterator<Item = TaskId> {
    core::iter::from_fn(move || {
        if mask == 0 {
            None
        } else {
            let id = mask.trailing_zeros() as TaskId;
            mask &= mask - 1;
            Some(id)
        }
    })
}
