//! Host stand-in for the port layer. No context switching happens on the
//! host; unit tests drive `Scheduler::schedule` and `Scheduler::on_tick`
//! directly and observe the resulting state transitions.

use crate::task::TaskControlBlock;

/// No stack frame to build on the host.
pub fn init_stack(_tcb: &mut TaskControlBlock) {}

/// No PendSV on the host.
#[inline]
pub fn trigger_context_switch() {}
