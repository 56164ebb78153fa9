//! # Scheduler Core
//!
//! All task state transitions happen here, and only here. The scheduler
//! owns the task pool, the ready queue, the timer wheel, and the tick clock
//! by composition; the port layer and the kernel facade call in, but never
//! mutate those structures directly.
//!
//! ## Dispatch
//!
//! [`Scheduler::schedule`] is the single point where control transfers
//! between tasks: it dequeues the highest-priority, earliest-enqueued Ready
//! task and marks it Running (or drops to the idle context when the queue
//! is empty). Tasks are never preempted mid-instruction — suspension occurs
//! only at `yield_current` / `sleep_current` / `block_current` /
//! `terminate_current` call sites, plus tick boundaries when the
//! tick-preemptive policy is selected.
//!
//! ## Tick path
//!
//! [`Scheduler::on_tick`] runs from the SysTick handler and does the
//! minimum work: advance the clock, check the running task's stack guard,
//! wake due sleepers (ascending task ID for deterministic tie-breaking),
//! and apply the preemption policy. It never blocks.

use crate::clock::{ticks_between, TickClock};
use crate::config::{MAX_SLEEP_TICKS, MAX_TASKS};
use crate::error::{FaultKind, KernelError};
use crate::pool::TaskPool;
use crate::queue::ReadyQueue;
use crate::task::{TaskEntry, TaskId, TaskState};
use crate::wheel::{ids_ascending, TimerWheel};

/// Whether the tick interrupt may force a context switch.
///
/// Under `Cooperative`, a task runs until it voluntarily suspends; a
/// higher-priority task woken by the wheel waits for the next suspension
/// point. Under `TickPreemptive`, the running task is additionally demoted
/// at any tick boundary where an equal- or higher-priority task is ready,
/// giving round-robin time slicing at tick granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PreemptPolicy {
    Cooperative,
    TickPreemptive,
}

/// Process-wide fault hook, registered once at init. Invoked with the
/// offending task's ID; the scheduler keeps running other tasks.
pub type FaultHook = fn(TaskId, FaultKind);

/// The scheduler. Stored as a single process-wide instance in
/// [`crate::kernel`]; unit tests construct their own.
///
/// `Q` is the ready-queue capacity. The default equals the pool size, which
/// makes overflow in the wake path unreachable; an undersized queue is only
/// useful for exercising the overflow report-and-retry path.
pub struct Scheduler<const Q: usize = MAX_TASKS> {
    /// TCB arena. The port layer reads/writes saved stack pointers here.
    pub pool: TaskPool,
    ready: ReadyQueue<Q>,
    wheel: TimerWheel,
    clock: TickClock,
    current: Option<TaskId>,
    policy: PreemptPolicy,
    fault_hook: Option<FaultHook>,
    /// Set whenever a context switch should occur at the next opportunity.
    /// The port layer triggers PendSV when it sees this after a tick.
    pub needs_reschedule: bool,
    /// Set when the outgoing context belongs to a terminated task and must
    /// not be saved at the next switch (its slot is already reaped).
    discard_outgoing: bool,
}

impl<const Q: usize> Scheduler<Q> {
    pub const fn new(policy: PreemptPolicy) -> Self {
        Self {
            pool: TaskPool::new(),
            ready: ReadyQueue::new(),
            wheel: TimerWheel::new(),
            clock: TickClock::new(),
            current: None,
            policy,
            fault_hook: None,
            needs_reschedule: false,
            discard_outgoing: false,
        }
    }

    /// Register the process-wide fault hook. Call once, before `start`.
    pub fn set_fault_hook(&mut self, hook: FaultHook) {
        self.fault_hook = Some(hook);
    }

    #[inline]
    pub fn current_task(&self) -> Option<TaskId> {
        self.current
    }

    #[inline]
    pub fn current_tick(&self) -> u32 {
        self.clock.now()
    }

    /// Consume the discard flag set by [`Self::terminate_current`] and the
    /// fault path. The port layer calls this before saving the outgoing
    /// context; a `true` result means the outgoing stack belongs to a
    /// reaped task (or nothing at all) and its pointer must not be stored.
    #[inline]
    pub fn take_discard_outgoing(&mut self) -> bool {
        core::mem::take(&mut self.discard_outgoing)
    }

    // -----------------------------------------------------------------------
    // Task lifecycle
    // -----------------------------------------------------------------------

    /// Allocate and enqueue a new task.
    ///
    /// Fails with `OutOfTasks` when the pool is exhausted; existing tasks
    /// are untouched on failure.
    pub fn spawn(&mut self, entry: TaskEntry, priority: u8) -> Result<TaskId, KernelError> {
        let id = self.pool.alloc()?;
        self.pool.get_mut(id).init(id, entry, priority);
        crate::arch::port::init_stack(self.pool.get_mut(id));

        if let Err(e) = self.ready.enqueue(id, priority) {
            self.pool.release(id);
            return Err(e);
        }
        if self.current.is_none() {
            self.needs_reschedule = true;
        }
        #[cfg(feature = "defmt")]
        defmt::trace!("spawn task {} prio {}", id, priority);
        Ok(id)
    }

    /// Move the running task back to Ready and flag a reschedule.
    /// `IllegalContextCall` outside any task context.
    pub fn yield_current(&mut self) -> Result<(), KernelError> {
        let cur = self.current.ok_or(KernelError::IllegalContextCall)?;
        let prio = self.pool.get(cur).priority;
        if let Err(e) = self.ready.enqueue(cur, prio) {
            return Err(e);
        }
        self.pool.get_mut(cur).state = TaskState::Ready;
        self.needs_reschedule = true;
        Ok(())
    }

    /// Park the running task in the timer wheel for `duration_ticks`.
    ///
    /// A duration of 0 rounds up to the next tick boundary — the task is
    /// requeued by the wheel, never synchronously. Durations beyond
    /// `MAX_SLEEP_TICKS` are rejected: past that horizon, wrapping tick
    /// comparisons become ambiguous.
    pub fn sleep_current(&mut self, duration_ticks: u32) -> Result<(), KernelError> {
        let cur = self.current.ok_or(KernelError::IllegalContextCall)?;
        if duration_ticks > MAX_SLEEP_TICKS {
            return Err(KernelError::InvalidDuration);
        }
        let wake_tick = self.clock.now().wrapping_add(duration_ticks.max(1));
        let tcb = self.pool.get_mut(cur);
        tcb.state = TaskState::Sleeping;
        tcb.wake_tick = wake_tick;
        self.wheel.insert(cur, wake_tick);
        self.needs_reschedule = true;
        #[cfg(feature = "defmt")]
        defmt::trace!("task {} sleeping until tick {}", cur, wake_tick);
        Ok(())
    }

    /// Block the running task until a collaborator calls [`Self::unblock`].
    pub fn block_current(&mut self) -> Result<(), KernelError> {
        let cur = self.current.ok_or(KernelError::IllegalContextCall)?;
        self.pool.get_mut(cur).state = TaskState::Blocked;
        self.needs_reschedule = true;
        Ok(())
    }

    /// Wake a Blocked task. Returns whether a wake actually happened
    /// (`false` if the task was not Blocked — a benign no-op, so racy
    /// collaborators need no state introspection first).
    pub fn unblock(&mut self, id: TaskId) -> Result<bool, KernelError> {
        if id >= MAX_TASKS {
            return Err(KernelError::IllegalContextCall);
        }
        if self.pool.get(id).state != TaskState::Blocked {
            return Ok(false);
        }
        let prio = self.pool.get(id).priority;
        self.ready.enqueue(id, prio)?;
        self.pool.get_mut(id).state = TaskState::Ready;
        if self.current.is_none() {
            self.needs_reschedule = true;
        }
        Ok(true)
    }

    /// Terminate the running task. Absorbing: the slot is reaped and
    /// returned to the free list for reuse by a later spawn.
    pub fn terminate_current(&mut self) -> Result<(), KernelError> {
        let cur = self.current.take().ok_or(KernelError::IllegalContextCall)?;
        self.pool.release(cur);
        self.discard_outgoing = true;
        self.needs_reschedule = true;
        #[cfg(feature = "defmt")]
        defmt::trace!("task {} terminated", cur);
        Ok(())
    }

    /// Change a task's priority. Rejected while the task is Running (and
    /// on reaped slots). A Ready task is repositioned in the queue; its
    /// FIFO seniority within the new priority level restarts.
    pub fn set_priority(&mut self, id: TaskId, priority: u8) -> Result<(), KernelError> {
        if id >= MAX_TASKS {
            return Err(KernelError::IllegalContextCall);
        }
        match self.pool.get(id).state {
            TaskState::Running | TaskState::Terminated => Err(KernelError::IllegalContextCall),
            TaskState::Ready => {
                self.ready.remove(id);
                self.pool.get_mut(id).priority = priority;
                self.ready.enqueue(id, priority)
            }
            TaskState::Sleeping | TaskState::Blocked => {
                self.pool.get_mut(id).priority = priority;
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tick path (ISR context)
    // -----------------------------------------------------------------------

    /// Advance time by one tick. Called once per SysTick interrupt; does
    /// the minimum work and never blocks. Returns the new tick count.
    pub fn on_tick(&mut self) -> u32 {
        let tick = self.clock.advance();

        // Stack guard of the running task. A clobbered guard is fatal to
        // that task only; the scheduler keeps running everything else.
        if let Some(cur) = self.current {
            if self.pool.check_stack_guard(cur).is_err() {
                self.kill_current(FaultKind::StackOverflow);
            }
        }

        self.wake_due(tick);

        if self.policy == PreemptPolicy::TickPreemptive {
            if let Some(cur) = self.current {
                // Only a still-Running task is demoted. In the window between
                // a suspension call (sleep/block) and the context switch it
                // requested, `current` still names the outgoing task; requeueing
                // it here would silently cancel the suspension.
                if self.pool.get(cur).state == TaskState::Running {
                    let cur_prio = self.pool.get(cur).priority;
                    if self.ready.peek_priority().is_some_and(|p| p >= cur_prio) {
                        // Round-robin demotion at the tick boundary.
                        if self.ready.enqueue(cur, cur_prio).is_ok() {
                            self.pool.get_mut(cur).state = TaskState::Ready;
                            self.needs_reschedule = true;
                        }
                    }
                }
            }
        }

        tick
    }

    /// Wake every task whose `wake_tick` is due at `tick`, in ascending
    /// task ID order. Tasks sharing the bucket but due a later revolution
    /// stay parked. "Due" is a wrapping comparison rather than equality so
    /// a task whose wake was deferred by a full ready queue is picked up
    /// when its bucket comes around again.
    fn wake_due(&mut self, tick: u32) {
        for id in ids_ascending(self.wheel.candidates(tick)) {
            let tcb = self.pool.get(id);
            if tcb.state != TaskState::Sleeping
                || ticks_between(tcb.wake_tick, tick) > MAX_SLEEP_TICKS
            {
                continue;
            }
            let prio = tcb.priority;
            match self.ready.enqueue(id, prio) {
                Ok(()) => {
                    self.wheel.remove(id, tick);
                    self.pool.get_mut(id).state = TaskState::Ready;
                    if self.current.is_none() {
                        self.needs_reschedule = true;
                    }
                    #[cfg(feature = "defmt")]
                    defmt::trace!("task {} woke at tick {}", id, tick);
                }
                // Left in the wheel; the wake retries one revolution later.
                Err(_) => self.report_fault(id, FaultKind::ReadyQueueOverflow),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Select the next task to run. The single context-transfer point:
    /// a still-Running current task is demoted to the back of its priority
    /// level, then the queue head (if any) becomes Running. `None` means
    /// the idle context takes over until the next wake.
    pub fn schedule(&mut self) -> Option<TaskId> {
        if let Some(cur) = self.current {
            if self.pool.get(cur).state == TaskState::Running {
                let prio = self.pool.get(cur).priority;
                // Cannot fail: the queue is sized to the whole pool and
                // the running task is never already enqueued.
                let res = self.ready.enqueue(cur, prio);
                debug_assert!(res.is_ok());
                self.pool.get_mut(cur).state = TaskState::Ready;
            }
        }

        self.current = self.ready.dequeue().map(|next| {
            self.pool.get_mut(next).state = TaskState::Running;
            next
        });
        self.needs_reschedule = false;
        self.current
    }

    // -----------------------------------------------------------------------
    // Faults
    // -----------------------------------------------------------------------

    /// Forcibly terminate the running task and report the fault. The task
    /// may already have suspended itself without switching away yet, so any
    /// queue or wheel entry it holds is removed before the slot is reaped.
    fn kill_current(&mut self, kind: FaultKind) {
        if let Some(cur) = self.current.take() {
            match self.pool.get(cur).state {
                TaskState::Ready => {
                    self.ready.remove(cur);
                }
                TaskState::Sleeping => {
                    let wake_tick = self.pool.get(cur).wake_tick;
                    self.wheel.remove(cur, wake_tick);
                }
                _ => {}
            }
            self.pool.release(cur);
            self.discard_outgoing = true;
            self.needs_reschedule = true;
            self.report_fault(cur, kind);
        }
    }

    fn report_fault(&mut self, id: TaskId, kind: FaultKind) {
        #[cfg(feature = "defmt")]
        defmt::warn!("task {} fault {}", id, kind);
        if let Some(hook) = self.fault_hook {
            hook(id, kind);
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WHEEL_SLOTS;
    use core::sync::atomic::{AtomicUsize, Ordering};

    extern "C" fn dummy_entry() {}

    fn sched() -> Scheduler {
        Scheduler::new(PreemptPolicy::Cooperative)
    }

    fn running_count(s: &Scheduler) -> usize {
        (0..MAX_TASKS)
            .filter(|&i| s.pool.get(i).state == TaskState::Running)
            .count()
    }

    #[test]
    fn test_spawn_and_first_dispatch() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 3).unwrap();
        assert!(s.needs_reschedule);
        assert_eq!(s.schedule(), Some(a));
        assert_eq!(s.pool.get(a).state, TaskState::Running);
        assert!(!s.needs_reschedule);
    }

    #[test]
    fn test_at_most_one_task_running() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 2).unwrap();
        let b = s.spawn(dummy_entry, 2).unwrap();
        let c = s.spawn(dummy_entry, 7).unwrap();
        assert_eq!(running_count(&s), 0);

        // Highest priority first.
        assert_eq!(s.schedule(), Some(c));
        assert_eq!(running_count(&s), 1);

        s.sleep_current(10).unwrap();
        assert_eq!(s.schedule(), Some(a));
        assert_eq!(running_count(&s), 1);

        s.yield_current().unwrap();
        assert_eq!(s.schedule(), Some(b));
        assert_eq!(running_count(&s), 1);

        s.terminate_current().unwrap();
        assert_eq!(s.schedule(), Some(a));
        assert_eq!(running_count(&s), 1);
    }

    #[test]
    fn test_context_calls_require_running_task() {
        let mut s = sched();
        assert_eq!(s.yield_current(), Err(KernelError::IllegalContextCall));
        assert_eq!(s.sleep_current(5), Err(KernelError::IllegalContextCall));
        assert_eq!(s.block_current(), Err(KernelError::IllegalContextCall));
        assert_eq!(s.terminate_current(), Err(KernelError::IllegalContextCall));
    }

    #[test]
    fn test_sleep_wakes_exactly_on_deadline() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 1).unwrap();
        s.schedule();
        s.sleep_current(3).unwrap();
        assert_eq!(s.schedule(), None); // idle

        s.on_tick();
        s.on_tick();
        assert_eq!(s.pool.get(a).state, TaskState::Sleeping); // never earlier
        s.on_tick();
        assert_eq!(s.pool.get(a).state, TaskState::Ready);
        assert_eq!(s.pool.get(a).wake_tick, 3);
        assert!(s.needs_reschedule); // woken out of idle
        assert_eq!(s.schedule(), Some(a));
    }

    #[test]
    fn test_sleep_zero_defers_to_next_tick() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 1).unwrap();
        s.schedule();
        s.sleep_current(0).unwrap();
        // Not synchronous: still parked until the next boundary.
        assert_eq!(s.pool.get(a).state, TaskState::Sleeping);
        s.on_tick();
        assert_eq!(s.pool.get(a).state, TaskState::Ready);
    }

    #[test]
    fn test_sleep_beyond_one_wheel_revolution() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 1).unwrap();
        s.schedule();
        let d = WHEEL_SLOTS as u32 + 5;
        s.sleep_current(d).unwrap();
        s.schedule();
        for _ in 0..d - 1 {
            s.on_tick();
        }
        // The bucket was visited once already, but the revolution did not
        // match; the task must still be asleep.
        assert_eq!(s.pool.get(a).state, TaskState::Sleeping);
        s.on_tick();
        assert_eq!(s.pool.get(a).state, TaskState::Ready);
    }

    #[test]
    fn test_sleep_duration_out_of_range() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 1).unwrap();
        s.schedule();
        assert_eq!(
            s.sleep_current(MAX_SLEEP_TICKS + 1),
            Err(KernelError::InvalidDuration)
        );
        // Caller error: the task keeps running.
        assert_eq!(s.pool.get(a).state, TaskState::Running);
    }

    #[test]
    fn test_equal_priority_dispatch_is_fifo() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 4).unwrap();
        let b = s.spawn(dummy_entry, 4).unwrap();
        assert_eq!(s.schedule(), Some(a));
        s.yield_current().unwrap();
        assert_eq!(s.schedule(), Some(b));
        s.yield_current().unwrap();
        assert_eq!(s.schedule(), Some(a));
    }

    #[test]
    fn test_same_tick_wakes_ascend_by_id_within_priority() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 2).unwrap();
        let b = s.spawn(dummy_entry, 2).unwrap();
        assert!(a < b);
        // Park b first so queue order can only come from the wake order.
        assert_eq!(s.schedule(), Some(a));
        s.sleep_current(7).unwrap();
        assert_eq!(s.schedule(), Some(b));
        s.sleep_current(7).unwrap();
        s.schedule();
        for _ in 0..7 {
            s.on_tick();
        }
        assert_eq!(s.schedule(), Some(a));
        s.sleep_current(1).unwrap();
        assert_eq!(s.schedule(), Some(b));
    }

    #[test]
    fn test_priority_scenario_two_sleepers() {
        // A (prio 5) and B (prio 1) both sleep 100 ticks from tick 0;
        // both wake at tick 100 and A dispatches first.
        let mut s = sched();
        let a = s.spawn(dummy_entry, 5).unwrap();
        let b = s.spawn(dummy_entry, 1).unwrap();

        assert_eq!(s.schedule(), Some(a));
        s.sleep_current(100).unwrap();
        assert_eq!(s.schedule(), Some(b));
        s.sleep_current(100).unwrap();
        assert_eq!(s.schedule(), None);

        for _ in 0..100 {
            s.on_tick();
        }
        assert_eq!(s.current_tick(), 100);
        assert_eq!(s.pool.get(a).state, TaskState::Ready);
        assert_eq!(s.pool.get(b).state, TaskState::Ready);

        assert_eq!(s.schedule(), Some(a));
        s.sleep_current(100).unwrap();
        assert_eq!(s.schedule(), Some(b));
    }

    #[test]
    fn test_out_of_tasks_leaves_existing_tasks_unchanged() {
        let mut s = sched();
        let mut ids = [0; MAX_TASKS];
        for slot in ids.iter_mut() {
            *slot = s.spawn(dummy_entry, 3).unwrap();
        }
        s.schedule();
        let before: [TaskState; MAX_TASKS] =
            core::array::from_fn(|i| s.pool.get(i).state);

        assert_eq!(s.spawn(dummy_entry, 9), Err(KernelError::OutOfTasks));

        let after: [TaskState; MAX_TASKS] =
            core::array::from_fn(|i| s.pool.get(i).state);
        assert_eq!(before, after);
        assert_eq!(s.current_task(), Some(ids[0]));
    }

    #[test]
    fn test_terminated_slot_is_reused_and_unreferenced() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 2).unwrap();
        let b = s.spawn(dummy_entry, 2).unwrap();
        assert_eq!(s.schedule(), Some(a));
        s.terminate_current().unwrap();

        // No dangling reference to the dead task survives.
        assert!(!s.ready.contains(a));
        assert!(s.wheel.is_empty());
        assert!(s.pool.get(a).entry.is_none());

        // The slot is immediately available again.
        let c = s.spawn(dummy_entry, 1).unwrap();
        assert_eq!(c, a);
        assert_eq!(s.schedule(), Some(b));
    }

    #[test]
    fn test_block_and_unblock() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 3).unwrap();
        assert_eq!(s.schedule(), Some(a));
        s.block_current().unwrap();
        assert_eq!(s.pool.get(a).state, TaskState::Blocked);
        assert_eq!(s.schedule(), None);

        assert_eq!(s.unblock(a), Ok(true));
        assert_eq!(s.pool.get(a).state, TaskState::Ready);
        assert_eq!(s.unblock(a), Ok(false)); // benign no-op
        assert_eq!(s.schedule(), Some(a));
    }

    #[test]
    fn test_cooperative_policy_never_demotes_at_tick() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 2).unwrap();
        s.spawn(dummy_entry, 2).unwrap();
        assert_eq!(s.schedule(), Some(a));
        for _ in 0..50 {
            s.on_tick();
        }
        assert_eq!(s.pool.get(a).state, TaskState::Running);
        assert!(!s.needs_reschedule);
    }

    #[test]
    fn test_cooperative_wake_waits_for_suspension_point() {
        let mut s = sched();
        let low = s.spawn(dummy_entry, 1).unwrap();
        let high = s.spawn(dummy_entry, 9).unwrap();
        assert_eq!(s.schedule(), Some(high));
        s.sleep_current(2).unwrap();
        assert_eq!(s.schedule(), Some(low));
        s.on_tick();
        s.on_tick();
        // High-priority task is Ready, but the running task keeps the CPU
        // until it suspends.
        assert_eq!(s.pool.get(high).state, TaskState::Ready);
        assert_eq!(s.pool.get(low).state, TaskState::Running);
        assert!(!s.needs_reschedule);
        s.yield_current().unwrap();
        assert_eq!(s.schedule(), Some(high));
    }

    #[test]
    fn test_tick_preemptive_round_robin() {
        let mut s: Scheduler = Scheduler::new(PreemptPolicy::TickPreemptive);
        let a = s.spawn(dummy_entry, 4).unwrap();
        let b = s.spawn(dummy_entry, 4).unwrap();
        assert_eq!(s.schedule(), Some(a));

        s.on_tick();
        assert!(s.needs_reschedule);
        assert_eq!(s.schedule(), Some(b));

        s.on_tick();
        assert_eq!(s.schedule(), Some(a));
    }

    #[test]
    fn test_tick_preemptive_ignores_lower_priority() {
        let mut s: Scheduler = Scheduler::new(PreemptPolicy::TickPreemptive);
        let a = s.spawn(dummy_entry, 6).unwrap();
        s.spawn(dummy_entry, 2).unwrap();
        assert_eq!(s.schedule(), Some(a));
        for _ in 0..10 {
            s.on_tick();
        }
        assert_eq!(s.pool.get(a).state, TaskState::Running);
        assert!(!s.needs_reschedule);
    }

    static LAST_FAULT_TASK: AtomicUsize = AtomicUsize::new(usize::MAX);
    static LAST_FAULT_KIND: AtomicUsize = AtomicUsize::new(usize::MAX);

    fn recording_hook(id: TaskId, kind: FaultKind) {
        LAST_FAULT_TASK.store(id, Ordering::SeqCst);
        LAST_FAULT_KIND.store(kind as usize, Ordering::SeqCst);
    }

    #[test]
    fn test_stack_fault_kills_only_the_offender() {
        let mut s = sched();
        s.set_fault_hook(recording_hook);
        let a = s.spawn(dummy_entry, 5).unwrap();
        let b = s.spawn(dummy_entry, 3).unwrap();
        assert_eq!(s.schedule(), Some(a));

        // Simulate a's stack overflowing into its guard words.
        s.pool.get_mut(a).stack.0[0] = 0;
        s.on_tick();

        assert_eq!(LAST_FAULT_TASK.load(Ordering::SeqCst), a);
        assert_eq!(
            LAST_FAULT_KIND.load(Ordering::SeqCst),
            FaultKind::StackOverflow as usize
        );
        assert_eq!(s.pool.get(a).state, TaskState::Terminated);
        assert_eq!(s.current_task(), None);
        // The survivor is untouched and dispatchable.
        assert_eq!(s.pool.get(b).state, TaskState::Ready);
        assert_eq!(s.schedule(), Some(b));
    }

    #[test]
    fn test_set_priority_rules() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 2).unwrap();
        let b = s.spawn(dummy_entry, 5).unwrap();
        assert_eq!(s.schedule(), Some(b));

        // Running task: rejected.
        assert_eq!(s.set_priority(b, 1), Err(KernelError::IllegalContextCall));
        assert_eq!(s.pool.get(b).priority, 5);

        // Ready task: repositioned.
        s.set_priority(a, 9).unwrap();
        s.yield_current().unwrap();
        assert_eq!(s.schedule(), Some(a));
    }

    #[test]
    fn test_tick_preemption_does_not_cancel_pending_sleep() {
        let mut s: Scheduler = Scheduler::new(PreemptPolicy::TickPreemptive);
        let a = s.spawn(dummy_entry, 4).unwrap();
        let b = s.spawn(dummy_entry, 4).unwrap();
        assert_eq!(s.schedule(), Some(a));
        s.sleep_current(10).unwrap();

        // Tick lands before the switch the sleep requested: `current` still
        // names a, but a is no longer Running and must stay parked.
        s.on_tick();
        assert_eq!(s.pool.get(a).state, TaskState::Sleeping);
        assert_eq!(s.schedule(), Some(b));

        for _ in 0..8 {
            s.on_tick();
        }
        assert_eq!(s.pool.get(a).state, TaskState::Sleeping);
        s.on_tick();
        assert_eq!(s.pool.get(a).state, TaskState::Ready);
        assert_eq!(s.pool.get(a).wake_tick, 10);
    }

    #[test]
    fn test_terminated_context_is_discarded_at_next_switch() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 2).unwrap();
        assert_eq!(s.schedule(), Some(a));

        // Voluntary suspension: the outgoing frame must be saved.
        s.yield_current().unwrap();
        assert!(!s.take_discard_outgoing());
        assert_eq!(s.schedule(), Some(a));

        // Termination reaps the slot; the next switch must drop the frame
        // instead of storing it as the idle context.
        s.terminate_current().unwrap();
        assert!(s.take_discard_outgoing());
        assert!(!s.take_discard_outgoing()); // consumed

        // The fault path reaps too, and marks its frame the same way.
        let b = s.spawn(dummy_entry, 2).unwrap();
        assert_eq!(s.schedule(), Some(b));
        s.pool.get_mut(b).stack.0[0] = 0;
        s.on_tick();
        assert!(s.take_discard_outgoing());
    }

    #[test]
    fn test_out_of_range_ids_are_rejected() {
        let mut s = sched();
        assert_eq!(
            s.unblock(MAX_TASKS + 3),
            Err(KernelError::IllegalContextCall)
        );
        assert_eq!(
            s.set_priority(MAX_TASKS, 1),
            Err(KernelError::IllegalContextCall)
        );
    }

    static OVERFLOW_TASK: AtomicUsize = AtomicUsize::new(usize::MAX);
    static OVERFLOW_KIND: AtomicUsize = AtomicUsize::new(usize::MAX);

    fn overflow_hook(id: TaskId, kind: FaultKind) {
        OVERFLOW_TASK.store(id, Ordering::SeqCst);
        OVERFLOW_KIND.store(kind as usize, Ordering::SeqCst);
    }

    #[test]
    fn test_wake_overflow_is_reported_and_retried() {
        // Undersized ready queue: two of three simultaneous wakes fit, the
        // third stays parked and lands on the next wheel revolution.
        let mut s: Scheduler<2> = Scheduler::new(PreemptPolicy::Cooperative);
        s.set_fault_hook(overflow_hook);

        let mut ids = [0; 3];
        for slot in ids.iter_mut() {
            *slot = s.spawn(dummy_entry, 3).unwrap();
            s.schedule();
            s.sleep_current(5).unwrap();
            assert_eq!(s.schedule(), None);
        }
        let [a, b, c] = ids;

        for _ in 0..5 {
            s.on_tick();
        }
        assert_eq!(s.pool.get(a).state, TaskState::Ready);
        assert_eq!(s.pool.get(b).state, TaskState::Ready);
        assert_eq!(s.pool.get(c).state, TaskState::Sleeping);
        assert_eq!(OVERFLOW_TASK.load(Ordering::SeqCst), c);
        assert_eq!(
            OVERFLOW_KIND.load(Ordering::SeqCst),
            FaultKind::ReadyQueueOverflow as usize
        );

        // Drain the queue so the retry has room.
        assert_eq!(s.schedule(), Some(a));
        s.terminate_current().unwrap();
        assert_eq!(s.schedule(), Some(b));
        s.terminate_current().unwrap();
        assert_eq!(s.schedule(), None);

        for _ in 0..WHEEL_SLOTS - 1 {
            s.on_tick();
        }
        assert_eq!(s.pool.get(c).state, TaskState::Sleeping);
        s.on_tick();
        assert_eq!(s.pool.get(c).state, TaskState::Ready);
        assert_eq!(s.schedule(), Some(c));
    }

    #[test]
    fn test_yield_with_sole_task_redispatches_it() {
        let mut s = sched();
        let a = s.spawn(dummy_entry, 3).unwrap();
        assert_eq!(s.schedule(), Some(a));
        s.yield_current().unwrap();
        assert_eq!(s.schedule(), Some(a));
        assert_eq!(s.pool.get(a).state, TaskState::Running);
    }
}
