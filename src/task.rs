//! # Task Control Block
//!
//! The task model. Each task is described by a [`TaskControlBlock`] holding
//! its scheduling state, priority, wake deadline, entry point, and an inline
//! stack with guard words at its base. TCBs live in a fixed arena
//! ([`crate::pool::TaskPool`]) — no heap, no `alloc`.

use crate::config::{STACK_GUARD_PATTERN, STACK_GUARD_WORDS, STACK_SIZE};

/// Task identifier: the task's slot index in the pool. Small, `Copy`, and
/// reusable after the task terminates and its slot is reaped.
pub type TaskId = usize;

/// A task's entry point. Runs in the scheduler's context and must
/// eventually yield, sleep, block, or return — returning is an implicit
/// `terminate_current`. A task that never suspends starves every equal-
/// and lower-priority task (documented hazard, not prevented).
///
/// This is the single-method "runnable" capability: different tasks are
/// simply different function pointers satisfying this contract.
pub type TaskEntry = extern "C" fn();

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// ```text
///              spawn()            schedule()
///      (free) ───────► Ready ◄──────────────► Running
///                        ▲                    │  │  │
///            wheel wakes │   sleep_current()  │  │  │ terminate_current()
///                        ├────────◄───────────┘  │  ▼
///                        │        Sleeping       │ Terminated (absorbing,
///                        │                       │  slot reaped)
///                        │       block_current() │
///                        └────────◄──────────────┘
///                          unblock()   Blocked
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    /// Runnable; present in the ready queue, waiting for dispatch.
    Ready,
    /// Currently executing. At most one task is Running at any instant.
    Running,
    /// Parked in the timer wheel until `wake_tick`.
    Sleeping,
    /// Waiting for an explicit `unblock` from a collaborator.
    Blocked,
    /// Finished. Absorbing: no transition leaves this state. The slot is
    /// returned to the free list and may be reused by a later spawn.
    Terminated,
}

// ---------------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------------

/// Per-task stack memory, aligned to 8 bytes as required by the ARM AAPCS.
/// The lowest `STACK_GUARD_WORDS` words hold the guard pattern; the stack
/// grows down toward them.
#[repr(align(8))]
pub struct TaskStack(pub [u8; STACK_SIZE]);

impl TaskStack {
    pub const fn zeroed() -> Self {
        Self([0u8; STACK_SIZE])
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Task Control Block (TCB) — everything the scheduler knows about a task.
///
/// TCBs are stored inline in the pool's static array. The `stack_pointer`
/// field points into `self.stack` and is updated on every context switch;
/// it is the saved execution context restored when the task is dispatched.
pub struct TaskControlBlock {
    /// Slot index in the pool. Assigned at spawn, immutable while allocated.
    pub id: TaskId,

    /// Current execution state.
    pub state: TaskState,

    /// Scheduling priority, higher = more urgent. May be changed only while
    /// the task is not Running.
    pub priority: u8,

    /// Absolute tick at which a Sleeping task becomes Ready. Meaningful
    /// only while `state == Sleeping`.
    pub wake_tick: u32,

    /// Entry function, invoked once at first dispatch. `None` on free slots.
    pub entry: Option<TaskEntry>,

    /// Saved process stack pointer. Points into `self.stack`.
    pub stack_pointer: *mut u32,

    /// Inline stack memory with guard words at its base.
    pub stack: TaskStack,
}

// Safety: the raw stack_pointer always points into the TCB's own stack
// array, and TCBs are only touched inside critical sections or from ISR
// context where interrupts are serialized by priority.
unsafe impl Send for TaskControlBlock {}
unsafe impl Sync for TaskControlBlock {}

impl TaskControlBlock {
    /// An unallocated slot. Used to initialize the static pool array.
    pub const EMPTY: Self = Self {
        id: 0,
        state: TaskState::Terminated,
        priority: 0,
        wake_tick: 0,
        entry: None,
        stack_pointer: core::ptr::null_mut(),
        stack: TaskStack::zeroed(),
    };

    /// Initialize this slot for a freshly spawned task: Ready state, guard
    /// words written. The architecture port separately builds the initial
    /// stack frame and sets `stack_pointer`.
    pub fn init(&mut self, id: TaskId, entry: TaskEntry, priority: u8) {
        self.id = id;
        self.state = TaskState::Ready;
        self.priority = priority;
        self.wake_tick = 0;
        self.entry = Some(entry);
        self.stack_pointer = core::ptr::null_mut();
        self.write_stack_guard();
    }

    /// Reap the slot after termination. Clears the entry so no dangling
    /// reference to the dead task's code survives in the pool.
    pub fn reap(&mut self) {
        self.state = TaskState::Terminated;
        self.entry = None;
        self.stack_pointer = core::ptr::null_mut();
    }

    /// Write the guard pattern into the lowest words of the stack.
    pub fn write_stack_guard(&mut self) {
        for w in 0..STACK_GUARD_WORDS {
            let bytes = STACK_GUARD_PATTERN.to_le_bytes();
            self.stack.0[w * 4..w * 4 + 4].copy_from_slice(&bytes);
        }
    }

    /// Check the guard words. `false` means the stack grew into them.
    pub fn stack_guard_intact(&self) -> bool {
        (0..STACK_GUARD_WORDS).all(|w| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(&self.stack.0[w * 4..w * 4 + 4]);
            u32::from_le_bytes(bytes) == STACK_GUARD_PATTERN
        })
    }

    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.state == TaskState::Ready
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
