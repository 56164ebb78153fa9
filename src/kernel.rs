//! # Kernel
//!
//! The process-wide scheduler handle and the public API embedders call:
//! peripheral drivers, logging, or a scripting front-end spawn tasks and
//! sleep/yield through these functions; the kernel knows nothing about
//! what a task's body actually does.
//!
//! ## Startup sequence
//!
//! ```text
//! reset handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init(policy)       ← scheduler + ISR pointer
//!         ├─► kernel::set_fault_hook()   ← optional, once
//!         ├─► kernel::spawn(entry, prio) ← register tasks (×N)
//!         └─► kernel::start(cp)          ← SysTick on, first task launched
//! ```
//!
//! All thread-mode mutation of the scheduler happens inside critical
//! sections; ISR-mode access (SysTick, PendSV) is serialized by interrupt
//! priority.

use crate::error::KernelError;
use crate::scheduler::{FaultHook, PreemptPolicy, Scheduler};
use crate::sync;
use crate::task::{TaskEntry, TaskId};

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// The scheduler. Accessed through `SCHEDULER_PTR`, set during `init()`.
static mut SCHEDULER: Scheduler = Scheduler::new(PreemptPolicy::Cooperative);

/// Raw pointer to the scheduler for the port layer's exception handlers,
/// which cannot take references through the critical-section API.
///
/// # Safety
/// Written once during `init()`, before interrupts are live; read from ISR
/// context afterwards.
#[no_mangle]
pub static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the kernel with the chosen preemption policy. Must be called
/// exactly once, from the main thread, before any other kernel function.
pub fn init(policy: PreemptPolicy) {
    unsafe {
        let ptr = core::ptr::addr_of_mut!(SCHEDULER);
        ptr.write(Scheduler::new(policy));
        SCHEDULER_PTR = ptr;
    }
}

/// Register the process-wide fault hook, invoked with `(task_id, kind)`
/// when a task dies of a stack fault or a wake cannot be delivered.
/// Call once, after `init` and before `start`.
pub fn set_fault_hook(hook: FaultHook) {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).set_fault_hook(hook) })
}

/// Create a task and make it Ready.
///
/// # Errors
/// `OutOfTasks` when the fixed pool is exhausted, `QueueFull` if the ready
/// queue cannot take the task. Existing tasks are unaffected either way;
/// the caller decides whether to retry later.
pub fn spawn(entry: TaskEntry, priority: u8) -> Result<TaskId, KernelError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).spawn(entry, priority) })
}

/// Current value of the kernel's tick counter. Wraps; compare ticks only
/// by wrapping difference.
pub fn current_tick() -> u32 {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).current_tick() })
}

/// Voluntarily give up the CPU. The calling task goes to the back of its
/// priority level and the next ready task is dispatched.
pub fn yield_now() -> Result<(), KernelError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).yield_current() })?;
    crate::arch::port::trigger_context_switch();
    Ok(())
}

/// Sleep for `duration_ticks`. The task does not resume before the wheel
/// wakes it; a duration of 0 defers to the next tick boundary.
pub fn sleep(duration_ticks: u32) -> Result<(), KernelError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).sleep_current(duration_ticks) })?;
    crate::arch::port::trigger_context_switch();
    Ok(())
}

/// Block the calling task until some collaborator calls [`unblock`].
pub fn block() -> Result<(), KernelError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).block_current() })?;
    crate::arch::port::trigger_context_switch();
    Ok(())
}

/// Wake a Blocked task. Returns whether a wake happened; waking a task
/// that is not Blocked is a benign no-op.
pub fn unblock(id: TaskId) -> Result<bool, KernelError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).unblock(id) })
}

/// Terminate the calling task. Its slot is reaped for reuse. The function
/// only returns an error when called outside task context; on success the
/// task ceases to exist at the next switch.
pub fn exit() -> Result<(), KernelError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).terminate_current() })?;
    crate::arch::port::trigger_context_switch();
    Ok(())
}

/// Change another task's priority. Rejected while the target is Running.
pub fn set_priority(id: TaskId, priority: u8) -> Result<(), KernelError> {
    sync::critical_section(|_cs| unsafe { (*SCHEDULER_PTR).set_priority(id, priority) })
}

/// Start scheduling. **Does not return.**
///
/// Configures SysTick as the tick source, drops PendSV/SysTick to the
/// lowest interrupt priority, prepares the idle context, and launches the
/// highest-priority ready task. With no tasks spawned the system parks in
/// WFI forever.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    use crate::arch::cortex_m4;

    cortex_m4::configure_systick(&mut core_peripherals.SYST);
    cortex_m4::set_interrupt_priorities();
    cortex_m4::init_idle_context();

    let first_sp = sync::critical_section(|_cs| unsafe {
        let scheduler = &mut *SCHEDULER_PTR;
        match scheduler.schedule() {
            Some(first) => Some(scheduler.pool.get(first).stack_pointer as *const u32),
            None => None,
        }
    });

    match first_sp {
        Some(sp) => unsafe { cortex_m4::start_first_task(sp) },
        None => loop {
            cortex_m::asm::wfi();
        },
    }
}
