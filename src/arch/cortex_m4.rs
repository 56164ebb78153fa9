//! # Cortex-M4 Port
//!
//! Hardware-specific code for ARM Cortex-M4 (Thumb-2): SysTick as the tick
//! source, PendSV for context switching, initial stack frames, and the idle
//! context.
//!
//! ## Context switch
//!
//! The Cortex-M split-stack model is used: the kernel and ISRs run on MSP,
//! tasks run on PSP. Exception entry hardware-stacks R0–R3, R12, LR, PC and
//! xPSR onto the process stack; the PendSV handler saves and restores
//! R4–R11 to complete the context.
//!
//! PendSV and SysTick both run at the lowest interrupt priority, so a
//! context switch never preempts another ISR and the switch itself is the
//! only place control moves between tasks.
//!
//! ## Idle
//!
//! When the ready queue is empty the switch lands on a dedicated idle
//! context (a WFI loop on its own small stack) rather than a pool task, so
//! the task pool holds only real tasks.

use core::arch::{asm, naked_asm};
use cortex_m::peripheral::syst::SystClkSource;

use crate::config::{IDLE_STACK_SIZE, SYSTEM_CLOCK_HZ, TICK_HZ};
use crate::task::{TaskControlBlock, TaskEntry};

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure SysTick to fire at `TICK_HZ` from the core clock. Each tick
/// runs `Scheduler::on_tick` in the handler below.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Set PendSV and SysTick to the lowest interrupt priority, so context
/// switches defer to every application ISR.
pub fn set_interrupt_priorities() {
    unsafe {
        // SHPR3: bits [23:16] = PendSV, bits [31:24] = SysTick.
        let shpr3: *mut u32 = 0xE000_ED20 as *mut u32;
        let val = core::ptr::read_volatile(shpr3) | (0xFF << 16) | (0xFF << 24);
        core::ptr::write_volatile(shpr3, val);
    }
}

// ---------------------------------------------------------------------------
// Context switch request
// ---------------------------------------------------------------------------

/// Request a context switch by pending PendSV. The switch happens once no
/// other ISR is active.
#[inline]
pub fn trigger_context_switch() {
    // ICSR, PENDSVSET = bit 28.
    const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }
}

// ---------------------------------------------------------------------------
// Stack frames
// ---------------------------------------------------------------------------

/// Pre-populate the exception frame a PendSV "return" expects, so the
/// first dispatch of a task starts executing its entry function.
///
/// Layout, top of stack down (initial PSP points at R4):
///
/// ```text
///   xPSR  (Thumb bit set)
///   PC    (entry)
///   LR    (task_return_trap — implicit terminate on return)
///   R12 R3 R2 R1 R0   (0)
///   R11 … R4          (0)   <- saved stack pointer after init
/// ```
fn build_initial_frame(stack: &mut [u8], entry: TaskEntry) -> *mut u32 {
    let stack_top = stack.as_ptr() as usize + stack.len();
    // AAPCS: 8-byte alignment.
    let aligned_top = stack_top & !0x07;
    let frame_ptr = (aligned_top - 16 * 4) as *mut u32;

    unsafe {
        // Software-saved R4–R11 and hardware-stacked R0–R3, R12.
        for i in 0..13 {
            *frame_ptr.add(i) = 0;
        }
        *frame_ptr.add(13) = task_return_trap as usize as u32; // LR
        *frame_ptr.add(14) = entry as usize as u32; // PC
        *frame_ptr.add(15) = 0x0100_0000; // xPSR, Thumb bit
    }
    frame_ptr
}

/// Build the initial frame for a freshly spawned task's stack.
pub fn init_stack(tcb: &mut TaskControlBlock) {
    if let Some(entry) = tcb.entry {
        tcb.stack_pointer = build_initial_frame(&mut tcb.stack.0, entry);
    }
}

/// Landing pad for a task entry that returns: the implicit
/// `terminate_current`. The slot is reaped and the next runnable task is
/// dispatched.
extern "C" fn task_return_trap() {
    crate::sync::critical_section(|_cs| unsafe {
        let _ = (*crate::kernel::SCHEDULER_PTR).terminate_current();
    });
    trigger_context_switch();
    loop {
        cortex_m::asm::wfi();
    }
}

// ---------------------------------------------------------------------------
// Idle context
// ---------------------------------------------------------------------------

#[repr(align(8))]
struct IdleStack([u8; IDLE_STACK_SIZE]);

static mut IDLE_STACK: IdleStack = IdleStack([0; IDLE_STACK_SIZE]);
static mut IDLE_SP: *mut u32 = core::ptr::null_mut();

/// The idle context: power down until the next interrupt.
extern "C" fn idle_entry() {
    loop {
        cortex_m::asm::wfi();
    }
}

/// Prepare the idle context's stack. Called once from `kernel::start`.
pub fn init_idle_context() {
    unsafe {
        let stack = &mut (*core::ptr::addr_of_mut!(IDLE_STACK)).0;
        IDLE_SP = build_initial_frame(stack, idle_entry);
    }
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Switch thread mode to PSP and start executing the first task.
/// Never returns.
///
/// # Safety
/// Call exactly once, from thread mode, with a stack pointer produced by
/// [`init_stack`].
pub unsafe fn start_first_task(psp: *const u32) -> ! {
    asm!(
        // Skip the software-saved R4–R11 (8 × 4 bytes).
        "adds r0, #32",
        "msr psp, r0",
        // Thread mode uses PSP from here on (CONTROL.SPSEL = 1).
        "movs r0, #2",
        "msr control, r0",
        "isb",
        // Unwind the hardware frame by hand; this is a launch, not an
        // exception return.
        "pop {{r0-r3, r12}}",
        "pop {{lr}}", // return trap
        "pop {{r4}}", // entry point
        "pop {{r5}}", // xPSR, rebuilt by the core
        "cpsie i",
        "bx r4",
        in("r0") psp,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception: the context switch itself.
///
/// 1. Push R4–R11 onto the outgoing context's stack (PSP)
/// 2. Record the resulting PSP in the outgoing TCB (or the idle slot)
/// 3. Run the scheduler to pick the incoming context
/// 4. Pop R4–R11 from the incoming stack and return; exception return
///    restores the hardware-stacked half
#[unsafe(naked)]
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "bl {save_context}",
        "bl {pick_next}",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        // Exception return to thread mode on PSP.
        "ldr r0, =0xFFFFFFFD",
        "bx r0",
        save_context = sym save_outgoing_context,
        pick_next = sym pick_next_context,
    );
}

/// Store the outgoing context's PSP. Called from PendSV with the saved
/// frame's address in `psp`.
///
/// When the outgoing task terminated, `current` is already `None` and the
/// frame sits on a reaped stack; the discard flag distinguishes that case
/// from a genuine switch out of idle, whose frame must not be overwritten
/// with a dead task's.
#[no_mangle]
unsafe extern "C" fn save_outgoing_context(psp: *mut u32) {
    let scheduler = &mut *crate::kernel::SCHEDULER_PTR;
    if scheduler.take_discard_outgoing() {
        return;
    }
    match scheduler.current_task() {
        Some(id) => scheduler.pool.get_mut(id).stack_pointer = psp,
        None => IDLE_SP = psp,
    }
}

/// Run the dispatch decision and hand PendSV the incoming PSP.
#[no_mangle]
unsafe extern "C" fn pick_next_context() -> *mut u32 {
    let scheduler = &mut *crate::kernel::SCHEDULER_PTR;
    match scheduler.schedule() {
        Some(id) => scheduler.pool.get(id).stack_pointer,
        None => IDLE_SP,
    }
}

// ---------------------------------------------------------------------------
// SysTick handler (tick source)
// ---------------------------------------------------------------------------

/// SysTick exception: the hardware timer binding. Advances the kernel's
/// time base and requests a switch when the tick made one necessary.
#[no_mangle]
#[allow(non_snake_case)]
pub unsafe extern "C" fn SysTick() {
    let scheduler = &mut *crate::kernel::SCHEDULER_PTR;
    scheduler.on_tick();

    if scheduler.needs_reschedule {
        trigger_context_switch();
    }
}
