//! # Task Pool
//!
//! Fixed arena of Task Control Blocks with an explicit free list. Slots are
//! handed out by [`TaskPool::alloc`], reclaimed by [`TaskPool::release`],
//! and reused by later allocations — no heap, and no allocation inside
//! interrupt-masked sections.

use crate::config::MAX_TASKS;
use crate::error::KernelError;
use crate::task::{TaskControlBlock, TaskId};

/// Arena of `MAX_TASKS` TCBs plus a stack-style free list.
pub struct TaskPool {
    tasks: [TaskControlBlock; MAX_TASKS],
    /// Free slot IDs; the top of the stack is the next ID handed out.
    free: [TaskId; MAX_TASKS],
    free_len: usize,
}

impl TaskPool {
    /// A pool with every slot free. Lowest IDs are allocated first.
    pub const fn new() -> Self {
        let mut free = [0; MAX_TASKS];
        let mut i = 0;
        while i < MAX_TASKS {
            free[i] = MAX_TASKS - 1 - i;
            i += 1;
        }
        Self {
            tasks: [TaskControlBlock::EMPTY; MAX_TASKS],
            free,
            free_len: MAX_TASKS,
        }
    }

    /// Take a free slot. The slot's TCB still holds stale contents; the
    /// caller must `init` it before use.
    pub fn alloc(&mut self) -> Result<TaskId, KernelError> {
        if self.free_len == 0 {
            return Err(KernelError::OutOfTasks);
        }
        self.free_len -= 1;
        Ok(self.free[self.free_len])
    }

    /// Return a slot to the free list and reap its TCB. The most recently
    /// released slot is the next one allocated.
    pub fn release(&mut self, id: TaskId) {
        debug_assert!(self.free_len < MAX_TASKS);
        debug_assert!(!self.free[..self.free_len].contains(&id));
        self.tasks[id].reap();
        self.free[self.free_len] = id;
        self.free_len += 1;
    }

    /// Number of allocated slots.
    pub fn allocated(&self) -> usize {
        MAX_TASKS - self.free_len
    }

    #[inline]
    pub fn get(&self, id: TaskId) -> &TaskControlBlock {
        &self.tasks[id]
    }

    #[inline]
    pub fn get_mut(&mut self, id: TaskId) -> &mut TaskControlBlock {
        &mut self.tasks[id]
    }

    /// Check a task's stack guard, surfacing corruption as `StackFault`.
    pub fn check_stack_guard(&self, id: TaskId) -> Result<(), KernelError> {
        if self.tasks[id].stack_guard_intact() {
            Ok(())
        } else {
            Err(KernelError::StackFault)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskState;

    extern "C" fn dummy_entry() {}

    #[test]
    fn test_alloc_hands_out_ascending_ids() {
        let mut pool = TaskPool::new();
        assert_eq!(pool.alloc(), Ok(0));
        assert_eq!(pool.alloc(), Ok(1));
        assert_eq!(pool.alloc(), Ok(2));
        assert_eq!(pool.allocated(), 3);
    }

    #[test]
    fn test_exhaustion_returns_out_of_tasks() {
        let mut pool = TaskPool::new();
        for _ in 0..MAX_TASKS {
            pool.alloc().unwrap();
        }
        assert_eq!(pool.alloc(), Err(KernelError::OutOfTasks));
    }

    #[test]
    fn test_released_slot_is_reused() {
        let mut pool = TaskPool::new();
        for _ in 0..MAX_TASKS {
            pool.alloc().unwrap();
        }
        let id = 4;
        pool.get_mut(id).init(id, dummy_entry, 1);
        pool.release(id);
        assert_eq!(pool.get(id).state, TaskState::Terminated);
        assert!(pool.get(id).entry.is_none());
        assert_eq!(pool.alloc(), Ok(id));
    }

    #[test]
    fn test_guard_check_surfaces_stack_fault() {
        let mut pool = TaskPool::new();
        let id = pool.alloc().unwrap();
        pool.get_mut(id).init(id, dummy_entry, 1);
        assert_eq!(pool.check_stack_guard(id), Ok(()));
        pool.get_mut(id).stack.0[0] = 0;
        assert_eq!(pool.check_stack_guard(id), Err(KernelError::StackFault));
    }
}
