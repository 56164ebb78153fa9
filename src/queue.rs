//! # Ready Queue
//!
//! Deterministic selection of the next task to run. The queue is a fixed
//! array kept ordered by (priority descending, insertion order ascending):
//! ties within a priority level are strict FIFO, so equal-priority tasks
//! never starve each other given fair yielding.
//!
//! Capacity is a const parameter. The scheduler sizes it to the whole task
//! pool, which makes overflow in the wake path impossible by construction;
//! `enqueue` on a full queue still fails loudly with `QueueFull` rather than
//! dropping a task.

use crate::error::KernelError;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy)]
struct Entry {
    task: TaskId,
    priority: u8,
}

impl Entry {
    const EMPTY: Self = Self { task: 0, priority: 0 };
}

/// Fixed-capacity priority queue of Ready task IDs.
pub struct ReadyQueue<const N: usize> {
    entries: [Entry; N],
    len: usize,
}

impl<const N: usize> ReadyQueue<N> {
    pub const fn new() -> Self {
        Self {
            entries: [Entry::EMPTY; N],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.entries[..self.len].iter().any(|e| e.task == task)
    }

    /// Insert ordered by (priority descending, FIFO within priority).
    ///
    /// On `QueueFull` the queue is untouched: subsequent dequeues still
    /// return the previously enqueued tasks in order.
    pub fn enqueue(&mut self, task: TaskId, priority: u8) -> Result<(), KernelError> {
        if self.len == N {
            return Err(KernelError::QueueFull);
        }
        debug_assert!(!self.contains(task), "task already in ready queue");

        // First slot whose priority is strictly lower; equal priorities
        // stay in front, which gives FIFO among equals.
        let mut pos = self.len;
        for i in 0..self.len {
            if self.entries[i].priority < priority {
                pos = i;
                break;
            }
        }
        let mut i = self.len;
        while i > pos {
            self.entries[i] = self.entries[i - 1];
            i -= 1;
        }
        self.entries[pos] = Entry { task, priority };
        self.len += 1;
        Ok(())
    }

    /// Remove and return the highest-priority, earliest-inserted task.
    /// `None` signals idle.
    pub fn dequeue(&mut self) -> Option<TaskId> {
        if self.len == 0 {
            return None;
        }
        let head = self.entries[0].task;
        for i in 1..self.len {
            self.entries[i - 1] = self.entries[i];
        }
        self.len -= 1;
        Some(head)
    }

    /// Priority of the task at the head of the queue, if any.
    pub fn peek_priority(&self) -> Option<u8> {
        if self.len == 0 {
            None
        } else {
            Some(self.entries[0].priority)
        }
    }

    /// Remove a specific task (used when re-prioritizing a Ready task).
    /// Returns whether it was present.
    pub fn remove(&mut self, task: TaskId) -> bool {
        let Some(pos) = self.entries[..self.len].iter().position(|e| e.task == task) else {
            return false;
        };
        for i in pos + 1..self.len {
            self.entries[i - 1] = self.entries[i];
        }
        self.len -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        let mut q: ReadyQueue<8> = ReadyQueue::new();
        q.enqueue(0, 1).unwrap();
        q.enqueue(1, 5).unwrap();
        q.enqueue(2, 3).unwrap();
        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(q.dequeue(), Some(0));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn test_fifo_within_equal_priority() {
        let mut q: ReadyQueue<8> = ReadyQueue::new();
        q.enqueue(1, 4).unwrap();
        q.enqueue(2, 4).unwrap();
        q.enqueue(3, 4).unwrap();
        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(q.dequeue(), Some(3));
    }

    #[test]
    fn test_higher_priority_bypasses_equal_fifo() {
        let mut q: ReadyQueue<8> = ReadyQueue::new();
        q.enqueue(1, 4).unwrap();
        q.enqueue(2, 4).unwrap();
        q.enqueue(3, 9).unwrap();
        assert_eq!(q.dequeue(), Some(3));
        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(2));
    }

    #[test]
    fn test_queue_full_preserves_contents() {
        let mut q: ReadyQueue<2> = ReadyQueue::new();
        q.enqueue(0, 2).unwrap();
        q.enqueue(1, 7).unwrap();
        assert_eq!(q.enqueue(2, 9), Err(KernelError::QueueFull));
        // Prior contents and their order are intact.
        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(0));
        assert_eq!(q.dequeue(), None);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut q: ReadyQueue<8> = ReadyQueue::new();
        q.enqueue(0, 3).unwrap();
        q.enqueue(1, 3).unwrap();
        q.enqueue(2, 3).unwrap();
        assert!(q.remove(1));
        assert!(!q.remove(1));
        assert_eq!(q.dequeue(), Some(0));
        assert_eq!(q.dequeue(), Some(2));
    }

    #[test]
    fn test_peek_priority() {
        let mut q: ReadyQueue<4> = ReadyQueue::new();
        assert_eq!(q.peek_priority(), None);
        q.enqueue(0, 2).unwrap();
        q.enqueue(1, 6).unwrap();
        assert_eq!(q.peek_priority(), Some(6));
    }
}
