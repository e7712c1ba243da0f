//! Per-priority ready lists.
//!
//! One queue per priority level `0..=max_priority`, holding only tasks that
//! wait for a core. Every entry carries a dispatch stamp taken from a
//! monotonic clock and each queue stays sorted by stamp, oldest first.
//! [`ReadyLists::append`] takes a fresh stamp, so plain appends are FIFO.
//! A task that loses its core goes back in under the stamp it was
//! dispatched with ([`ReadyLists::requeue`]), behind every task that has
//! been waiting since then.
//!
//! Together with the stamps of the running tasks of the same level, the
//! lists form one ring per level. Picking a task for a core restamps it,
//! which moves it from the head of that ring to the tail.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use coreslice_abi::task::TaskHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadyEntry {
    pub stamp: u64,
    pub task: TaskHandle,
}

#[derive(Default)]
struct ReadyQueue {
    entries: VecDeque<ReadyEntry>,
}

impl ReadyQueue {
    fn contains(&self, task: TaskHandle) -> bool {
        self.entries.iter().any(|e| e.task == task)
    }

    /// Ordered insert; equal stamps keep arrival order.
    fn insert(&mut self, entry: ReadyEntry) -> bool {
        if self.contains(entry.task) {
            return false;
        }
        let idx = self
            .entries
            .iter()
            .rposition(|e| e.stamp <= entry.stamp)
            .map_or(0, |i| i + 1);
        self.entries.insert(idx, entry);
        true
    }

    fn remove(&mut self, task: TaskHandle) -> bool {
        match self.entries.iter().position(|e| e.task == task) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }
}

pub struct ReadyLists {
    queues: Vec<ReadyQueue>,
    clock: u64,
}

impl ReadyLists {
    pub fn new(levels: usize) -> Self {
        let mut queues = Vec::with_capacity(levels);
        queues.resize_with(levels, ReadyQueue::default);
        Self { queues, clock: 0 }
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.queues.len()
    }

    #[inline]
    fn queue(&self, priority: u8) -> Option<&ReadyQueue> {
        self.queues.get(priority as usize)
    }

    #[inline]
    fn queue_mut(&mut self, priority: u8) -> Option<&mut ReadyQueue> {
        self.queues.get_mut(priority as usize)
    }

    /// Next value of the stamp clock. Stamps start at 1.
    pub fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Append to the tail under a fresh stamp and return it. `None` if the
    /// task was already queued or the level does not exist.
    pub fn append(&mut self, priority: u8, task: TaskHandle) -> Option<u64> {
        if self.queue(priority)?.contains(task) {
            return None;
        }
        let stamp = self.next_stamp();
        let queue = self.queue_mut(priority)?;
        queue.entries.push_back(ReadyEntry { stamp, task });
        Some(stamp)
    }

    /// Put a task back under an existing stamp, in stamp order.
    pub fn requeue(&mut self, priority: u8, task: TaskHandle, stamp: u64) -> bool {
        self.queue_mut(priority)
            .is_some_and(|q| q.insert(ReadyEntry { stamp, task }))
    }

    pub fn peek(&self, priority: u8) -> Option<ReadyEntry> {
        self.queue(priority)?.entries.front().copied()
    }

    pub fn head(&self, priority: u8) -> Option<TaskHandle> {
        self.peek(priority).map(|e| e.task)
    }

    pub fn remove(&mut self, priority: u8, task: TaskHandle) -> bool {
        self.queue_mut(priority).is_some_and(|q| q.remove(task))
    }

    pub fn len(&self, priority: u8) -> usize {
        self.queue(priority).map_or(0, |q| q.entries.len())
    }

    pub fn total_len(&self) -> usize {
        self.queues.iter().map(|q| q.entries.len()).sum()
    }

    /// Entries at `priority` in list order.
    pub fn entries(&self, priority: u8) -> impl Iterator<Item = ReadyEntry> + '_ {
        self.queue(priority)
            .into_iter()
            .flat_map(|q| q.entries.iter().copied())
    }

    /// Tasks at `priority` in list order.
    pub fn iter(&self, priority: u8) -> impl Iterator<Item = TaskHandle> + '_ {
        self.entries(priority).map(|e| e.task)
    }

    /// Highest non-empty level.
    pub fn highest_ready(&self) -> Option<u8> {
        self.queues
            .iter()
            .rposition(|q| !q.entries.is_empty())
            .map(|p| p as u8)
    }

    pub fn clear(&mut self) {
        for q in &mut self.queues {
            q.entries.clear();
        }
        self.clock = 0;
    }
}
