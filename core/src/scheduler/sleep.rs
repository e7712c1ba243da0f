use alloc::vec::Vec;

use coreslice_abi::task::TaskHandle;

#[derive(Copy, Clone, Debug)]
struct SleepEntry {
    task: TaskHandle,
    wake_tick: u64,
}

/// Tasks blocked until a tick deadline.
///
/// Entries are kept in insertion order so tasks that wake on the same tick
/// are re-queued in the order they went to sleep.
#[derive(Default)]
pub struct SleepQueue {
    entries: Vec<SleepEntry>,
}

impl SleepQueue {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or move the deadline of `task`.
    pub fn upsert(&mut self, task: TaskHandle, wake_tick: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.task == task) {
            entry.wake_tick = wake_tick;
            return;
        }
        self.entries.push(SleepEntry { task, wake_tick });
    }

    pub fn remove(&mut self, task: TaskHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.task != task);
        self.entries.len() != before
    }

    pub fn contains(&self, task: TaskHandle) -> bool {
        self.entries.iter().any(|e| e.task == task)
    }

    pub fn wake_tick(&self, task: TaskHandle) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.task == task)
            .map(|e| e.wake_tick)
    }

    /// Remove and return every task whose deadline is at or before `now_tick`.
    pub fn collect_due(&mut self, now_tick: u64) -> Vec<TaskHandle> {
        let mut due = Vec::new();
        self.entries.retain(|e| {
            if tick_reached(now_tick, e.wake_tick) {
                due.push(e.task);
                false
            } else {
                true
            }
        });
        due
    }
}

#[inline]
fn tick_reached(now_tick: u64, deadline_tick: u64) -> bool {
    now_tick.wrapping_sub(deadline_tick) < (1u64 << 63)
}
