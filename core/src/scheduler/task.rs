use alloc::vec::Vec;

use coreslice_abi::task::{CoreId, TaskEntry, TaskHandle, TaskName, TaskStatus};

use super::error::{InvariantFault, SchedError, SchedResult};

// =============================================================================
// Task records
// =============================================================================

/// Everything the scheduler keeps about one task.
///
/// `entry`, `name` and `stack_hint` are carried for the executor and never
/// looked at by the scheduling decisions.
#[derive(Clone, Copy, Debug)]
pub struct TaskRecord {
    pub handle: TaskHandle,
    pub priority: u8,
    pub status: TaskStatus,
    pub creation_order: u64,
    pub name: TaskName,
    pub entry: TaskEntry,
    pub stack_hint: usize,

    /// Position in the rotation of its level: taken when the task is
    /// queued or picked for a core.
    pub stamp: u64,

    pub ticks_running: u64,
    pub dispatch_count: u64,
    pub preempt_count: u64,
    pub last_core: Option<CoreId>,
}

impl TaskRecord {
    #[inline]
    pub fn core(&self) -> Option<CoreId> {
        self.status.core()
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        !matches!(self.status, TaskStatus::Deleted)
    }
}

/// Parameters for a new task.
#[derive(Clone, Copy, Debug)]
pub struct TaskSpawn<'a> {
    pub entry: TaskEntry,
    pub name: &'a str,
    pub stack_hint: usize,
    pub priority: u8,
}

#[derive(Clone, Copy, Debug)]
struct TaskSlot {
    generation: u32,
    record: Option<TaskRecord>,
}

impl TaskSlot {
    fn is_free(&self) -> bool {
        self.record.as_ref().is_none_or(|r| !r.is_live())
    }
}

// =============================================================================
// Task table
// =============================================================================

/// Fixed-capacity handle table.
///
/// Deleting a task leaves a `Deleted` record behind and bumps the slot
/// generation, so the old handle keeps failing with `HandleInvalid` even
/// after the slot is reused.
pub struct TaskTable {
    slots: Vec<TaskSlot>,
    capacity: usize,
    live: usize,
    next_order: u64,
}

impl TaskTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            live: 0,
            next_order: 0,
        }
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Allocate a Ready record for `spawn`. The caller queues it.
    pub fn insert(&mut self, spawn: &TaskSpawn<'_>) -> SchedResult<TaskHandle> {
        if self.live >= self.capacity {
            return Err(SchedError::CapacityExceeded {
                max: self.capacity,
            });
        }

        let index = match self.slots.iter().position(TaskSlot::is_free) {
            Some(index) => index,
            None => {
                self.slots.push(TaskSlot {
                    generation: 0,
                    record: None,
                });
                self.slots.len() - 1
            }
        };

        let order = self.next_order;
        self.next_order += 1;

        let slot = &mut self.slots[index];
        let handle = TaskHandle::new(index as u32, slot.generation);
        slot.record = Some(TaskRecord {
            handle,
            priority: spawn.priority,
            status: TaskStatus::Ready,
            creation_order: order,
            name: TaskName::new(spawn.name),
            entry: spawn.entry,
            stack_hint: spawn.stack_hint,
            stamp: 0,
            ticks_running: 0,
            dispatch_count: 0,
            preempt_count: 0,
            last_core: None,
        });
        self.live += 1;
        Ok(handle)
    }

    fn slot_for(&self, handle: TaskHandle) -> Option<&TaskSlot> {
        self.slots
            .get(handle.slot() as usize)
            .filter(|slot| slot.generation == handle.generation())
    }

    pub fn get(&self, handle: TaskHandle) -> SchedResult<&TaskRecord> {
        self.slot_for(handle)
            .and_then(|slot| slot.record.as_ref())
            .filter(|record| record.is_live())
            .ok_or(SchedError::HandleInvalid)
    }

    pub fn get_mut(&mut self, handle: TaskHandle) -> SchedResult<&mut TaskRecord> {
        self.slots
            .get_mut(handle.slot() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.record.as_mut())
            .filter(|record| record.is_live())
            .ok_or(SchedError::HandleInvalid)
    }

    #[inline]
    pub fn contains(&self, handle: TaskHandle) -> bool {
        self.get(handle).is_ok()
    }

    /// Mark the task Deleted and retire its handle.
    pub fn retire(&mut self, handle: TaskHandle) -> SchedResult<TaskRecord> {
        let record = self.get_mut(handle)?;
        record.status = TaskStatus::Deleted;
        let retired = *record;

        let slot = &mut self.slots[handle.slot() as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        Ok(retired)
    }

    /// Live records in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.slots
            .iter()
            .filter_map(|slot| slot.record.as_ref())
            .filter(|record| record.is_live())
    }

    /// Move a live task to `to`, returning the status it left.
    ///
    /// Deletion goes through [`TaskTable::retire`]; asking for any move the
    /// status machine forbids reports [`InvariantFault::IllegalTransition`].
    pub fn transition(&mut self, handle: TaskHandle, to: TaskStatus) -> SchedResult<TaskStatus> {
        let record = self.get_mut(handle)?;
        let from = record.status;
        if matches!(to, TaskStatus::Deleted) || !from.can_transition_to(to) {
            return Err(InvariantFault::IllegalTransition {
                task: handle,
                from,
                to,
            }
            .into());
        }
        record.status = to;
        Ok(from)
    }

    /// Drop every record. Slots stay allocated and live ones move to the
    /// next generation, so handles from before the clear stay invalid.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.record.take().is_some_and(|r| r.is_live()) {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.live = 0;
        self.next_order = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_body() {}

    fn spawn(name: &str, priority: u8) -> TaskSpawn<'_> {
        TaskSpawn {
            entry: idle_body,
            name,
            stack_hint: 0,
            priority,
        }
    }

    #[test]
    fn insert_assigns_creation_order() {
        let mut table = TaskTable::new(4);
        let a = table.insert(&spawn("a", 1)).unwrap();
        let b = table.insert(&spawn("b", 2)).unwrap();

        assert_eq!(table.get(a).unwrap().creation_order, 0);
        assert_eq!(table.get(b).unwrap().creation_order, 1);
        assert_eq!(table.get(b).unwrap().name.as_str(), "b");
        assert_eq!(table.get(a).unwrap().status, TaskStatus::Ready);
        assert_eq!(table.live_count(), 2);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut table = TaskTable::new(1);
        table.insert(&spawn("a", 1)).unwrap();
        assert_eq!(
            table.insert(&spawn("b", 1)).unwrap_err(),
            SchedError::CapacityExceeded { max: 1 }
        );
    }

    #[test]
    fn retired_handles_stay_invalid_after_reuse() {
        let mut table = TaskTable::new(1);
        let old = table.insert(&spawn("old", 1)).unwrap();
        let retired = table.retire(old).unwrap();
        assert_eq!(retired.status, TaskStatus::Deleted);
        assert_eq!(table.get(old).unwrap_err(), SchedError::HandleInvalid);
        assert_eq!(table.retire(old).unwrap_err(), SchedError::HandleInvalid);

        let new = table.insert(&spawn("new", 1)).unwrap();
        assert_eq!(new.slot(), old.slot());
        assert_ne!(new, old);
        assert!(table.contains(new));
        assert!(!table.contains(old));
        assert_eq!(table.get(new).unwrap().creation_order, 1);
    }

    #[test]
    fn never_created_handle_is_invalid() {
        let table = TaskTable::new(4);
        assert_eq!(
            table.get(TaskHandle::new(3, 0)).unwrap_err(),
            SchedError::HandleInvalid
        );
    }

    #[test]
    fn transition_follows_the_status_machine() {
        let mut table = TaskTable::new(2);
        let a = table.insert(&spawn("a", 1)).unwrap();

        assert_eq!(
            table.transition(a, TaskStatus::Running { core: 1 }),
            Ok(TaskStatus::Ready)
        );
        assert_eq!(table.transition(a, TaskStatus::Blocked), Ok(TaskStatus::Running { core: 1 }));
        assert_eq!(
            table.transition(a, TaskStatus::Running { core: 0 }),
            Err(SchedError::InternalInvariantBroken(
                InvariantFault::IllegalTransition {
                    task: a,
                    from: TaskStatus::Blocked,
                    to: TaskStatus::Running { core: 0 },
                }
            ))
        );
        assert_eq!(table.get(a).unwrap().status, TaskStatus::Blocked);
        assert!(table.transition(a, TaskStatus::Deleted).is_err());
        assert!(table.contains(a));
    }

    #[test]
    fn clear_keeps_old_handles_invalid() {
        let mut table = TaskTable::new(2);
        let a = table.insert(&spawn("a", 1)).unwrap();
        let b = table.insert(&spawn("b", 1)).unwrap();
        table.retire(b).unwrap();
        table.clear();

        assert_eq!(table.live_count(), 0);
        assert!(!table.contains(a));

        let fresh = table.insert(&spawn("fresh", 1)).unwrap();
        assert_eq!(fresh.slot(), a.slot());
        assert_ne!(fresh, a);
        assert!(!table.contains(a));
        assert_eq!(table.get(fresh).unwrap().creation_order, 0);

        let other = table.insert(&spawn("other", 1)).unwrap();
        assert_eq!(other.slot(), b.slot());
        assert_ne!(other, b);
        assert!(!table.contains(b));
    }
}
