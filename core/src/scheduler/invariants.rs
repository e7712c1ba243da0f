//! Structural checks over the core table, ready lists and task table.
//!
//! Run after every scheduler call when `STRICT_INVARIANTS` is enabled and
//! on demand through `Scheduler::check_invariants`.

use alloc::vec::Vec;

use coreslice_abi::task::{TaskHandle, TaskStatus};

use super::error::InvariantFault;
use super::per_cpu::CoreTable;
use super::ready_queue::ReadyLists;
use super::task::TaskTable;

pub fn check_all(
    cores: &CoreTable,
    ready: &ReadyLists,
    tasks: &TaskTable,
) -> Result<(), InvariantFault> {
    check_core_table(cores, tasks)?;
    check_ready_lists(ready, tasks)?;
    check_priority_order(cores, ready, tasks)?;
    check_occupancy(cores, ready)?;
    Ok(())
}

/// Every occupant is live, running on that core, and occupies only it.
/// Every running task sits where it claims to.
fn check_core_table(cores: &CoreTable, tasks: &TaskTable) -> Result<(), InvariantFault> {
    let mut seen: Vec<TaskHandle> = Vec::with_capacity(cores.num_cores());
    for (core, task) in cores.occupied() {
        let record = tasks
            .get(task)
            .map_err(|_| InvariantFault::StaleOccupant { core })?;
        if record.status != (TaskStatus::Running { core }) {
            return Err(InvariantFault::OccupantStateMismatch { core, task });
        }
        if seen.contains(&task) {
            return Err(InvariantFault::DuplicateOccupant { task });
        }
        seen.push(task);
    }

    for record in tasks.iter() {
        if let Some(core) = record.core() {
            if cores.occupant(core) != Some(record.handle) {
                return Err(InvariantFault::AssignmentMismatch {
                    task: record.handle,
                });
            }
        }
    }
    Ok(())
}

/// Lists hold only Ready tasks at their own level, in stamp order; every
/// Ready task is listed exactly once.
fn check_ready_lists(ready: &ReadyLists, tasks: &TaskTable) -> Result<(), InvariantFault> {
    for level in 0..ready.levels() {
        let level = level as u8;
        let mut last_stamp = 0;
        for entry in ready.entries(level) {
            if entry.stamp < last_stamp {
                return Err(InvariantFault::ReadyListOrder { priority: level });
            }
            last_stamp = entry.stamp;
            let task = entry.task;
            let ok = tasks
                .get(task)
                .is_ok_and(|r| r.status.is_ready() && r.priority == level);
            if !ok {
                return Err(InvariantFault::ReadyListCorrupt {
                    priority: level,
                    task,
                });
            }
        }
    }

    for record in tasks.iter().filter(|r| r.status.is_ready()) {
        let listed = ready.iter(record.priority).filter(|&t| t == record.handle).count();
        if listed != 1 {
            return Err(InvariantFault::ReadyMembership {
                task: record.handle,
            });
        }
    }
    Ok(())
}

/// No ready task outranks a running one.
fn check_priority_order(
    cores: &CoreTable,
    ready: &ReadyLists,
    tasks: &TaskTable,
) -> Result<(), InvariantFault> {
    let Some(top_ready) = ready.highest_ready() else {
        return Ok(());
    };
    for (core, task) in cores.occupied() {
        let record = tasks
            .get(task)
            .map_err(|_| InvariantFault::StaleOccupant { core })?;
        if record.priority < top_ready {
            let waiting = ready.head(top_ready).unwrap_or(task);
            return Err(InvariantFault::PriorityInversion {
                running: task,
                ready: waiting,
            });
        }
    }
    Ok(())
}

/// No core idles while a task waits.
fn check_occupancy(cores: &CoreTable, ready: &ReadyLists) -> Result<(), InvariantFault> {
    if ready.total_len() == 0 {
        return Ok(());
    }
    match cores.empty_cores().next() {
        Some(core) => Err(InvariantFault::IdleCoreWithWork { core }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::task::TaskSpawn;

    fn idle_body() {}

    fn spawn(tasks: &mut TaskTable, priority: u8) -> TaskHandle {
        tasks
            .insert(&TaskSpawn {
                entry: idle_body,
                name: "t",
                stack_hint: 0,
                priority,
            })
            .unwrap()
    }

    #[test]
    fn consistent_state_passes() {
        let mut tasks = TaskTable::new(4);
        let mut ready = ReadyLists::new(3);
        let mut cores = CoreTable::new(1);

        let a = spawn(&mut tasks, 2);
        let b = spawn(&mut tasks, 1);
        cores.place(0, a);
        tasks.get_mut(a).unwrap().status = TaskStatus::Running { core: 0 };
        ready.append(1, b);

        assert_eq!(check_all(&cores, &ready, &tasks), Ok(()));
    }

    #[test]
    fn ready_task_outranking_runner_is_caught() {
        let mut tasks = TaskTable::new(4);
        let mut ready = ReadyLists::new(3);
        let mut cores = CoreTable::new(1);

        let low = spawn(&mut tasks, 0);
        let high = spawn(&mut tasks, 2);
        cores.place(0, low);
        tasks.get_mut(low).unwrap().status = TaskStatus::Running { core: 0 };
        ready.append(2, high);

        assert_eq!(
            check_all(&cores, &ready, &tasks),
            Err(InvariantFault::PriorityInversion {
                running: low,
                ready: high,
            })
        );
    }

    #[test]
    fn unlisted_ready_task_is_caught() {
        let mut tasks = TaskTable::new(4);
        let ready = ReadyLists::new(3);
        let cores = CoreTable::new(1);
        let a = spawn(&mut tasks, 1);

        assert_eq!(
            check_all(&cores, &ready, &tasks),
            Err(InvariantFault::ReadyMembership { task: a })
        );
    }

    #[test]
    fn idle_core_with_waiting_work_is_caught() {
        let mut tasks = TaskTable::new(4);
        let mut ready = ReadyLists::new(3);
        let cores = CoreTable::new(2);
        let a = spawn(&mut tasks, 1);
        ready.append(1, a);

        assert_eq!(
            check_all(&cores, &ready, &tasks),
            Err(InvariantFault::IdleCoreWithWork { core: 0 })
        );
    }

    #[test]
    fn occupant_with_wrong_state_is_caught() {
        let mut tasks = TaskTable::new(4);
        let ready = ReadyLists::new(3);
        let mut cores = CoreTable::new(2);
        let a = spawn(&mut tasks, 1);
        cores.place(1, a);
        tasks.get_mut(a).unwrap().status = TaskStatus::Running { core: 0 };

        assert_eq!(
            check_all(&cores, &ready, &tasks),
            Err(InvariantFault::OccupantStateMismatch { core: 1, task: a })
        );
    }
}
