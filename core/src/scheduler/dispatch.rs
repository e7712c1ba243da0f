//! Per-core selection.
//!
//! [`pick_next`] decides what one core should run: walking priorities from
//! high to low, the first level that holds either a ready task or the
//! core's own occupant wins, and between those two the older stamp goes
//! first. [`reselect`] applies that choice and follows the chain it may
//! start: a displaced occupant is requeued under its old stamp and, if some
//! other core runs strictly lower work, that core is reselected next.
//!
//! [`offer_target`] names the core a newly runnable task should be offered
//! to. Idle cores rank below every priority; among cores of the lowest rank
//! the highest index wins, so the caller core is asked last.

use coreslice_abi::task::{CoreId, TaskHandle, TaskStatus};
use coreslice_lib::klog_debug;

use super::error::{InvariantFault, SchedResult};
use super::per_cpu::CoreTable;
use super::ready_queue::ReadyLists;
use super::task::TaskTable;

/// Which occupants a newly runnable task may displace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reach {
    /// Idle cores and strictly lower-priority work.
    Lower,
    /// Equal-priority work as well.
    Equal,
}

/// Displacement rank of `core`: its occupant's priority, or -1 when idle.
fn core_rank(cores: &CoreTable, tasks: &TaskTable, core: CoreId) -> SchedResult<i16> {
    match cores.occupant(core) {
        None => Ok(-1),
        Some(task) => tasks
            .get(task)
            .map(|r| i16::from(r.priority))
            .map_err(|_| InvariantFault::StaleOccupant { core }.into()),
    }
}

/// Lowest-ranked core with rank at most `limit`, skipping `skip`. Ties go
/// to the highest index.
fn lowest_core(
    cores: &CoreTable,
    tasks: &TaskTable,
    limit: i16,
    skip: Option<CoreId>,
) -> SchedResult<Option<CoreId>> {
    let mut best: Option<(i16, CoreId)> = None;
    for core in 0..cores.num_cores() {
        if Some(core) == skip {
            continue;
        }
        let rank = core_rank(cores, tasks, core)?;
        if rank <= limit && best.is_none_or(|(low, _)| rank <= low) {
            best = Some((rank, core));
        }
    }
    Ok(best.map(|(_, core)| core))
}

/// Core to reselect once a task at `priority` becomes runnable.
pub fn offer_target(
    cores: &CoreTable,
    tasks: &TaskTable,
    priority: u8,
    reach: Reach,
) -> SchedResult<Option<CoreId>> {
    let limit = match reach {
        Reach::Lower => i16::from(priority) - 1,
        Reach::Equal => i16::from(priority),
    };
    lowest_core(cores, tasks, limit, None)
}

/// Task `core` should run next, or `None` when nothing is runnable for it.
pub fn pick_next(
    core: CoreId,
    cores: &CoreTable,
    ready: &ReadyLists,
    tasks: &TaskTable,
) -> SchedResult<Option<TaskHandle>> {
    let own = match cores.occupant(core) {
        Some(task) => {
            let record = tasks
                .get(task)
                .map_err(|_| InvariantFault::StaleOccupant { core })?;
            Some((record.priority, record.stamp, task))
        }
        None => None,
    };

    for level in (0..ready.levels()).rev() {
        let level = level as u8;
        let head = ready.peek(level);
        let mine = own.filter(|&(priority, _, _)| priority == level);
        match (head, mine) {
            (Some(head), Some((_, stamp, task))) => {
                return Ok(Some(if head.stamp < stamp { head.task } else { task }));
            }
            (Some(head), None) => return Ok(Some(head.task)),
            (None, Some((_, _, task))) => return Ok(Some(task)),
            (None, None) => {}
        }
    }
    Ok(None)
}

/// Run selection on `first` and on every core a displaced task claims in
/// turn. Returns how many cores changed occupant.
///
/// Each step displaces a task onto a core of strictly lower rank, so the
/// chain ends after at most one step per priority level.
pub fn reselect(
    first: CoreId,
    cores: &mut CoreTable,
    ready: &mut ReadyLists,
    tasks: &mut TaskTable,
) -> SchedResult<usize> {
    let mut changed = 0;
    let mut next_core = Some(first);

    while let Some(core) = next_core.take() {
        let Some(next) = pick_next(core, cores, ready, tasks)? else {
            continue;
        };
        let prev = cores.occupant(core);

        if prev == Some(next) {
            let stamp = ready.next_stamp();
            let record = tasks
                .get_mut(next)
                .map_err(|_| InvariantFault::StaleOccupant { core })?;
            record.stamp = stamp;
            continue;
        }

        let next_priority = match tasks.get(next) {
            Ok(record) => record.priority,
            Err(_) => return Err(InvariantFault::ReadyMembership { task: next }.into()),
        };
        if !ready.remove(next_priority, next) {
            return Err(InvariantFault::ReadyListCorrupt {
                priority: next_priority,
                task: next,
            }
            .into());
        }

        if let Some(prev) = prev {
            cores.vacate(core);
            let (priority, stamp) = match tasks.get_mut(prev) {
                Ok(record) => {
                    record.preempt_count += 1;
                    (record.priority, record.stamp)
                }
                Err(_) => return Err(InvariantFault::StaleOccupant { core }.into()),
            };
            tasks.transition(prev, TaskStatus::Ready)?;
            if !ready.requeue(priority, prev, stamp) {
                return Err(InvariantFault::ReadyMembership { task: prev }.into());
            }
            if priority < next_priority {
                cores.record_preemption(core);
                klog_debug!("SCHED: {} preempts {} on core {}", next, prev, core);
            } else {
                cores.record_time_slice(core);
                klog_debug!("SCHED: {} slices out {} on core {}", next, prev, core);
            }
            next_core = lowest_core(cores, tasks, i16::from(priority) - 1, Some(core))?;
        }

        cores.place(core, next);
        tasks.transition(next, TaskStatus::Running { core })?;
        let stamp = ready.next_stamp();
        if let Ok(record) = tasks.get_mut(next) {
            record.stamp = stamp;
            record.dispatch_count += 1;
            record.last_core = Some(core);
        }
        klog_debug!("SCHED: dispatch {} to core {}", next, core);
        changed += 1;
    }

    Ok(changed)
}
