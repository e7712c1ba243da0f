//! The scheduler instance: lifecycle API, tick engine and observers.
//!
//! A [`Scheduler`] owns every piece of mutable scheduling state. A change
//! that can affect who deserves a core ends in a per-core reselection: the
//! core a task left, or the core a newly runnable task is offered to. With
//! `STRICT_INVARIANTS` every call is followed by a full structural check. A
//! failed check halts the instance for good.

use alloc::vec::Vec;

use coreslice_abi::task::{CoreId, TaskEntry, TaskHandle, TaskName, TaskStatus};
use coreslice_lib::{klog_debug, klog_error, klog_info};

use super::config::SchedConfig;
use super::dispatch::{self, Reach};
use super::error::{InvariantFault, SchedError, SchedResult};
use super::invariants;
use super::per_cpu::{CALLER_CORE, CoreStats, CoreTable};
use super::ready_queue::ReadyLists;
use super::sleep::SleepQueue;
use super::task::{TaskRecord, TaskSpawn, TaskTable};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedPhase {
    /// Before `start_scheduler`: creation only fills the ready lists.
    Staging,
    Started,
    /// An invariant check failed; every call reports the fault.
    Halted(InvariantFault),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedStats {
    pub ticks: u64,
    /// Ticks on which the time slice moved at least one task.
    pub rotations: u64,
    pub live_tasks: usize,
    pub running_tasks: usize,
    pub ready_tasks: usize,
    pub blocked_tasks: usize,
    pub suspended_tasks: usize,
    pub switches: u64,
    pub preemptions: u64,
    pub time_slices: u64,
    pub idle_ticks: u64,
}

pub struct Scheduler {
    config: SchedConfig,
    phase: SchedPhase,
    tasks: TaskTable,
    ready: ReadyLists,
    cores: CoreTable,
    sleepers: SleepQueue,
    tick_count: u64,
    rotations: u64,
}

impl Scheduler {
    pub fn new(config: SchedConfig) -> SchedResult<Self> {
        config.validate()?;
        klog_info!("SCHED: init {}", config);
        Ok(Self {
            config,
            phase: SchedPhase::Staging,
            tasks: TaskTable::new(config.max_tasks),
            ready: ReadyLists::new(config.priority_levels()),
            cores: CoreTable::new(config.num_cores),
            sleepers: SleepQueue::new(),
            tick_count: 0,
            rotations: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> SchedPhase {
        self.phase
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.phase == SchedPhase::Started
    }

    #[inline]
    pub fn num_cores(&self) -> usize {
        self.cores.num_cores()
    }

    // =========================================================================
    // Guards
    // =========================================================================

    fn ensure_healthy(&self) -> SchedResult {
        match self.phase {
            SchedPhase::Halted(fault) => Err(SchedError::InternalInvariantBroken(fault)),
            _ => Ok(()),
        }
    }

    fn ensure_started(&self) -> SchedResult {
        self.ensure_healthy()?;
        if self.phase != SchedPhase::Started {
            return Err(SchedError::SchedulerNotStarted);
        }
        Ok(())
    }

    fn check_priority(&self, priority: u8) -> SchedResult {
        if priority > self.config.max_priority {
            return Err(SchedError::BadPriority {
                priority,
                max: self.config.max_priority,
            });
        }
        Ok(())
    }

    fn halt(&mut self, fault: InvariantFault) -> SchedError {
        klog_error!("SCHED: halted: {}", fault);
        self.phase = SchedPhase::Halted(fault);
        SchedError::InternalInvariantBroken(fault)
    }

    /// Halt on an internal fault; pass everything else through.
    fn guard<T>(&mut self, result: SchedResult<T>) -> SchedResult<T> {
        match result {
            Err(SchedError::InternalInvariantBroken(fault)) => Err(self.halt(fault)),
            other => other,
        }
    }

    // =========================================================================
    // Selection plumbing
    // =========================================================================

    /// Reselect `core` and whatever chain that starts. A no-op before start.
    fn run_core(&mut self, core: CoreId) -> SchedResult<usize> {
        if self.phase != SchedPhase::Started {
            return Ok(0);
        }
        let changed = dispatch::reselect(core, &mut self.cores, &mut self.ready, &mut self.tasks);
        self.guard(changed)
    }

    /// Offer a ready task to the lowest-ranked core within `reach`.
    fn offer(&mut self, task: TaskHandle, reach: Reach) -> SchedResult {
        if self.phase != SchedPhase::Started {
            return Ok(());
        }
        let priority = self.tasks.get(task)?.priority;
        let target = dispatch::offer_target(&self.cores, &self.tasks, priority, reach);
        if let Some(core) = self.guard(target)? {
            self.run_core(core)?;
        }
        Ok(())
    }

    fn verify(&mut self) -> SchedResult {
        if self.phase != SchedPhase::Started || !self.config.strict_invariants() {
            return Ok(());
        }
        let checked = invariants::check_all(&self.cores, &self.ready, &self.tasks);
        match checked {
            Ok(()) => Ok(()),
            Err(fault) => Err(self.halt(fault)),
        }
    }

    /// Take `task` out of competition: off its core or out of its ready
    /// list. Returns the core it held.
    fn detach(&mut self, task: TaskHandle) -> SchedResult<Option<CoreId>> {
        let record = *self.tasks.get(task)?;
        match record.status {
            TaskStatus::Running { core } => {
                self.cores.vacate(core);
                Ok(Some(core))
            }
            TaskStatus::Ready => {
                if !self.ready.remove(record.priority, task) {
                    return Err(self.halt(InvariantFault::ReadyMembership { task }));
                }
                Ok(None)
            }
            TaskStatus::Blocked => {
                self.sleepers.remove(task);
                Ok(None)
            }
            TaskStatus::Suspended | TaskStatus::Deleted => Ok(None),
        }
    }

    /// Append a Ready task to the tail of its list under a fresh stamp.
    fn queue(&mut self, task: TaskHandle) -> SchedResult {
        let priority = self.tasks.get(task)?.priority;
        let Some(stamp) = self.ready.append(priority, task) else {
            return Err(self.halt(InvariantFault::ReadyMembership { task }));
        };
        self.tasks.get_mut(task)?.stamp = stamp;
        Ok(())
    }

    /// Move a detached task to the tail of its ready list.
    fn make_ready(&mut self, task: TaskHandle) -> SchedResult {
        self.set_status(task, TaskStatus::Ready)?;
        self.queue(task)
    }

    fn set_status(&mut self, task: TaskHandle, status: TaskStatus) -> SchedResult {
        let moved = self.tasks.transition(task, status).map(|_| ());
        self.guard(moved)
    }

    /// Move a running task to the tail of its level's rotation.
    fn restamp(&mut self, task: TaskHandle) -> SchedResult {
        let stamp = self.ready.next_stamp();
        self.tasks.get_mut(task)?.stamp = stamp;
        Ok(())
    }

    /// Reselect a core a task just left, then verify.
    fn refill(&mut self, freed: Option<CoreId>) -> SchedResult {
        if let Some(core) = freed {
            self.run_core(core)?;
        }
        self.verify()
    }

    // =========================================================================
    // Lifecycle API
    // =========================================================================

    /// Create a Ready task at the tail of its priority's list. Once started,
    /// it takes an idle core or displaces strictly lower work.
    pub fn task_create(
        &mut self,
        entry: TaskEntry,
        name: &str,
        stack_hint: usize,
        priority: u8,
    ) -> SchedResult<TaskHandle> {
        self.ensure_healthy()?;
        self.check_priority(priority)?;

        let handle = self.tasks.insert(&TaskSpawn {
            entry,
            name,
            stack_hint,
            priority,
        })?;
        self.queue(handle)?;
        klog_debug!("SCHED: create {} '{}' prio {}", handle, name, priority);

        self.offer(handle, Reach::Lower)?;
        self.verify()?;
        Ok(handle)
    }

    /// Retire `task`. Its core, if any, is reselected at once.
    pub fn task_delete(&mut self, task: TaskHandle) -> SchedResult {
        self.ensure_healthy()?;
        let freed = self.detach(task)?;
        self.tasks.retire(task)?;
        klog_debug!("SCHED: delete {}", task);
        self.refill(freed)
    }

    /// Change the priority of `task`.
    ///
    /// A ready task goes to the tail of its new list; a raised one is offered
    /// a core, equal-priority occupants included. A running task keeps its
    /// core unless lowered, in which case its core is reselected at once.
    pub fn task_set_priority(&mut self, task: TaskHandle, priority: u8) -> SchedResult {
        self.ensure_healthy()?;
        self.check_priority(priority)?;

        let record = *self.tasks.get(task)?;
        if record.priority == priority {
            return Ok(());
        }
        klog_debug!("SCHED: {} prio {} -> {}", task, record.priority, priority);

        match record.status {
            TaskStatus::Ready => {
                self.detach(task)?;
                self.tasks.get_mut(task)?.priority = priority;
                self.queue(task)?;
                if priority > record.priority {
                    self.offer(task, Reach::Equal)?;
                }
            }
            TaskStatus::Running { core } => {
                self.tasks.get_mut(task)?.priority = priority;
                self.restamp(task)?;
                if priority < record.priority {
                    self.run_core(core)?;
                }
            }
            _ => self.tasks.get_mut(task)?.priority = priority,
        }
        self.verify()
    }

    /// Leave staging and select a task for every core, ascending.
    pub fn start_scheduler(&mut self) -> SchedResult {
        self.ensure_healthy()?;
        if self.phase == SchedPhase::Started {
            return Err(SchedError::AlreadyStarted);
        }
        self.phase = SchedPhase::Started;
        klog_info!(
            "SCHED: start with {} tasks on {} cores",
            self.tasks.live_count(),
            self.cores.num_cores()
        );
        for core in 0..self.cores.num_cores() {
            self.run_core(core)?;
        }
        self.verify()
    }

    pub fn task_suspend(&mut self, task: TaskHandle) -> SchedResult {
        self.ensure_healthy()?;
        if self.tasks.get(task)?.status == TaskStatus::Suspended {
            return Ok(());
        }
        let freed = self.detach(task)?;
        self.set_status(task, TaskStatus::Suspended)?;
        klog_debug!("SCHED: suspend {}", task);
        self.refill(freed)
    }

    /// Resume a suspended task. Other states are left alone.
    pub fn task_resume(&mut self, task: TaskHandle) -> SchedResult {
        self.ensure_healthy()?;
        if self.tasks.get(task)?.status != TaskStatus::Suspended {
            return Ok(());
        }
        self.make_ready(task)?;
        klog_debug!("SCHED: resume {}", task);
        self.offer(task, Reach::Lower)?;
        self.verify()
    }

    /// Block a ready or running task until `task_unblock`.
    pub fn task_block(&mut self, task: TaskHandle) -> SchedResult {
        self.ensure_healthy()?;
        if !self.tasks.get(task)?.status.is_runnable() {
            return Ok(());
        }
        let freed = self.detach(task)?;
        self.set_status(task, TaskStatus::Blocked)?;
        klog_debug!("SCHED: block {}", task);
        self.refill(freed)
    }

    /// Wake a blocked task early. Any pending delay is cancelled.
    pub fn task_unblock(&mut self, task: TaskHandle) -> SchedResult {
        self.ensure_healthy()?;
        if self.tasks.get(task)?.status != TaskStatus::Blocked {
            return Ok(());
        }
        self.sleepers.remove(task);
        self.make_ready(task)?;
        klog_debug!("SCHED: unblock {}", task);
        self.offer(task, Reach::Lower)?;
        self.verify()
    }

    /// Block `task` for `ticks` ticks. A zero delay is a yield.
    pub fn task_delay(&mut self, task: TaskHandle, ticks: u64) -> SchedResult {
        self.ensure_started()?;
        if ticks == 0 {
            return self.task_yield(task);
        }
        if !self.tasks.get(task)?.status.is_runnable() {
            return Ok(());
        }
        let freed = self.detach(task)?;
        self.set_status(task, TaskStatus::Blocked)?;
        let wake_tick = self.tick_count.wrapping_add(ticks);
        self.sleepers.upsert(task, wake_tick);
        klog_debug!("SCHED: delay {} until tick {}", task, wake_tick);
        self.refill(freed)
    }

    /// Send a running task to the tail of its level's rotation and reselect
    /// its core. The task keeps the core when nothing else at its level
    /// waits. A task without a core is left alone.
    pub fn task_yield(&mut self, task: TaskHandle) -> SchedResult {
        self.ensure_started()?;
        let Some(core) = self.tasks.get(task)?.core() else {
            return Ok(());
        };
        self.restamp(task)?;
        klog_debug!("SCHED: yield {} on core {}", task, core);
        self.run_core(core)?;
        self.verify()
    }

    // =========================================================================
    // Tick engine
    // =========================================================================

    /// Advance one tick: account, wake sleepers, then time-slice.
    pub fn advance_tick(&mut self) -> SchedResult {
        self.ensure_started()?;

        self.tick_count = self.tick_count.wrapping_add(1);
        self.cores.record_tick();
        let running: Vec<TaskHandle> = self.cores.occupied().map(|(_, t)| t).collect();
        for task in running {
            if let Ok(record) = self.tasks.get_mut(task) {
                record.ticks_running += 1;
            }
        }

        for task in self.sleepers.collect_due(self.tick_count) {
            self.make_ready(task)?;
            klog_debug!("SCHED: wake {} at tick {}", task, self.tick_count);
            self.offer(task, Reach::Lower)?;
        }

        if self.config.time_slicing() {
            self.time_slice()?;
        }
        self.verify()
    }

    /// Runnable tasks at `level`, on a core or waiting.
    fn level_population(&self, level: u8) -> usize {
        let running = self
            .cores
            .occupied()
            .filter(|&(_, t)| self.tasks.get(t).is_ok_and(|r| r.priority == level))
            .count();
        running + self.ready.len(level)
    }

    /// A core's slice is up when it idles or shares its occupant's level
    /// with another runnable task. The caller core never slices.
    fn slice_due(&self, core: CoreId) -> bool {
        match self.cores.occupant(core) {
            None => true,
            Some(task) => self
                .tasks
                .get(task)
                .is_ok_and(|r| self.level_population(r.priority) > 1),
        }
    }

    /// Reselect every due core above the caller core, ascending. Each one
    /// takes the oldest task of its level, its own occupant included.
    fn time_slice(&mut self) -> SchedResult {
        let due: Vec<CoreId> = (CALLER_CORE + 1..self.cores.num_cores())
            .filter(|&core| self.slice_due(core))
            .collect();

        let mut moved = 0;
        for core in due {
            moved += self.run_core(core)?;
        }
        if moved > 0 {
            self.rotations += 1;
        }
        Ok(())
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// State and core of `task`. Only meaningful once started.
    pub fn query_task_state(&self, task: TaskHandle) -> SchedResult<(TaskStatus, Option<CoreId>)> {
        self.ensure_started()?;
        let record = self.tasks.get(task)?;
        Ok((record.status, record.core()))
    }

    pub fn task_record(&self, task: TaskHandle) -> SchedResult<TaskRecord> {
        self.ensure_healthy()?;
        self.tasks.get(task).copied()
    }

    pub fn task_priority(&self, task: TaskHandle) -> SchedResult<u8> {
        Ok(self.task_record(task)?.priority)
    }

    pub fn task_name(&self, task: TaskHandle) -> SchedResult<TaskName> {
        Ok(self.task_record(task)?.name)
    }

    pub fn task_entry(&self, task: TaskHandle) -> SchedResult<TaskEntry> {
        Ok(self.task_record(task)?.entry)
    }

    /// Occupant of `core`; `None` for an idle or out-of-range core.
    pub fn core_occupant(&self, core: CoreId) -> SchedResult<Option<TaskHandle>> {
        self.ensure_healthy()?;
        Ok(self.cores.occupant(core))
    }

    pub fn core_stats(&self, core: CoreId) -> Option<CoreStats> {
        self.cores.stats(core)
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn ready_len(&self, priority: u8) -> usize {
        self.ready.len(priority)
    }

    /// Handles waiting at `priority`, head first.
    pub fn ready_tasks(&self, priority: u8) -> Vec<TaskHandle> {
        self.ready.iter(priority).collect()
    }

    pub fn stats(&self) -> SchedStats {
        let totals = self.cores.total_stats();
        let mut stats = SchedStats {
            ticks: self.tick_count,
            rotations: self.rotations,
            live_tasks: self.tasks.live_count(),
            switches: totals.switches,
            preemptions: totals.preemptions,
            time_slices: totals.time_slices,
            idle_ticks: totals.idle_ticks,
            ..SchedStats::default()
        };
        for record in self.tasks.iter() {
            match record.status {
                TaskStatus::Running { .. } => stats.running_tasks += 1,
                TaskStatus::Ready => stats.ready_tasks += 1,
                TaskStatus::Blocked => stats.blocked_tasks += 1,
                TaskStatus::Suspended => stats.suspended_tasks += 1,
                TaskStatus::Deleted => {}
            }
        }
        stats
    }

    /// Run the structural checks without halting on failure.
    pub fn check_invariants(&self) -> SchedResult {
        self.ensure_healthy()?;
        invariants::check_all(&self.cores, &self.ready, &self.tasks)?;
        Ok(())
    }

    /// Drop every task and return to staging.
    pub fn reset(&mut self) {
        self.tasks.clear();
        self.ready.clear();
        self.cores.clear();
        self.sleepers.clear();
        self.tick_count = 0;
        self.rotations = 0;
        self.phase = SchedPhase::Staging;
    }

    #[cfg(test)]
    pub(crate) fn force_halt(&mut self, fault: InvariantFault) {
        self.halt(fault);
    }
}
