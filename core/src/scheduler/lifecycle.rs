//! Process-wide scheduler instance.
//!
//! The single [`Scheduler`] lives behind a spin mutex, which is the global
//! scheduler lock: every wrapper below takes it for exactly one API call.
//! No call suspends while holding it.

use coreslice_abi::task::{CoreId, TaskEntry, TaskHandle, TaskStatus};
use coreslice_lib::klog::{klog_init, klog_set_level};
use coreslice_lib::klog_info;
use spin::Mutex;

use super::config::{SchedConfig, config_from_cmdline};
use super::error::{SchedError, SchedResult};
use super::scheduler::{SchedStats, Scheduler};

static SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);

/// Install a fresh scheduler, replacing any previous instance, and apply
/// its log level.
pub fn init_scheduler(config: SchedConfig) -> SchedResult {
    match config.log_level {
        Some(level) => klog_set_level(level),
        None => klog_init(),
    }
    let sched = Scheduler::new(config)?;
    *SCHEDULER.lock() = Some(sched);
    Ok(())
}

/// Install a scheduler configured from `sched.*` command-line tokens.
pub fn init_scheduler_from_cmdline(cmdline: Option<&str>) -> SchedResult {
    init_scheduler(config_from_cmdline(cmdline))
}

/// Tear down the global instance. Later calls fail with `NotInitialized`.
pub fn scheduler_shutdown() {
    if SCHEDULER.lock().take().is_some() {
        klog_info!("SCHED: shutdown");
    }
}

pub fn scheduler_is_initialized() -> bool {
    SCHEDULER.lock().is_some()
}

/// Run `f` against the global instance under the scheduler lock.
pub fn with_scheduler<R>(f: impl FnOnce(&mut Scheduler) -> SchedResult<R>) -> SchedResult<R> {
    let mut guard = SCHEDULER.lock();
    let sched = guard.as_mut().ok_or(SchedError::NotInitialized)?;
    f(sched)
}

pub fn task_create(
    entry: TaskEntry,
    name: &str,
    stack_hint: usize,
    priority: u8,
) -> SchedResult<TaskHandle> {
    with_scheduler(|s| s.task_create(entry, name, stack_hint, priority))
}

pub fn task_delete(task: TaskHandle) -> SchedResult {
    with_scheduler(|s| s.task_delete(task))
}

pub fn task_set_priority(task: TaskHandle, priority: u8) -> SchedResult {
    with_scheduler(|s| s.task_set_priority(task, priority))
}

pub fn task_suspend(task: TaskHandle) -> SchedResult {
    with_scheduler(|s| s.task_suspend(task))
}

pub fn task_resume(task: TaskHandle) -> SchedResult {
    with_scheduler(|s| s.task_resume(task))
}

pub fn task_block(task: TaskHandle) -> SchedResult {
    with_scheduler(|s| s.task_block(task))
}

pub fn task_unblock(task: TaskHandle) -> SchedResult {
    with_scheduler(|s| s.task_unblock(task))
}

pub fn task_delay(task: TaskHandle, ticks: u64) -> SchedResult {
    with_scheduler(|s| s.task_delay(task, ticks))
}

pub fn task_yield(task: TaskHandle) -> SchedResult {
    with_scheduler(|s| s.task_yield(task))
}

pub fn start_scheduler() -> SchedResult {
    with_scheduler(|s| s.start_scheduler())
}

/// Tick-source entry point.
pub fn scheduler_timer_tick() -> SchedResult {
    with_scheduler(|s| s.advance_tick())
}

pub fn query_task_state(task: TaskHandle) -> SchedResult<(TaskStatus, Option<CoreId>)> {
    with_scheduler(|s| s.query_task_state(task))
}

pub fn core_occupant(core: CoreId) -> SchedResult<Option<TaskHandle>> {
    with_scheduler(|s| s.core_occupant(core))
}

pub fn get_scheduler_stats() -> SchedResult<SchedStats> {
    with_scheduler(|s| Ok(s.stats()))
}
