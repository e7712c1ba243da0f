//! Error taxonomy for the scheduler core.
//!
//! Every public operation returns [`SchedResult`]. Caller mistakes
//! (stale handles, bad priorities, calls in the wrong phase) are reported
//! and leave the scheduler untouched. [`SchedError::InternalInvariantBroken`]
//! is different: it means the core table and ready lists disagree, the
//! instance halts, and every later call reports the same fault.

use core::fmt;

use coreslice_abi::task::{CoreId, TaskHandle, TaskStatus};

/// Why a [`SchedConfig`](super::config::SchedConfig) was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFault {
    NoCores,
    TooManyCores { requested: usize, max: usize },
    NoTaskCapacity,
}

impl fmt::Display for ConfigFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCores => write!(f, "at least one core is required"),
            Self::TooManyCores { requested, max } => {
                write!(f, "{} cores requested, at most {} supported", requested, max)
            }
            Self::NoTaskCapacity => write!(f, "task capacity must be at least 1"),
        }
    }
}

/// Which scheduler invariant was found broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantFault {
    /// A core slot names a handle that is not a live task.
    StaleOccupant { core: CoreId },
    /// A core slot's occupant does not report itself running there.
    OccupantStateMismatch { core: CoreId, task: TaskHandle },
    /// A task claims a core whose slot holds something else.
    AssignmentMismatch { task: TaskHandle },
    /// The same handle occupies two cores.
    DuplicateOccupant { task: TaskHandle },
    /// A ready list holds a task that is not ready, or at the wrong level.
    ReadyListCorrupt { priority: u8, task: TaskHandle },
    /// A ready task is missing from its list or listed twice.
    ReadyMembership { task: TaskHandle },
    /// A ready task outranks a running one.
    PriorityInversion { running: TaskHandle, ready: TaskHandle },
    /// Fewer cores are busy than there are runnable tasks.
    IdleCoreWithWork { core: CoreId },
    /// A ready list is out of stamp order.
    ReadyListOrder { priority: u8 },
    /// A status change the task state machine forbids.
    IllegalTransition {
        task: TaskHandle,
        from: TaskStatus,
        to: TaskStatus,
    },
}

impl fmt::Display for InvariantFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleOccupant { core } => write!(f, "core {} holds a dead task", core),
            Self::OccupantStateMismatch { core, task } => {
                write!(f, "core {} holds {} which is not running there", core, task)
            }
            Self::AssignmentMismatch { task } => {
                write!(f, "{} claims a core that does not hold it", task)
            }
            Self::DuplicateOccupant { task } => write!(f, "{} occupies two cores", task),
            Self::ReadyListCorrupt { priority, task } => {
                write!(f, "ready list {} holds misplaced task {}", priority, task)
            }
            Self::ReadyMembership { task } => {
                write!(f, "ready task {} is not listed exactly once", task)
            }
            Self::PriorityInversion { running, ready } => {
                write!(f, "ready {} outranks running {}", ready, running)
            }
            Self::IdleCoreWithWork { core } => {
                write!(f, "core {} is idle while runnable work waits", core)
            }
            Self::ReadyListOrder { priority } => {
                write!(f, "ready list {} is out of rotation order", priority)
            }
            Self::IllegalTransition { task, from, to } => {
                write!(f, "{} may not move from {} to {}", task, from, to)
            }
        }
    }
}

/// Scheduler error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Operation on a deleted or never-created handle.
    HandleInvalid,
    /// Priority outside `[0, max]`.
    BadPriority { priority: u8, max: u8 },
    /// Tick or query before `start_scheduler`.
    SchedulerNotStarted,
    /// `start_scheduler` called twice.
    AlreadyStarted,
    /// Task creation beyond the configured capacity.
    CapacityExceeded { max: usize },
    /// Rejected configuration.
    ConfigError(ConfigFault),
    /// The global facade was used before `init_scheduler`.
    NotInitialized,
    /// Fatal: internal state is inconsistent and the scheduler halted.
    InternalInvariantBroken(InvariantFault),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HandleInvalid => write!(f, "invalid or retired task handle"),
            Self::BadPriority { priority, max } => {
                write!(f, "priority {} outside [0, {}]", priority, max)
            }
            Self::SchedulerNotStarted => write!(f, "scheduler not started"),
            Self::AlreadyStarted => write!(f, "scheduler already started"),
            Self::CapacityExceeded { max } => write!(f, "task capacity of {} exhausted", max),
            Self::ConfigError(fault) => write!(f, "bad scheduler configuration: {}", fault),
            Self::NotInitialized => write!(f, "scheduler not initialized"),
            Self::InternalInvariantBroken(fault) => {
                write!(f, "scheduler invariant broken: {}", fault)
            }
        }
    }
}

impl From<ConfigFault> for SchedError {
    fn from(fault: ConfigFault) -> Self {
        Self::ConfigError(fault)
    }
}

impl From<InvariantFault> for SchedError {
    fn from(fault: InvariantFault) -> Self {
        Self::InternalInvariantBroken(fault)
    }
}

/// Convenience result type for scheduler operations.
pub type SchedResult<T = ()> = Result<T, SchedError>;
