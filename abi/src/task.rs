//! Task ABI types shared between the scheduler and its collaborators.
//!
//! This module is the single source of truth for task identity, task state
//! and the priority/core conventions. The scheduler core, the global facade
//! and the scenario battery all import from here.

use core::fmt;

// --- Task Configuration ---

pub const MAX_TASKS: usize = 64;
pub const MAX_CPUS: usize = 64;
pub const TASK_NAME_MAX_LEN: usize = 16;

/// Core id as used by the core table. Valid ids are `0..num_cores`.
pub type CoreId = usize;

/// Conventional "no core" value reported for tasks that are not running.
pub const NO_CORE: i32 = -1;

/// Body of a task. Opaque to the scheduling core; an outer executor runs it
/// once the scheduler reports the task as running on some core.
pub type TaskEntry = fn();

// --- Task Priority ---

pub const TASK_PRIORITY_DEFAULT_MAX: u8 = 7;

// --- TaskHandle ---

/// Opaque, stable task identity.
///
/// The low 32 bits hold the task-table slot, the high 32 bits the slot
/// generation at creation time. A slot may be reused after its task is
/// deleted, but the generation is bumped first, so a handle is never
/// handed out twice within one scheduler run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    #[inline]
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | slot as u64)
    }

    #[inline]
    pub const fn slot(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskHandle({}#{})", self.slot(), self.generation())
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.slot(), self.generation())
    }
}

// --- TaskStatus ---

/// Type-safe task status with explicit state-machine semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TaskStatus {
    /// Task is runnable and waiting in its priority's ready list.
    #[default]
    Ready,
    /// Task occupies the given core.
    Running { core: CoreId },
    /// Task waits for an event or a delay to expire.
    Blocked,
    /// Task was explicitly suspended and ignores wakeups.
    Suspended,
    /// Task was deleted; its handle is retired.
    Deleted,
}

impl TaskStatus {
    #[inline]
    pub const fn core(self) -> Option<CoreId> {
        match self {
            Self::Running { core } => Some(core),
            _ => None,
        }
    }

    /// Core index, or [`NO_CORE`] when the task is not running.
    #[inline]
    pub const fn core_or_none(self) -> i32 {
        match self {
            Self::Running { core } => core as i32,
            _ => NO_CORE,
        }
    }

    #[inline]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Ready or running: the task competes for a core.
    #[inline]
    pub const fn is_runnable(self) -> bool {
        matches!(self, Self::Ready | Self::Running { .. })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running { .. } => "running",
            Self::Blocked => "blocked",
            Self::Suspended => "suspended",
            Self::Deleted => "deleted",
        }
    }

    /// Whether the scheduler may move a task from `self` to `target`.
    ///
    /// Only the dispatcher performs `Ready -> Running`; a blocked or
    /// suspended task always passes through `Ready` first.
    pub const fn can_transition_to(self, target: Self) -> bool {
        match self {
            Self::Ready => matches!(
                target,
                Self::Running { .. } | Self::Blocked | Self::Suspended | Self::Deleted
            ),
            Self::Running { .. } => matches!(
                target,
                Self::Ready | Self::Blocked | Self::Suspended | Self::Deleted
            ),
            Self::Blocked => matches!(target, Self::Ready | Self::Suspended | Self::Deleted),
            Self::Suspended => matches!(target, Self::Ready | Self::Deleted),
            Self::Deleted => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { core } => write!(f, "running@{}", core),
            other => f.write_str(other.as_str()),
        }
    }
}

// --- TaskName ---

/// Fixed-capacity task name. Longer names are truncated on a char boundary.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TaskName {
    bytes: [u8; TASK_NAME_MAX_LEN],
    len: u8,
}

impl TaskName {
    pub const fn empty() -> Self {
        Self {
            bytes: [0; TASK_NAME_MAX_LEN],
            len: 0,
        }
    }

    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(TASK_NAME_MAX_LEN);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; TASK_NAME_MAX_LEN];
        bytes[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self {
            bytes,
            len: end as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        // Construction only copies whole UTF-8 sequences.
        core::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl Default for TaskName {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
