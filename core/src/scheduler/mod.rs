//! SMP ready-queue and tick-driven time-slicing core.
//!
//! A [`Scheduler`] owns the task store, one stamp-ordered ready list per
//! priority, and the core table. Tasks reach a core only through
//! [`dispatch::reselect`], run for one core at a time by lifecycle calls
//! and by the tick engine.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod invariants;
pub mod lifecycle;
pub mod per_cpu;
pub mod ready_queue;
pub mod scheduler;
pub mod sleep;
pub mod task;

pub use config::{SchedConfig, SchedFeatures, config_from_cmdline};
pub use error::{ConfigFault, InvariantFault, SchedError, SchedResult};
pub use per_cpu::CoreStats;
pub use scheduler::{SchedPhase, SchedStats, Scheduler};
