#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod scheduler;

pub use scheduler::config;
pub use scheduler::dispatch;
pub use scheduler::error;
pub use scheduler::lifecycle;
pub use scheduler::per_cpu;
pub use scheduler::ready_queue;
pub use scheduler::sched_tests;
pub use scheduler::scheduler as sched;
pub use scheduler::task;
pub use scheduler::timeslice_tests;
