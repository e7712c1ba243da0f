//! coreslice ABI types
//!
//! Canonical definitions for the task-facing types shared between the
//! scheduler core and whatever drives it (tick source, task executor,
//! test battery). Keeping them here gives every consumer the same handle
//! and state encoding.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod task;

pub use task::*;
