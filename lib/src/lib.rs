#![cfg_attr(not(test), no_std)]

pub mod klog;
pub mod testing;

#[doc(hidden)]
pub use paste;

pub use klog::{
    KlogBackend, KlogLevel, klog_get_level, klog_has_backend, klog_init, klog_is_enabled,
    klog_register_backend, klog_set_level,
};
pub use testing::{TestResult, TestSuiteResult};
