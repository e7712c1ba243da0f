use super::TestResult;
use crate::{klog_debug, klog_info};

/// Run one scenario, logging its name and outcome.
pub fn run_single_test(name: &str, test: impl FnOnce() -> TestResult) -> TestResult {
    klog_debug!("TEST: {} ...", name);
    let result = test();
    match result {
        TestResult::Pass => klog_debug!("TEST: {} passed", name),
        TestResult::Skipped => klog_info!("TEST: {} skipped", name),
        TestResult::Fail => klog_info!("TEST: {} FAILED", name),
    }
    result
}
