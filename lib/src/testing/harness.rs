// Suite bookkeeping for define_test_suite!.

/// Result of executing a single test suite.
#[derive(Clone, Copy, Debug, Default)]
pub struct TestSuiteResult {
    pub name: &'static str,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
}

impl TestSuiteResult {
    /// Create a new result with just the suite name set.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            total: 0,
            passed: 0,
            failed: 0,
        }
    }

    /// Fill in results from a (passed, total) pair.
    pub fn fill(&mut self, passed: u32, total: u32) {
        self.total = total;
        self.passed = passed;
        self.failed = total.saturating_sub(passed);
    }

    /// Check if all tests in this suite passed.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
