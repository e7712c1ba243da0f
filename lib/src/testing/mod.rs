//! In-tree test harness shared by every scheduler test battery.
//!
//! Scenario functions return [`TestResult`] instead of panicking so a suite
//! can be run as a whole (and summarized) as well as test by test. Suites
//! are declared with [`define_test_suite!`](crate::define_test_suite),
//! which also emits one host `#[test]` per scenario.

pub mod harness;
mod runner;

mod assertions;
pub use harness::TestSuiteResult;
pub use runner::run_single_test;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestResult {
    Pass,
    Fail,
    Skipped,
}

impl TestResult {
    #[inline]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass | Self::Skipped)
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail)
    }
}

#[macro_export]
macro_rules! pass {
    () => {
        $crate::testing::TestResult::Pass
    };
}

#[macro_export]
macro_rules! fail {
    () => {
        $crate::testing::TestResult::Fail
    };
    ($msg:expr) => {{
        $crate::klog_info!("TEST FAIL: {}", $msg);
        $crate::testing::TestResult::Fail
    }};
    ($fmt:expr, $($arg:tt)*) => {{
        $crate::klog_info!(concat!("TEST FAIL: ", $fmt), $($arg)*);
        $crate::testing::TestResult::Fail
    }};
}

#[macro_export]
macro_rules! run_test {
    ($passed:expr, $total:expr, $test_fn:expr) => {{
        $total += 1;
        let result = $crate::testing::run_single_test(stringify!($test_fn), || $test_fn());
        if result.is_pass() {
            $passed += 1;
        }
        result
    }};

    ($test_fn:expr) => {{ $crate::testing::run_single_test(stringify!($test_fn), || $test_fn()) }};

    ($name:expr, $test_fn:expr) => {{ $crate::testing::run_single_test($name, || $test_fn()) }};
}

/// Declare a suite of `fn() -> TestResult` scenarios.
///
/// Expands to `run_<suite>_suite()`, which runs every scenario in order and
/// returns a [`TestSuiteResult`], plus a `#[cfg(test)]` module holding one
/// `#[test]` per scenario so `cargo test` reports them individually. Those
/// host tests route klog to stderr, so failure messages show up in the
/// test output.
#[macro_export]
macro_rules! define_test_suite {
    ($suite_name:ident, [$($test_fn:ident),* $(,)?]) => {
        $crate::paste::paste! {
            const [<$suite_name:upper _NAME>]: &str = stringify!($suite_name);

            pub fn [<run_ $suite_name _suite>]() -> $crate::testing::TestSuiteResult {
                let mut passed = 0u32;
                let mut total = 0u32;

                $(
                    $crate::run_test!(passed, total, $test_fn);
                )*

                let mut out = $crate::testing::TestSuiteResult::new([<$suite_name:upper _NAME>]);
                out.fill(passed, total);
                out
            }

            #[cfg(test)]
            mod [<$suite_name _suite>] {
                fn host_backend(args: ::core::fmt::Arguments<'_>) {
                    ::std::eprintln!("{}", args);
                }

                $(
                    #[test]
                    fn $test_fn() {
                        $crate::klog::klog_register_backend(host_backend);
                        let result =
                            $crate::testing::run_single_test(stringify!($test_fn), super::$test_fn);
                        assert!(
                            result.is_pass(),
                            "{} returned {:?}",
                            stringify!($test_fn),
                            result
                        );
                    }
                )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::TestResult;

    fn backend_is_registered() -> TestResult {
        if crate::klog::klog_has_backend() {
            crate::pass!()
        } else {
            crate::fail!()
        }
    }

    fn always_skipped() -> TestResult {
        TestResult::Skipped
    }

    crate::define_test_suite!(host_logging, [backend_is_registered, always_skipped]);

    #[test]
    fn suite_runner_counts_every_scenario() {
        let summary = run_host_logging_suite();
        assert_eq!(summary.total, 2);
        assert!(summary.passed >= 1);
    }
}
