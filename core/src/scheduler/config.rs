//! Scheduler configuration and boot command-line parsing.

use core::fmt;

use bitflags::bitflags;
use coreslice_abi::task::{MAX_CPUS, MAX_TASKS, TASK_PRIORITY_DEFAULT_MAX};
use coreslice_lib::klog::KlogLevel;

use super::error::{ConfigFault, SchedResult};

const DEFAULT_NUM_CORES: usize = 4;
const DEFAULT_MAX_PRIORITY: u8 = TASK_PRIORITY_DEFAULT_MAX;
const DEFAULT_MAX_TASKS: usize = MAX_TASKS;

bitflags! {
    /// Optional scheduler behaviors.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SchedFeatures: u32 {
        /// Rotate equal-priority tasks on every tick.
        const TIME_SLICING = 1 << 0;
        /// Re-check every structural invariant after each pass and halt on
        /// the first violation.
        const STRICT_INVARIANTS = 1 << 1;
    }
}

impl Default for SchedFeatures {
    fn default() -> Self {
        Self::TIME_SLICING | Self::STRICT_INVARIANTS
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedConfig {
    /// Number of modeled cores, `N`.
    pub num_cores: usize,
    /// Highest valid priority. Ready lists exist for `0..=max_priority`.
    pub max_priority: u8,
    /// Upper bound on live (non-deleted) tasks.
    pub max_tasks: usize,
    pub features: SchedFeatures,
    /// klog level applied when the global instance is installed; `None`
    /// restores the default.
    pub log_level: Option<KlogLevel>,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            num_cores: DEFAULT_NUM_CORES,
            max_priority: DEFAULT_MAX_PRIORITY,
            max_tasks: DEFAULT_MAX_TASKS,
            features: SchedFeatures::default(),
            log_level: None,
        }
    }
}

impl SchedConfig {
    pub fn with_cores(num_cores: usize) -> Self {
        Self {
            num_cores,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SchedResult {
        if self.num_cores == 0 {
            return Err(ConfigFault::NoCores.into());
        }
        if self.num_cores > MAX_CPUS {
            return Err(ConfigFault::TooManyCores {
                requested: self.num_cores,
                max: MAX_CPUS,
            }
            .into());
        }
        if self.max_tasks == 0 {
            return Err(ConfigFault::NoTaskCapacity.into());
        }
        Ok(())
    }

    #[inline]
    pub fn priority_levels(&self) -> usize {
        self.max_priority as usize + 1
    }

    #[inline]
    pub fn time_slicing(&self) -> bool {
        self.features.contains(SchedFeatures::TIME_SLICING)
    }

    #[inline]
    pub fn strict_invariants(&self) -> bool {
        self.features.contains(SchedFeatures::STRICT_INVARIANTS)
    }
}

impl fmt::Display for SchedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cores={} max_prio={} max_tasks={} timeslice={} strict={}",
            self.num_cores,
            self.max_priority,
            self.max_tasks,
            on_off(self.time_slicing()),
            on_off(self.strict_invariants()),
        )
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("on")
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("enabled")
        || value == "1"
    {
        Some(true)
    } else if value.eq_ignore_ascii_case("off")
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("disabled")
        || value == "0"
    {
        Some(false)
    } else {
        None
    }
}

/// Build a configuration from `sched.*` tokens on a boot command line.
///
/// Unknown tokens and unparsable values are ignored; the result still has
/// to pass [`SchedConfig::validate`].
pub fn config_from_cmdline(cmdline: Option<&str>) -> SchedConfig {
    let mut cfg = SchedConfig::default();
    if let Some(cmdline) = cmdline {
        for token in cmdline.split_whitespace() {
            if let Some(value) = token.strip_prefix("sched.cores=") {
                if let Ok(parsed) = value.parse::<usize>() {
                    cfg.num_cores = parsed;
                }
            } else if let Some(value) = token.strip_prefix("sched.max_prio=") {
                if let Ok(parsed) = value.parse::<u8>() {
                    cfg.max_priority = parsed;
                }
            } else if let Some(value) = token.strip_prefix("sched.max_tasks=") {
                if let Ok(parsed) = value.parse::<usize>() {
                    cfg.max_tasks = parsed;
                }
            } else if let Some(value) = token.strip_prefix("sched.timeslice=") {
                if let Some(enabled) = parse_bool(value) {
                    cfg.features.set(SchedFeatures::TIME_SLICING, enabled);
                }
            } else if let Some(value) = token.strip_prefix("sched.strict=") {
                if let Some(enabled) = parse_bool(value) {
                    cfg.features.set(SchedFeatures::STRICT_INVARIANTS, enabled);
                }
            } else if let Some(value) = token.strip_prefix("sched.log=") {
                if let Ok(level) = value.parse::<KlogLevel>() {
                    cfg.log_level = Some(level);
                }
            }
        }
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::error::SchedError;

    #[test]
    fn defaults_are_valid() {
        let cfg = SchedConfig::default();
        assert_eq!(cfg.num_cores, 4);
        assert_eq!(cfg.max_priority, 7);
        assert_eq!(cfg.priority_levels(), 8);
        assert!(cfg.time_slicing());
        assert!(cfg.strict_invariants());
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        assert_eq!(
            SchedConfig::with_cores(0).validate(),
            Err(SchedError::ConfigError(ConfigFault::NoCores))
        );
        assert_eq!(
            SchedConfig::with_cores(MAX_CPUS + 1).validate(),
            Err(SchedError::ConfigError(ConfigFault::TooManyCores {
                requested: MAX_CPUS + 1,
                max: MAX_CPUS,
            }))
        );
        let cfg = SchedConfig {
            max_tasks: 0,
            ..SchedConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(SchedError::ConfigError(ConfigFault::NoTaskCapacity))
        );
    }

    #[test]
    fn cmdline_overrides_defaults() {
        let cfg = config_from_cmdline(Some(
            "quiet sched.cores=2 sched.max_prio=3 sched.max_tasks=9 sched.timeslice=off sched.log=debug",
        ));
        assert_eq!(cfg.num_cores, 2);
        assert_eq!(cfg.log_level, Some(KlogLevel::Debug));
        assert_eq!(cfg.max_priority, 3);
        assert_eq!(cfg.max_tasks, 9);
        assert!(!cfg.time_slicing());
        assert!(cfg.strict_invariants());
    }

    #[test]
    fn cmdline_ignores_garbage() {
        let cfg = config_from_cmdline(Some(
            "sched.cores=many sched.strict=maybe sched.log=loud sched.bogus=1",
        ));
        assert_eq!(cfg, SchedConfig::default());
        assert_eq!(config_from_cmdline(None), SchedConfig::default());

        let cfg = config_from_cmdline(Some("sched.strict=no"));
        assert!(!cfg.strict_invariants());
    }
}
