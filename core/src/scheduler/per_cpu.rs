//! Core table for SMP dispatch.
//!
//! One slot per modeled core. A slot holds the handle of the task
//! the dispatcher placed there and its counters.
//! Core 0 is the caller core: a tick never reselects it, so its occupant
//! keeps running until its own state changes or higher work preempts it.

use alloc::vec::Vec;

use coreslice_abi::task::{CoreId, TaskHandle};

/// Caller core: anchored against time slicing.
pub const CALLER_CORE: CoreId = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreStats {
    /// Tasks placed on this core.
    pub switches: u64,
    /// Occupants displaced by higher-priority work.
    pub preemptions: u64,
    /// Occupants displaced by equal-priority work.
    pub time_slices: u64,
    pub ticks: u64,
    pub idle_ticks: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct CoreSlot {
    occupant: Option<TaskHandle>,
    stats: CoreStats,
}

impl CoreSlot {
    #[inline]
    fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

pub struct CoreTable {
    slots: Vec<CoreSlot>,
}

impl CoreTable {
    pub fn new(num_cores: usize) -> Self {
        Self {
            slots: alloc::vec![CoreSlot::default(); num_cores],
        }
    }

    #[inline]
    pub fn num_cores(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn occupant(&self, core: CoreId) -> Option<TaskHandle> {
        self.slots.get(core).and_then(|s| s.occupant)
    }

    /// `(core, occupant)` for every busy core, ascending core.
    pub fn occupied(&self) -> impl Iterator<Item = (CoreId, TaskHandle)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(core, s)| s.occupant.map(|t| (core, t)))
    }

    pub fn empty_cores(&self) -> impl Iterator<Item = CoreId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_empty())
            .map(|(core, _)| core)
    }

    /// Place `task` on an empty core. Counted as a switch.
    pub fn place(&mut self, core: CoreId, task: TaskHandle) {
        if let Some(slot) = self.slots.get_mut(core) {
            slot.occupant = Some(task);
            slot.stats.switches += 1;
        }
    }

    /// Empty `core`, returning the previous occupant.
    pub fn vacate(&mut self, core: CoreId) -> Option<TaskHandle> {
        self.slots.get_mut(core)?.occupant.take()
    }

    pub fn record_preemption(&mut self, core: CoreId) {
        if let Some(slot) = self.slots.get_mut(core) {
            slot.stats.preemptions += 1;
        }
    }

    pub fn record_time_slice(&mut self, core: CoreId) {
        if let Some(slot) = self.slots.get_mut(core) {
            slot.stats.time_slices += 1;
        }
    }

    /// Per-tick accounting for every core.
    pub fn record_tick(&mut self) {
        for slot in &mut self.slots {
            slot.stats.ticks += 1;
            if slot.is_empty() {
                slot.stats.idle_ticks += 1;
            }
        }
    }

    pub fn stats(&self, core: CoreId) -> Option<CoreStats> {
        self.slots.get(core).map(|s| s.stats)
    }

    pub fn total_stats(&self) -> CoreStats {
        self.slots.iter().fold(CoreStats::default(), |mut acc, s| {
            acc.switches += s.stats.switches;
            acc.preemptions += s.stats.preemptions;
            acc.time_slices += s.stats.time_slices;
            acc.ticks += s.stats.ticks;
            acc.idle_ticks += s.stats.idle_ticks;
            acc
        })
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = CoreSlot::default();
        }
    }
}
