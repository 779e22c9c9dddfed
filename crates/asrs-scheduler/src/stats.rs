//! Aggregate counters for analytics consumers.

use std::collections::BTreeMap;

use asrs_core::{ErrorKind, Tick};

use crate::JobKind;

/// Read-only history of what the scheduler has done.
#[derive(Clone, Debug, Default)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed:    u64,
    pub cancelled: u64,

    pub stores_completed:    u64,
    pub retrieves_completed: u64,

    pub failures: BTreeMap<ErrorKind, u64>,

    /// Sum of travelled path lengths over completed jobs.
    pub total_path_len: u64,

    /// Completion ticks, ascending.
    completions: Vec<Tick>,
}

impl SchedulerStats {
    pub(crate) fn record_submitted(&mut self) {
        self.submitted += 1;
    }

    pub(crate) fn record_done(&mut self, kind: JobKind, tick: Tick, path_len: u32) {
        self.completed += 1;
        match kind {
            JobKind::Store    => self.stores_completed += 1,
            JobKind::Retrieve => self.retrieves_completed += 1,
        }
        self.total_path_len += u64::from(path_len);
        self.completions.push(tick);
    }

    pub(crate) fn record_failed(&mut self, kind: ErrorKind) {
        self.failed += 1;
        *self.failures.entry(kind).or_default() += 1;
    }

    pub(crate) fn record_cancelled(&mut self) {
        self.cancelled += 1;
    }

    pub fn failures_of(&self, kind: ErrorKind) -> u64 {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Mean travelled cells per completed job.
    pub fn average_path_len(&self) -> f64 {
        if self.completed == 0 {
            return 0.0;
        }
        self.total_path_len as f64 / self.completed as f64
    }

    /// Jobs completed in `[from, to)`.
    pub fn completed_between(&self, from: Tick, to: Tick) -> usize {
        let lo = self.completions.partition_point(|&t| t < from);
        let hi = self.completions.partition_point(|&t| t < to);
        hi.saturating_sub(lo)
    }

    /// Non-terminal jobs: submitted minus everything that finished.
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed + self.failed + self.cancelled)
    }
}
