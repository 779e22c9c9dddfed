//! `RetryQueue` — jobs parked in `Planning` until their backoff expires.

use std::collections::BTreeMap;

use asrs_core::{JobId, Tick};

/// Tick → jobs due for another planning attempt at that tick.
#[derive(Default)]
pub struct RetryQueue {
    inner: BTreeMap<Tick, Vec<JobId>>,
    total: usize,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: Tick, job: JobId) {
        self.inner.entry(tick).or_default().push(job);
        self.total += 1;
    }

    /// Remove and return every job due at or before `tick`.
    pub fn drain_due(&mut self, tick: Tick) -> Vec<JobId> {
        let later = self.inner.split_off(&(tick + 1));
        let due = std::mem::replace(&mut self.inner, later);
        let jobs: Vec<JobId> = due.into_values().flatten().collect();
        self.total -= jobs.len();
        jobs
    }

    pub fn next_tick(&self) -> Option<Tick> {
        self.inner.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
