//! In-process gateway for tests and fault injection.

use std::sync::{Arc, Mutex, MutexGuard};

use asrs_registry::RegistrySnapshot;

use crate::gateway::in_seq_order;
use crate::{InventoryEvent, PersistenceGateway, Recovered, StoreError, StoreResult};

#[derive(Default)]
struct State {
    snapshot:  Option<(u64, RegistrySnapshot)>,
    events:    Vec<InventoryEvent>,
    job_ids:   u64,
    snapshots: usize,
    fail_next: u32,
}

/// Keeps the snapshot and journal in memory.
///
/// Clones share the same storage, so a test can keep a handle while the
/// scheduler owns another and still inspect what was written.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<State>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next `n` writes (snapshots, events or job id reservations)
    /// fail.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_next = n;
    }

    pub fn event_count(&self) -> usize {
        self.lock().events.len()
    }

    /// Number of snapshots written so far.
    pub fn snapshot_count(&self) -> usize {
        self.lock().snapshots
    }

    fn check_fault(state: &mut State) -> StoreResult<()> {
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(StoreError::Injected);
        }
        Ok(())
    }
}

impl PersistenceGateway for MemoryGateway {
    fn snapshot(&self, seq: u64, snapshot: &RegistrySnapshot) -> StoreResult<()> {
        let mut state = self.lock();
        Self::check_fault(&mut state)?;
        state.snapshot = Some((seq, snapshot.clone()));
        state.snapshots += 1;
        Ok(())
    }

    fn append_event(&self, event: &InventoryEvent) -> StoreResult<()> {
        let mut state = self.lock();
        Self::check_fault(&mut state)?;
        match state.events.iter().find(|e| e.seq == event.seq) {
            Some(existing) if existing == event => Ok(()),
            Some(_) => Err(StoreError::SeqConflict(event.seq)),
            None => {
                state.events.push(event.clone());
                Ok(())
            }
        }
    }

    fn reserve_job_ids(&self, through: u64) -> StoreResult<()> {
        let mut state = self.lock();
        Self::check_fault(&mut state)?;
        state.job_ids = state.job_ids.max(through);
        Ok(())
    }

    fn recover(&self) -> StoreResult<Recovered> {
        let state = self.lock();
        let (snapshot_seq, snapshot) = state.snapshot.clone().unwrap_or_default();
        Ok(Recovered::new(snapshot, snapshot_seq, state.events.clone(), state.job_ids))
    }

    fn journal(&self) -> StoreResult<Vec<InventoryEvent>> {
        Ok(in_seq_order(self.lock().events.clone()))
    }
}
