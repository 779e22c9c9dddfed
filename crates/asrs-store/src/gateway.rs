//! The `PersistenceGateway` trait implemented by all backends.

use asrs_registry::{InventoryChange, RegistrySnapshot};

use crate::{InventoryEvent, StoreResult};

/// What [`PersistenceGateway::recover`] returns.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Recovered {
    /// The latest snapshot (empty if none was ever written).
    pub snapshot:        RegistrySnapshot,
    /// `seq` of the last event folded into `snapshot`.
    pub snapshot_seq:    u64,
    /// Events after `snapshot_seq`, in `seq` order, one per `seq`.
    pub events:          Vec<InventoryEvent>,
    /// Every job id below this may already have been handed out.
    pub job_ids_through: u64,
}

impl Recovered {
    /// Keep the events after `snapshot_seq`, ordered by `seq`.  A commit
    /// retried after a write that actually landed leaves the same `seq`
    /// twice; the first copy wins.
    pub fn new(
        snapshot:        RegistrySnapshot,
        snapshot_seq:    u64,
        events:          Vec<InventoryEvent>,
        job_ids_through: u64,
    ) -> Self {
        let events = in_seq_order(events.into_iter().filter(|e| e.seq > snapshot_seq).collect());
        Self { snapshot, snapshot_seq, events, job_ids_through }
    }

    /// `true` if nothing was ever written.
    pub fn is_empty(&self) -> bool {
        self.snapshot.racks.is_empty()
            && self.events.is_empty()
            && self.snapshot_seq == 0
            && self.job_ids_through == 0
    }

    /// The `seq` the next journalled event should carry.
    pub fn next_seq(&self) -> u64 {
        self.events.last().map_or(self.snapshot_seq, |e| e.seq) + 1
    }

    pub fn changes(&self) -> impl Iterator<Item = &InventoryChange> + '_ {
        self.events.iter().map(|e| &e.change)
    }
}

/// Sort by `seq`, keeping the first copy of any `seq` seen twice.
pub(crate) fn in_seq_order(mut events: Vec<InventoryEvent>) -> Vec<InventoryEvent> {
    events.sort_by_key(|e| e.seq);
    events.dedup_by_key(|e| e.seq);
    events
}

/// Durable snapshot + journal store.
///
/// Each call is atomic on its own: a snapshot is either fully written or not
/// visible, an event is either fully appended or not.  Implementations are
/// `Send + Sync`; callers serialise writes through one owner.
pub trait PersistenceGateway: Send + Sync {
    /// Persist `snapshot` as covering every event up to and including `seq`.
    fn snapshot(&self, seq: u64, snapshot: &RegistrySnapshot) -> StoreResult<()>;

    /// Append one committed event to the journal.
    ///
    /// Appending an event whose `seq` is already journalled with the same
    /// content succeeds and changes nothing durable, so a commit can be
    /// retried after an error whose write actually landed.
    fn append_event(&self, event: &InventoryEvent) -> StoreResult<()>;

    /// Record that job ids below `through` may be in use.
    fn reserve_job_ids(&self, through: u64) -> StoreResult<()>;

    /// The latest snapshot plus every event journalled after it.
    fn recover(&self) -> StoreResult<Recovered>;

    /// The whole journal in `seq` order, one event per `seq`
    /// (operations-log export).
    fn journal(&self) -> StoreResult<Vec<InventoryEvent>>;

    /// Flush buffered state.  Idempotent.
    fn finish(&self) -> StoreResult<()> {
        Ok(())
    }
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for Box<G> {
    fn snapshot(&self, seq: u64, snapshot: &RegistrySnapshot) -> StoreResult<()> {
        (**self).snapshot(seq, snapshot)
    }

    fn append_event(&self, event: &InventoryEvent) -> StoreResult<()> {
        (**self).append_event(event)
    }

    fn reserve_job_ids(&self, through: u64) -> StoreResult<()> {
        (**self).reserve_job_ids(through)
    }

    fn recover(&self) -> StoreResult<Recovered> {
        (**self).recover()
    }

    fn journal(&self) -> StoreResult<Vec<InventoryEvent>> {
        (**self).journal()
    }

    fn finish(&self) -> StoreResult<()> {
        (**self).finish()
    }
}
