//! File-backed gateway: a JSON snapshot plus a JSON-lines journal.
//!
//! ```text
//! <dir>/snapshot.json   {"seq": N, "snapshot": {...}}   replaced atomically
//! <dir>/job_ids.json    {"through": N}                  replaced atomically
//! <dir>/events.jsonl    one InventoryEvent per line     append-only
//! ```
//!
//! The snapshot is written to `snapshot.json.tmp`, synced, then renamed over
//! the old file, so a crash leaves either the old or the new snapshot.  A
//! crash mid-append can leave a torn last line in the journal: `open` cuts
//! it off before appending, and recovery ignores an unparseable *final* line
//! while rejecting one anywhere else.
//!
//! A failed append truncates the journal back to where it started.  If the
//! line was in fact durable and the truncation fails too, the retried commit
//! journals the same `seq` twice; recovery keeps the first copy.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use asrs_registry::RegistrySnapshot;

use crate::gateway::in_seq_order;
use crate::{InventoryEvent, PersistenceGateway, Recovered, StoreError, StoreResult};

const SNAPSHOT_FILE: &str = "snapshot.json";
const JOB_IDS_FILE: &str = "job_ids.json";
const EVENTS_FILE: &str = "events.jsonl";

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    seq:      u64,
    snapshot: RegistrySnapshot,
}

#[derive(Serialize, Deserialize)]
struct JobIdsFile {
    through: u64,
}

pub struct JsonlGateway {
    dir:    PathBuf,
    events: Mutex<File>,
}

impl JsonlGateway {
    /// Open (or create) the store in `dir`.  Existing files are kept.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(EVENTS_FILE);
        truncate_torn_tail(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { dir: dir.to_path_buf(), events: Mutex::new(file) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn writer(&self) -> MutexGuard<'_, File> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write `value` as JSON to `name` via a synced temp file and a rename.
    fn replace_file<T: Serialize>(&self, name: &str, value: &T) -> StoreResult<()> {
        let tmp = self.dir.join(format!("{name}.tmp"));
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut out, value)?;
            out.flush()?;
            out.get_ref().sync_all()?;
        }
        fs::rename(&tmp, self.dir.join(name))?;
        Ok(())
    }

    fn read_file<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let file = BufReader::new(File::open(path)?);
        Ok(Some(serde_json::from_reader(file)?))
    }

    fn read_journal(&self) -> StoreResult<Vec<InventoryEvent>> {
        let file = BufReader::new(File::open(self.dir.join(EVENTS_FILE))?);
        let lines: Vec<String> = file.lines().collect::<Result<_, _>>()?;
        let last = lines.len().saturating_sub(1);
        let mut events = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<InventoryEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) if i == last => {
                    warn!(error = %e, "ignoring torn final journal line");
                }
                Err(e) => {
                    return Err(StoreError::Corrupt(format!("{EVENTS_FILE} line {}: {e}", i + 1)));
                }
            }
        }
        Ok(events)
    }
}

/// Drop any bytes after the last newline of the journal.
fn truncate_torn_tail(path: &Path) -> StoreResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let keep = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    if keep < bytes.len() {
        warn!(path = %path.display(), dropped = bytes.len() - keep, "truncating torn journal tail");
        file.set_len(keep as u64)?;
    }
    Ok(())
}

impl PersistenceGateway for JsonlGateway {
    fn snapshot(&self, seq: u64, snapshot: &RegistrySnapshot) -> StoreResult<()> {
        self.replace_file(SNAPSHOT_FILE, &SnapshotFile { seq, snapshot: snapshot.clone() })
    }

    fn append_event(&self, event: &InventoryEvent) -> StoreResult<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let mut file = self.writer();
        let start = file.metadata()?.len();
        if let Err(e) = file.write_all(&line).and_then(|()| file.sync_data()) {
            if let Err(undo) = file.set_len(start) {
                warn!(seq = event.seq, error = %undo, "could not roll back a failed append");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn reserve_job_ids(&self, through: u64) -> StoreResult<()> {
        let current = self.read_file::<JobIdsFile>(JOB_IDS_FILE)?.map_or(0, |f| f.through);
        if through <= current {
            return Ok(());
        }
        self.replace_file(JOB_IDS_FILE, &JobIdsFile { through })
    }

    fn recover(&self) -> StoreResult<Recovered> {
        let (snapshot_seq, snapshot) = match self.read_file::<SnapshotFile>(SNAPSHOT_FILE)? {
            Some(f) => (f.seq, f.snapshot),
            None => (0, RegistrySnapshot::default()),
        };
        let job_ids = self.read_file::<JobIdsFile>(JOB_IDS_FILE)?.map_or(0, |f| f.through);
        Ok(Recovered::new(snapshot, snapshot_seq, self.read_journal()?, job_ids))
    }

    fn journal(&self) -> StoreResult<Vec<InventoryEvent>> {
        Ok(in_seq_order(self.read_journal()?))
    }

    fn finish(&self) -> StoreResult<()> {
        self.writer().sync_all()?;
        Ok(())
    }
}
