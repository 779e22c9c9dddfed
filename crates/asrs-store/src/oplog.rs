//! Operations log export.
//!
//! One CSV row per committed event:
//!
//! | Column      | Contents                              |
//! |-------------|---------------------------------------|
//! | `id`        | journal sequence number               |
//! | `box`       | box id                                |
//! | `sku`       | SKU at commit time                    |
//! | `operation` | `STORED` or `RETRIEVED`               |
//! | `tick`      | commit tick                           |
//! | `distance`  | steps travelled by the vehicle        |

use std::io;
use std::path::Path;

use csv::Writer;

use crate::{InventoryEvent, StoreResult};

const HEADER: [&str; 6] = ["id", "box", "sku", "operation", "tick", "distance"];

/// Write `events` as CSV to `writer`.  Returns the number of rows written.
pub fn write_operations<W: io::Write>(events: &[InventoryEvent], writer: W) -> StoreResult<usize> {
    let mut out = Writer::from_writer(writer);
    out.write_record(HEADER)?;
    for e in events {
        out.write_record(&[
            e.seq.to_string(),
            e.change.box_id().0.to_string(),
            e.sku.clone(),
            e.change.operation().to_string(),
            e.tick.0.to_string(),
            e.path_len.to_string(),
        ])?;
    }
    out.flush()?;
    Ok(events.len())
}

/// Write `events` to a CSV file at `path`, replacing it.
pub fn export_operations_csv(events: &[InventoryEvent], path: &Path) -> StoreResult<usize> {
    let file = std::fs::File::create(path)?;
    write_operations(events, io::BufWriter::new(file))
}
