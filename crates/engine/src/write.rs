//! Write path: `update()`/`create()`, `put()`, and the WAL overflow flush.
//!
//! Every mutation goes to the WAL first; the LSM tree only receives data
//! when the WAL crosses its size threshold and is flushed wholesale as one
//! L0 SSTable.

use anyhow::Result;
use record::Record;
use sstable::SstWriter;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::info;

use crate::Engine;

impl Engine {
    /// Records a brand-new id. Same write path as [`update`](Self::update);
    /// the distinction exists for the protocol layer, which allocates the
    /// id before calling in.
    pub fn create(&mut self, id: &str, fields: &Record) -> Result<()> {
        self.update(id, fields)
    }

    /// Appends one write for `id` to the WAL, flushing the whole log to L0
    /// first if it has reached the size threshold. A WAL sitting exactly at
    /// the threshold therefore flushes on this, the next, write.
    pub fn update(&mut self, id: &str, fields: &Record) -> Result<()> {
        if self.wal.size() >= self.wal_max {
            self.flush_wal()?;
        }
        self.wal.append(id, fields)?;
        Ok(())
    }

    /// Flushes the WAL into a single L0 SSTable and truncates it.
    ///
    /// The batch holds the merged record of every indexed id; after this
    /// the WAL file is empty, its index is cleared, and the data is only
    /// reachable through the levels.
    pub fn flush_wal(&mut self) -> Result<()> {
        let batch = self.wal.batch();
        let ids = batch.len();
        if !batch.is_empty() {
            self.flush_batch_to_l0(batch)?;
        }
        self.wal.truncate()?;
        info!(ids, "WAL flushed to L0");
        Ok(())
    }

    /// Writes a single-record SSTable into L0 and compacts.
    pub fn put(&mut self, key: &str, fields: &Record) -> Result<()> {
        let path = self.next_sst_path(0)?;
        SstWriter::write(&path, &[(key.to_string(), fields.clone())])?;
        self.load_levels()?;
        self.compact(0)
    }

    /// Writes a batch as one L0 SSTable and compacts.
    ///
    /// The batch is deduplicated by key with the version-dominant merge
    /// (later batch entries on the right) and sorted ascending, as the
    /// SSTable writer requires.
    pub(crate) fn flush_batch_to_l0(&mut self, batch: Vec<(String, Record)>) -> Result<()> {
        let mut dedup: BTreeMap<String, Record> = BTreeMap::new();
        for (key, fields) in batch {
            match dedup.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(fields);
                }
                Entry::Occupied(mut slot) => {
                    slot.get_mut().merge(&fields);
                }
            }
        }

        let entries: Vec<(String, Record)> = dedup.into_iter().collect();
        let path = self.next_sst_path(0)?;
        SstWriter::write(&path, &entries)?;

        self.load_levels()?;
        self.compact(0)
    }
}
