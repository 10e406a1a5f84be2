//! Read path: `read()` by id across WAL and SSTs, `get()` from SSTs alone.
//!
//! Unlike a first-match-wins LSM there is no early return: every layer
//! holding the key contributes fields, folded with the version-dominant
//! merge. The scan runs strictly oldest→newest — deepest level first,
//! oldest file first within a level, WAL last — so that the newly found
//! (newer) record sits on the right of each merge and the newest write
//! wins version ties.

use anyhow::Result;
use record::Record;
use sstable::SstReader;
use std::path::Path;
use tracing::warn;

use crate::Engine;

impl Engine {
    /// Looks up an id across the SSTable levels and the WAL.
    ///
    /// Equivalent to the left-fold merge of every surviving write for the
    /// id, regardless of how the writes are split between WAL segments and
    /// SSTables. `None` when the id has never been written.
    pub fn read(&mut self, id: &str) -> Result<Option<Record>> {
        let from_ssts = self.get(id)?;
        let from_wal = self.wal.read_by_id(id);

        Ok(match (from_ssts, from_wal) {
            (Some(mut acc), Some(newer)) => {
                // WAL entries postdate everything flushed to disk.
                acc.merge(&newer);
                Some(acc)
            }
            (acc, None) => acc,
            (None, newer) => newer,
        })
    }

    /// Point lookup across the SSTable levels only.
    ///
    /// Levels are rescanned first so the walk observes a consistent
    /// post-compaction snapshot. Every SSTable is binary-searched; hits
    /// fold into the accumulator with the newly found record on the right.
    pub fn get(&mut self, key: &str) -> Result<Option<Record>> {
        self.load_levels()?;

        let mut acc: Option<Record> = None;
        for level_files in self.levels.iter().rev() {
            for path in level_files.iter().rev() {
                let found = match SstReader::open(path) {
                    Ok(reader) => reader.get(key),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable sstable");
                        continue;
                    }
                };
                let Some(found) = found else { continue };
                match acc.as_mut() {
                    Some(merged) => merged.merge(&found),
                    None => acc = Some(found),
                }
            }
        }
        Ok(acc)
    }
}

/// All entries of one SSTable, or nothing if the file cannot be read — a
/// damaged table never fails a compaction pass.
pub(crate) fn read_sst_entries(path: &Path) -> Vec<(String, Record)> {
    match SstReader::open(path) {
        Ok(reader) => reader.entries(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable sstable");
            Vec::new()
        }
    }
}
