//! Compaction: merges a level's SSTables and promotes them when the level
//! reaches its distinct-key capacity.
//!
//! Files within a level are visited newest-first. When a key repeats, the
//! record already collected came from a newer file, so it stays on the
//! *right* of the merge — higher field versions dominate and the newer file
//! wins version ties. Promotion writes a single SSTable at the next level,
//! deletes the inputs, and cascades.

use anyhow::{Context, Result};
use record::Record;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::info;

use crate::{read::read_sst_entries, Engine};
use sstable::SstWriter;

impl Engine {
    /// Compacts `level`, promoting into `level + 1` when the merged
    /// distinct-key count reaches [`Engine::level_capacity`]. Below the
    /// threshold nothing moves; later writes may trigger it again.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure while writing the merged SSTable or
    /// deleting the inputs. Unreadable input files are skipped, not fatal.
    pub fn compact(&mut self, level: usize) -> Result<()> {
        if level >= self.levels.len() {
            return Ok(());
        }

        let mut merged: BTreeMap<String, Record> = BTreeMap::new();
        for path in &self.levels[level] {
            for (key, fields) in read_sst_entries(path) {
                match merged.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(fields);
                    }
                    Entry::Occupied(mut slot) => {
                        // The resident record came from a newer file: merge
                        // with it on the right so it wins version ties.
                        let mut folded = fields;
                        folded.merge(slot.get());
                        slot.insert(folded);
                    }
                }
            }
        }

        if (merged.len() as u64) < Self::level_capacity(level) {
            return Ok(());
        }

        // BTreeMap iteration gives the strictly ascending key order the
        // SSTable writer requires.
        let entries: Vec<(String, Record)> = merged.into_iter().collect();
        let target = self.next_sst_path(level + 1)?;
        SstWriter::write(&target, &entries)?;

        info!(
            level,
            keys = entries.len(),
            target = %target.display(),
            "level promoted"
        );

        for path in &self.levels[level] {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to remove compacted {}", path.display()))?;
        }

        self.load_levels()?;
        self.compact(level + 1)
    }
}
