//! Level directory layout and discovery.
//!
//! SSTables live under `<db_dir>/L<k>/`, named by a zero-padded nanosecond
//! timestamp so lexicographic order equals temporal order. The in-memory
//! lists keep each level newest-first; they are rebuilt from disk after
//! every structural change (flush, compaction) and before every lookup.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Engine;

impl Engine {
    pub(crate) fn level_dir(&self, level: usize) -> PathBuf {
        self.db_dir.join(format!("L{level}"))
    }

    /// Rescans `L0..Ln` until the first missing directory, sorting each
    /// level's `.sst` files newest-first.
    pub(crate) fn load_levels(&mut self) -> Result<()> {
        self.levels.clear();

        for level in 0.. {
            let dir = self.level_dir(level);
            if !dir.exists() {
                break;
            }

            let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
                .with_context(|| format!("failed to scan level dir {}", dir.display()))?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map(|ext| ext == "sst").unwrap_or(false))
                .collect();

            files.sort();
            files.reverse();
            self.levels.push(files);
        }

        Ok(())
    }

    /// Reserves a fresh SSTable path at `level`, creating the directory on
    /// demand. The filename is the current nanosecond timestamp, bumped
    /// past any collision so order stays monotonic.
    pub(crate) fn next_sst_path(&self, level: usize) -> Result<PathBuf> {
        let dir = self.level_dir(level);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create level dir {}", dir.display()))?;

        let mut nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        loop {
            let path = dir.join(format!("{nanos:020}.sst"));
            if !path.exists() {
                return Ok(path);
            }
            nanos += 1;
        }
    }
}
