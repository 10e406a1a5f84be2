//! # Engine - redka storage engine
//!
//! The central orchestrator that ties together the [`wal`], [`record`], and
//! [`sstable`] crates into a complete store of field-versioned records.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → WAL append (consolidate on 5th     │
//! │              |         write per id)          │
//! │              |  (WAL size >= wal_max?)        │
//! │              |            yes                 │
//! │              v                                │
//! │        flush_wal() → one L0 SSTable           │
//! │              |                                │
//! │              v                                │
//! │        compact(0) → cascade into L1, L2, …    │
//! │                                               │
//! │ read.rs → fold SSTs oldest→newest, then WAL   │
//! │            (version-dominant merge)           │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                             |
//! |----------------|-----------------------------------------------------|
//! | `lib.rs`       | `Engine` struct, constructor, accessors             |
//! | [`levels`]     | `L0..Ln` directory layout, rescan after changes     |
//! | [`write`]      | `update()`, `put()`, WAL overflow flush             |
//! | [`read`]       | `read()` by id across WAL + SSTs, `get()` from SSTs |
//! | [`compaction`] | per-level merge with size-tiered promotion          |
//!
//! ## Levels
//!
//! ```text
//! ┌────────────────────────────┐  ← freshest, merged last on reads
//! │ WAL (segment index)        │
//! ├────────────────────────────┤  ← ingest tier, from WAL flushes
//! │ L0 SSTables                │
//! ├────────────────────────────┤  ← promoted when a level reaches
//! │ L1, L2, … SSTables         │    10·10^l distinct keys
//! └────────────────────────────┘
//! ```
//!
//! Unlike a first-match-wins LSM, every layer holding a key contributes:
//! records are folded field by field, higher versions dominating and the
//! newest write winning version ties.

mod compaction;
mod levels;
mod read;
mod write;

use anyhow::Result;
use std::path::{Path, PathBuf};
use wal::Wal;

pub use wal::WAL_MAX_SIZE;

/// Distinct-key threshold of level 0; level *l* promotes at
/// `LEVEL_BASE_SIZE * 10^l`.
pub const LEVEL_BASE_SIZE: u64 = 10;

/// The storage engine: a WAL front and the on-disk LSM levels.
///
/// Constructed once at startup and passed to every connection task. All
/// operations take `&mut self`; the single-threaded cooperative runtime
/// never interleaves two of them, which is what makes the unlocked WAL
/// index and level lists sound.
pub struct Engine {
    pub(crate) wal: Wal,
    pub(crate) db_dir: PathBuf,
    /// One file list per level, newest-first (reverse lexicographic).
    pub(crate) levels: Vec<Vec<PathBuf>>,
    /// WAL size that triggers the flush-to-L0 on the next write.
    pub(crate) wal_max: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("db_dir", &self.db_dir)
            .field("wal_size", &self.wal.size())
            .field("wal_ids", &self.wal.len())
            .field("wal_max", &self.wal_max)
            .field(
                "level_files",
                &self.levels.iter().map(Vec::len).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Engine {
    /// Opens the engine: creates the database directory (with its `L0`
    /// ingest tier), opens the WAL — rebuilding its segment index from the
    /// intact line prefix — and scans the level directories.
    pub fn new<P1: AsRef<Path>, P2: AsRef<Path>>(
        wal_path: P1,
        db_dir: P2,
        wal_max: u64,
    ) -> Result<Self> {
        let db_dir = db_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(db_dir.join("L0"))?;

        let wal = Wal::open(wal_path)?;

        let mut engine = Self {
            wal,
            db_dir,
            levels: Vec::new(),
            wal_max,
        };
        engine.load_levels()?;
        Ok(engine)
    }

    /// The WAL, for inspection.
    #[must_use]
    pub fn wal(&self) -> &Wal {
        &self.wal
    }

    /// Number of level directories present on disk.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Number of SSTable files at `level` (0 when the level is absent).
    #[must_use]
    pub fn level_file_count(&self, level: usize) -> usize {
        self.levels.get(level).map_or(0, Vec::len)
    }

    /// Distinct-key count at which `level` promotes into the next one.
    #[must_use]
    pub fn level_capacity(level: usize) -> u64 {
        LEVEL_BASE_SIZE * 10u64.pow(level as u32)
    }
}

#[cfg(test)]
mod tests;
