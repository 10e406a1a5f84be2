//! # WAL — write-ahead log
//!
//! Append-only durability for the redka engine. Every create or update is
//! serialized as one text line and appended to a memory-mapped file
//! **before** it is acknowledged; the LSM tree only sees data when the WAL
//! overflows and is flushed wholesale.
//!
//! ## Entry format
//!
//! ```text
//! {@<id> {<record>}}\n
//! ```
//!
//! One entry per line, terminated by exactly one `\n`. Entries must not
//! embed a newline — the protocol layer rejects such frames before they
//! reach the WAL.
//!
//! ## Segment index
//!
//! An in-memory map `id → [Segment; 4]` tracks, per id, up to the four most
//! recent physical writes in append order (`offset == u64::MAX` marks a
//! vacant slot). When a fifth write for an id arrives, the four live
//! segments plus the incoming record are merged into a single consolidated
//! entry appended at the tail, and the index collapses back to one slot.
//! Stale segments stay on disk unreachable; their storage is reclaimed only
//! by [`Wal::truncate`].
//!
//! On open the index is rebuilt by scanning the intact line prefix of the
//! file, so a torn tail from a crash is ignored rather than fatal.

use std::collections::HashMap;
use std::path::Path;

use mapfile::{MapFileError, MappedFile};
use record::{KeyedRecord, Record};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Live on-disk segments an id may own between consolidations.
pub const SEGMENTS_PER_ID: usize = 4;

/// WAL size at which the engine flushes the whole log to L0 and truncates.
pub const WAL_MAX_SIZE: u64 = 4 * 1024 * 1024 * 1024;

/// Errors from WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("mapped file error: {0}")]
    Map(#[from] MapFileError),
}

/// One physical write: a byte window of the mapped file holding an entry
/// line (without its trailing newline).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    offset: u64,
    len: u64,
}

impl Segment {
    const VACANT: Segment = Segment {
        offset: u64::MAX,
        len: 0,
    };

    fn is_vacant(&self) -> bool {
        self.offset == u64::MAX
    }
}

/// The per-id slot array, filled in append order.
#[derive(Debug, Clone, Copy)]
struct Slots([Segment; SEGMENTS_PER_ID]);

impl Slots {
    fn empty() -> Self {
        Slots([Segment::VACANT; SEGMENTS_PER_ID])
    }

    /// Fills the next vacant slot; returns `false` when all four are taken.
    fn push(&mut self, seg: Segment) -> bool {
        for slot in &mut self.0 {
            if slot.is_vacant() {
                *slot = seg;
                return true;
            }
        }
        false
    }

    /// Collapses to a single live segment (post-consolidation shape).
    fn reset_to(&mut self, seg: Segment) {
        self.0 = [seg, Segment::VACANT, Segment::VACANT, Segment::VACANT];
    }

    fn live(&self) -> impl Iterator<Item = Segment> + '_ {
        self.0.iter().copied().take_while(|s| !s.is_vacant())
    }

    fn len(&self) -> usize {
        self.0.iter().filter(|s| !s.is_vacant()).count()
    }

    fn is_full(&self) -> bool {
        !self.0[SEGMENTS_PER_ID - 1].is_vacant()
    }
}

/// The write-ahead log: a mapped append-only file plus the segment index.
pub struct Wal {
    file: MappedFile,
    index: HashMap<String, Slots>,
}

impl Wal {
    /// Opens (or creates) the WAL at `path` and rebuilds the segment index
    /// by scanning intact lines from the start of the file.
    ///
    /// The scan stops at the first byte run that is not a well-formed entry
    /// line — a torn append, or the zeroed preallocation tail — and the
    /// logical tail is set to the end of the intact prefix. When a fifth
    /// line for an id is encountered it must be a consolidated entry
    /// written by a previous run, so the id's slots collapse to that line
    /// alone.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, WalError> {
        let mut file = MappedFile::create(path)?;
        let mut index: HashMap<String, Slots> = HashMap::new();

        let mut pos = 0;
        {
            let data = file.as_bytes();
            while pos < data.len() {
                let Some(nl) = data[pos..].iter().position(|&b| b == b'\n') else {
                    break;
                };
                let line = &data[pos..pos + nl];
                let Some(entry) = std::str::from_utf8(line).ok().and_then(KeyedRecord::parse)
                else {
                    break;
                };

                let seg = Segment {
                    offset: pos as u64,
                    len: nl as u64,
                };
                let slots = index.entry(entry.key).or_insert_with(Slots::empty);
                if !slots.push(seg) {
                    slots.reset_to(seg);
                }
                pos += nl + 1;
            }
        }
        file.set_tail(pos);

        info!(ids = index.len(), tail = pos, "WAL opened");
        Ok(Self { file, index })
    }

    /// Appends one entry for `id`.
    ///
    /// If the id already owns four live segments, the append consolidates:
    /// the four segments are read back, left-fold-merged oldest to newest,
    /// merged with the incoming fields (rightmost, so the new write wins
    /// version ties), and rewritten as a single entry at the tail; the
    /// index for the id collapses to that one segment.
    pub fn append(&mut self, id: &str, fields: &Record) -> Result<(), WalError> {
        if self.index.get(id).is_some_and(Slots::is_full) {
            return self.consolidate(id, fields);
        }

        let seg = self.append_entry(id, fields)?;
        let pushed = self
            .index
            .entry(id.to_string())
            .or_insert_with(Slots::empty)
            .push(seg);
        debug_assert!(pushed, "free slot vanished between check and push");
        Ok(())
    }

    /// Merges the live segments for `id` in slot order (append order,
    /// oldest first). `None` when the id is not indexed.
    #[must_use]
    pub fn read_by_id(&self, id: &str) -> Option<Record> {
        let slots = self.index.get(id)?;
        let mut acc: Option<Record> = None;
        for seg in slots.live() {
            let Some(entry) = self.parse_segment(seg) else {
                warn!(id, offset = seg.offset, "skipping unreadable WAL segment");
                continue;
            };
            match acc.as_mut() {
                Some(merged) => merged.merge(&entry.fields),
                None => acc = Some(entry.fields),
            }
        }
        acc
    }

    /// The merged record of every indexed id — the batch handed to the LSM
    /// when the WAL overflows.
    #[must_use]
    pub fn batch(&self) -> Vec<(String, Record)> {
        self.index
            .keys()
            .filter_map(|id| self.read_by_id(id).map(|rec| (id.clone(), rec)))
            .collect()
    }

    /// Truncates the file to empty and clears the index. This is the only
    /// point at which stale segment storage is reclaimed.
    pub fn truncate(&mut self) -> Result<(), WalError> {
        let dropped = self.index.len();
        self.file.truncate()?;
        self.index.clear();
        info!(ids = dropped, "WAL truncated");
        Ok(())
    }

    /// Logical size in bytes (the record tail, not the mapped capacity).
    #[must_use]
    pub fn size(&self) -> u64 {
        self.file.tail() as u64
    }

    /// Number of ids currently indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live segment count for an id (at most [`SEGMENTS_PER_ID`]).
    #[must_use]
    pub fn segment_count(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, Slots::len)
    }

    fn consolidate(&mut self, id: &str, fields: &Record) -> Result<(), WalError> {
        let mut merged = self.read_by_id(id).unwrap_or_default();
        merged.merge(fields);

        let seg = self.append_entry(id, &merged)?;
        if let Some(slots) = self.index.get_mut(id) {
            slots.reset_to(seg);
        }
        debug!(id, "WAL segments consolidated");
        Ok(())
    }

    fn append_entry(&mut self, id: &str, fields: &Record) -> Result<Segment, WalError> {
        let line = format!("{{@{id} {fields}}}\n");
        debug_assert!(
            !line[..line.len() - 1].contains('\n'),
            "WAL entry must not embed a newline"
        );

        let offset = self.file.tail() as u64;
        self.file.append(line.as_bytes())?;
        Ok(Segment {
            offset,
            len: (line.len() - 1) as u64,
        })
    }

    fn parse_segment(&self, seg: Segment) -> Option<KeyedRecord> {
        let start = seg.offset as usize;
        let end = start + seg.len as usize;
        let line = self.file.as_bytes().get(start..end)?;
        KeyedRecord::parse(std::str::from_utf8(line).ok()?)
    }
}
