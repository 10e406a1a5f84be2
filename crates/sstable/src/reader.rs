use anyhow::{bail, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use mapfile::MappedView;
use record::Record;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::format::{read_header, read_index_entry, HEADER_SIZE, INDEX_ENTRY_SIZE};

/// One decoded index slot: the key and its fields window in the mapping.
struct IndexedEntry {
    key: String,
    fields: Range<usize>,
}

/// Reads an SSTable for point lookups and full scans.
///
/// [`open`](SstReader::open) maps the file read-only, validates the header
/// and index bounds, and decodes the index eagerly. Individual entries with
/// invalid windows, inconsistent lengths, or non-UTF-8 bytes are skipped
/// with a warning — a damaged entry never fails the whole table. Lookups
/// binary-search the (key-sorted) index and parse the fields blob on hit.
pub struct SstReader {
    /// Path to the `.sst` file (kept for diagnostics).
    #[allow(dead_code)]
    path: PathBuf,
    view: MappedView,
    entries: Vec<IndexedEntry>,
}

impl SstReader {
    /// Opens and validates an SSTable file.
    ///
    /// # Errors
    ///
    /// Fails when the file is smaller than the header, declares zero
    /// entries, or its index extends past the end of the file. Per-entry
    /// damage is skipped, not propagated.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let view = MappedView::open(&path)
            .with_context(|| format!("failed to map sstable {}", path.display()))?;
        let data = view.as_bytes();

        let Some(header) = read_header(data) else {
            bail!("sstable {} smaller than header", path.display());
        };
        if header.entry_count == 0 {
            bail!("sstable {} declares zero entries", path.display());
        }

        let entry_count = header.entry_count as usize;
        let index_offset = header.index_offset as usize;
        let index_end = index_offset
            .checked_add(entry_count * INDEX_ENTRY_SIZE)
            .filter(|&end| end <= data.len() && index_offset >= HEADER_SIZE);
        if index_end.is_none() {
            bail!("sstable {} index out of bounds", path.display());
        }

        let mut entries = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let slot = index_offset + i * INDEX_ENTRY_SIZE;
            let Some(decoded) = read_index_entry(data, slot).and_then(|ie| decode_entry(data, ie))
            else {
                warn!(path = %path.display(), slot = i, "skipping malformed sstable entry");
                continue;
            };
            entries.push(decoded);
        }

        Ok(Self {
            path,
            view,
            entries,
        })
    }

    /// Point lookup by key. The index is sorted, so this is a binary
    /// search plus one fields-blob parse on hit.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Record> {
        let i = self
            .entries
            .binary_search_by(|e| e.key.as_str().cmp(key))
            .ok()?;
        Some(self.decode_fields(i))
    }

    /// All live entries in on-disk (ascending key) order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Record)> {
        (0..self.entries.len())
            .map(|i| (self.entries[i].key.clone(), self.decode_fields(i)))
            .collect()
    }

    /// Number of live (undamaged) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    fn decode_fields(&self, i: usize) -> Record {
        let window = &self.view.as_bytes()[self.entries[i].fields.clone()];
        // UTF-8 validated at open; an empty record is the lenient fallback.
        std::str::from_utf8(window)
            .map(Record::parse)
            .unwrap_or_default()
    }
}

/// Validates one index slot against the payload it points at.
///
/// The payload block is `total_len: u32`, key bytes, fields bytes. The
/// block's own `total_len` governs the fields extent; the index's
/// `key_length` locates the key inside it.
fn decode_entry(data: &[u8], ie: crate::format::IndexEntry) -> Option<IndexedEntry> {
    let block_start = usize::try_from(ie.data_offset).ok()?;
    let key_len = ie.key_length as usize;

    let prefix_end = block_start.checked_add(4)?;
    let total_len = LittleEndian::read_u32(data.get(block_start..prefix_end)?) as usize;
    let block_end = prefix_end.checked_add(total_len)?;
    if block_end > data.len() || total_len != ie.data_length as usize {
        return None;
    }
    if key_len == 0 || key_len > total_len {
        return None;
    }

    let key = std::str::from_utf8(&data[prefix_end..prefix_end + key_len]).ok()?;
    let fields = prefix_end + key_len..block_end;
    std::str::from_utf8(&data[fields.clone()]).ok()?;

    Some(IndexedEntry {
        key: key.to_string(),
        fields,
    })
}
