//! # MapFile — memory-mapped file ownership
//!
//! Thin wrappers over [`memmap2`] used by the WAL and the SSTable code.
//!
//! [`MappedFile`] owns a writable mapping together with a *logical tail*:
//! the number of bytes that hold records, as opposed to the mapped capacity,
//! which is pre-grown in fixed chunks so that appends rarely remap. The two
//! sizes coincide only when the caller resizes to an exact length (the
//! SSTable writer does; the WAL does not).
//!
//! [`MappedView`] is the read-only counterpart for immutable files.
//!
//! Durability contract: bytes are flushed to disk before [`MappedFile::append`]
//! returns.

use std::fs::{File, OpenOptions};
use std::path::Path;

use memmap2::{Mmap, MmapMut};
use thiserror::Error;

/// Fresh writable files are preallocated to this size, and the mapping grows
/// in multiples of it.
pub const GROWTH_CHUNK: usize = 4096;

/// Errors from mapping, resizing, or appending.
#[derive(Debug, Error)]
pub enum MapFileError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An append would exceed the mapped capacity and growth is disabled.
    #[error("append of {requested} bytes exceeds capacity {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
}

/// A writable memory-mapped file with an append cursor.
pub struct MappedFile {
    file: File,
    map: MmapMut,
    /// Logical size: bytes occupied by records, `<= map.len()`.
    tail: usize,
}

impl MappedFile {
    /// Opens (or creates) `path` writable. Fresh or empty files are
    /// preallocated to [`GROWTH_CHUNK`] bytes. The tail starts at the
    /// on-disk size for pre-existing files and at zero for fresh ones;
    /// callers that track a logical size themselves (the WAL recovery
    /// scan) fix it up via [`set_tail`](Self::set_tail).
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, MapFileError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let disk_len = file.metadata()?.len() as usize;
        let tail = disk_len;
        if disk_len == 0 {
            file.set_len(GROWTH_CHUNK as u64)?;
        }

        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { file, map, tail })
    }

    /// Bytes occupied by records (the logical size).
    #[must_use]
    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Mapped capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.map.len()
    }

    /// Moves the logical tail; used after a recovery scan has located the
    /// end of the intact prefix. Clamped to the mapped capacity.
    pub fn set_tail(&mut self, tail: usize) {
        self.tail = tail.min(self.map.len());
    }

    /// The mapped bytes up to the logical tail.
    #[must_use]
    pub fn records(&self) -> &[u8] {
        &self.map[..self.tail]
    }

    /// The whole mapping, capacity included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.map[..]
    }

    /// Appends `bytes` at the tail, growing the mapping in
    /// [`GROWTH_CHUNK`] multiples when needed, and flushes the written
    /// range to disk before returning.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), MapFileError> {
        let end = self.tail + bytes.len();
        if end > self.map.len() {
            let new_len = end.div_ceil(GROWTH_CHUNK) * GROWTH_CHUNK;
            self.remap(new_len)?;
        }

        self.map[self.tail..end].copy_from_slice(bytes);
        self.map.flush_range(self.tail, bytes.len())?;
        self.tail = end;
        Ok(())
    }

    /// Writes `bytes` at an absolute offset inside the current capacity.
    /// Does not move the tail and does not flush; the SSTable writer lays
    /// out sections this way after a single exact [`resize`](Self::resize)
    /// and issues one [`flush`](Self::flush) at the end.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<(), MapFileError> {
        let end = offset + bytes.len();
        if end > self.map.len() {
            return Err(MapFileError::CapacityExceeded {
                requested: end,
                capacity: self.map.len(),
            });
        }
        self.map[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Resizes the file and mapping to exactly `new_len` bytes. The tail is
    /// clamped if the file shrank.
    pub fn resize(&mut self, new_len: usize) -> Result<(), MapFileError> {
        self.remap(new_len)?;
        self.tail = self.tail.min(new_len);
        Ok(())
    }

    /// Flushes the whole mapping to disk.
    pub fn flush(&self) -> Result<(), MapFileError> {
        self.map.flush()?;
        Ok(())
    }

    /// Empties the file: truncate to zero, re-grow to [`GROWTH_CHUNK`],
    /// remap, reset the tail.
    pub fn truncate(&mut self) -> Result<(), MapFileError> {
        self.file.set_len(0)?;
        self.remap(GROWTH_CHUNK)?;
        self.tail = 0;
        Ok(())
    }

    fn remap(&mut self, new_len: usize) -> Result<(), MapFileError> {
        self.file.set_len(new_len as u64)?;
        self.map = unsafe { MmapMut::map_mut(&self.file)? };
        Ok(())
    }
}

/// A read-only mapping of an immutable file.
pub struct MappedView {
    map: Mmap,
}

impl MappedView {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MapFileError> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map })
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.map[..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.len() == 0
    }
}
