use anyhow::{ensure, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use mapfile::MappedFile;
use record::Record;
use std::path::Path;

use crate::format::{write_header, write_index_entry, Header, IndexEntry, HEADER_SIZE, INDEX_ENTRY_SIZE};

pub struct SstWriter {}

impl SstWriter {
    /// Writes an SSTable at `path` from entries pre-sorted strictly
    /// ascending by key.
    ///
    /// The exact file size is computed up front, the file is mapped
    /// writable and resized once, and the three sections are laid out in
    /// place: header, payload blocks in entry order, then the index footer
    /// at `index_offset`. One flush at the end makes the file durable.
    /// SSTables are written exactly once and never mutated.
    ///
    /// # Errors
    ///
    /// Fails on an empty entry set, unsorted keys, keys longer than
    /// `u32::MAX`, or any mapping/IO failure.
    pub fn write(path: &Path, entries: &[(String, Record)]) -> Result<()> {
        ensure!(!entries.is_empty(), "refusing to write an empty sstable");
        for pair in entries.windows(2) {
            ensure!(
                pair[0].0.as_bytes() < pair[1].0.as_bytes(),
                "sstable entries must be strictly ascending by key"
            );
        }

        // Serialize every fields blob once; sizes drive the layout.
        let bodies: Vec<String> = entries.iter().map(|(_, rec)| rec.body()).collect();

        let payload_size: usize = entries
            .iter()
            .zip(&bodies)
            .map(|((key, _), body)| 4 + key.len() + body.len())
            .sum();
        let index_offset = HEADER_SIZE + payload_size;
        let total_size = index_offset + entries.len() * INDEX_ENTRY_SIZE;

        let mut file = MappedFile::create(path)
            .with_context(|| format!("failed to create sstable at {}", path.display()))?;
        file.resize(total_size)?;

        let mut header_buf = [0u8; HEADER_SIZE];
        write_header(
            &mut header_buf,
            Header {
                entry_count: entries.len() as u32,
                index_offset: index_offset as u64,
            },
        );
        file.write_at(0, &header_buf)?;

        let mut data_offset = HEADER_SIZE;
        let mut index_pos = index_offset;
        let mut block = Vec::new();
        let mut slot = [0u8; INDEX_ENTRY_SIZE];

        for ((key, _), body) in entries.iter().zip(&bodies) {
            let total_len = key.len() + body.len();
            ensure!(
                key.len() <= u32::MAX as usize && total_len <= u32::MAX as usize,
                "sstable entry too large"
            );

            block.clear();
            block.resize(4, 0);
            LittleEndian::write_u32(&mut block[0..4], total_len as u32);
            block.extend_from_slice(key.as_bytes());
            block.extend_from_slice(body.as_bytes());
            file.write_at(data_offset, &block)?;

            write_index_entry(
                &mut slot,
                IndexEntry {
                    key_length: key.len() as u32,
                    data_offset: data_offset as u64,
                    data_length: total_len as u32,
                },
            );
            file.write_at(index_pos, &slot)?;

            data_offset += 4 + total_len;
            index_pos += INDEX_ENTRY_SIZE;
        }

        file.flush()?;
        Ok(())
    }
}
