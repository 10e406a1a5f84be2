//! On-disk layout constants and field codecs.
//!
//! All integers are little-endian and tightly packed (no padding), so the
//! header is 12 bytes and each index entry is 16.

use byteorder::{ByteOrder, LittleEndian};

/// `entry_count: u32` + `index_offset: u64`.
pub const HEADER_SIZE: usize = 12;

/// `key_length: u32` + `data_offset: u64` + `data_length: u32`.
pub const INDEX_ENTRY_SIZE: usize = 16;

/// The fixed-size header at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub entry_count: u32,
    pub index_offset: u64,
}

/// One footer index slot, sorted by key in file order.
///
/// `data_offset` points at a payload block (`total_len: u32`, key bytes,
/// fields bytes); `data_length` is that block's `total_len`, i.e. the key
/// and fields bytes without the 4-byte length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub key_length: u32,
    pub data_offset: u64,
    pub data_length: u32,
}

pub fn read_header(data: &[u8]) -> Option<Header> {
    if data.len() < HEADER_SIZE {
        return None;
    }
    Some(Header {
        entry_count: LittleEndian::read_u32(&data[0..4]),
        index_offset: LittleEndian::read_u64(&data[4..12]),
    })
}

pub fn write_header(buf: &mut [u8], header: Header) {
    LittleEndian::write_u32(&mut buf[0..4], header.entry_count);
    LittleEndian::write_u64(&mut buf[4..12], header.index_offset);
}

/// Reads the index entry starting at `offset`; `None` if the window falls
/// outside `data`.
pub fn read_index_entry(data: &[u8], offset: usize) -> Option<IndexEntry> {
    let slot = data.get(offset..offset + INDEX_ENTRY_SIZE)?;
    Some(IndexEntry {
        key_length: LittleEndian::read_u32(&slot[0..4]),
        data_offset: LittleEndian::read_u64(&slot[4..12]),
        data_length: LittleEndian::read_u32(&slot[12..16]),
    })
}

pub fn write_index_entry(buf: &mut [u8], entry: IndexEntry) {
    LittleEndian::write_u32(&mut buf[0..4], entry.key_length);
    LittleEndian::write_u64(&mut buf[4..12], entry.data_offset);
    LittleEndian::write_u32(&mut buf[12..16], entry.data_length);
}
