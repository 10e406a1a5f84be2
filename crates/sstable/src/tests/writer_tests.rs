use super::{rec, sample_entries};
use crate::format::{read_header, HEADER_SIZE, INDEX_ENTRY_SIZE};
use crate::SstWriter;
use anyhow::Result;
use tempfile::tempdir;

#[test]
fn write_empty_entry_set_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.sst");

    let result = SstWriter::write(&path, &[]);
    assert!(result.is_err(), "writing an empty sstable should fail");
    assert!(
        result.unwrap_err().to_string().contains("empty"),
        "error message should mention 'empty'"
    );
}

#[test]
fn write_rejects_unsorted_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unsorted.sst");

    let entries = vec![
        ("b".to_string(), rec("{x:1}")),
        ("a".to_string(), rec("{y:2}")),
    ];
    assert!(SstWriter::write(&path, &entries).is_err());

    let dupes = vec![
        ("a".to_string(), rec("{x:1}")),
        ("a".to_string(), rec("{y:2}")),
    ];
    assert!(SstWriter::write(&path, &dupes).is_err());
}

#[test]
fn file_size_is_exact() -> Result<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exact.sst");

    let entries = sample_entries();
    SstWriter::write(&path, &entries)?;

    let payload: usize = entries
        .iter()
        .map(|(k, r)| 4 + k.len() + r.body().len())
        .sum();
    let expected = HEADER_SIZE + payload + entries.len() * INDEX_ENTRY_SIZE;
    assert_eq!(std::fs::metadata(&path)?.len(), expected as u64);
    Ok(())
}

#[test]
fn header_matches_layout() -> Result<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("header.sst");

    let entries = sample_entries();
    SstWriter::write(&path, &entries)?;

    let bytes = std::fs::read(&path)?;
    let header = read_header(&bytes).unwrap();
    assert_eq!(header.entry_count, 3);

    let payload: usize = entries
        .iter()
        .map(|(k, r)| 4 + k.len() + r.body().len())
        .sum();
    assert_eq!(header.index_offset, (HEADER_SIZE + payload) as u64);
    Ok(())
}
