use super::helpers::{count_sst_files, rec, test_engine, test_engine_with_wal_max};
use anyhow::Result;
use tempfile::tempdir;

#[test]
fn flush_wal_writes_one_l0_sstable_and_truncates() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);

    engine.update("u1", &rec(r#"{a:"1"}"#))?;
    engine.update("u1", &rec(r#"{b:"2"}"#))?;
    engine.update("u2", &rec(r#"{c:"3"}"#))?;

    engine.flush_wal()?;

    assert!(engine.wal().is_empty());
    assert_eq!(engine.wal().size(), 0);
    assert_eq!(count_sst_files(&dir, 0), 1);

    assert_eq!(engine.read("u1")?.unwrap().to_string(), r#"{a:"1" b:"2"}"#);
    assert_eq!(engine.read("u2")?.unwrap().to_string(), r#"{c:"3"}"#);
    Ok(())
}

#[test]
fn flush_of_an_empty_wal_writes_nothing() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);

    engine.flush_wal()?;
    assert_eq!(count_sst_files(&dir, 0), 0);
    Ok(())
}

#[test]
fn wal_at_threshold_flushes_on_the_next_write() -> Result<()> {
    let dir = tempdir()?;
    // Any first append pushes the WAL past one byte.
    let mut engine = test_engine_with_wal_max(&dir, 1);

    engine.update("u1", &rec(r#"{a:"1"}"#))?;
    assert_eq!(count_sst_files(&dir, 0), 0, "first write only lands in the WAL");

    engine.update("u2", &rec(r#"{b:"2"}"#))?;
    assert_eq!(count_sst_files(&dir, 0), 1, "second write flushed the first");
    assert_eq!(engine.wal().len(), 1, "only u2 remains in the WAL");

    assert_eq!(engine.read("u1")?.unwrap().to_string(), r#"{a:"1"}"#);
    assert_eq!(engine.read("u2")?.unwrap().to_string(), r#"{b:"2"}"#);
    Ok(())
}

#[test]
fn flushed_and_live_writes_merge_on_read() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);

    engine.update("u1", &rec(r#"{x:"old" keep:"yes"}"#))?;
    engine.flush_wal()?;
    engine.update("u1", &rec(r#"{x:"new"}"#))?;

    let found = engine.read("u1")?.unwrap();
    assert_eq!(found.to_string(), r#"{keep:"yes" x:"new"}"#);
    Ok(())
}
