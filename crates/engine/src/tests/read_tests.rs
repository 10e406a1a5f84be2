use super::helpers::{rec, test_engine};
use anyhow::Result;
use tempfile::tempdir;

#[test]
fn read_of_unknown_id_is_none() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);
    assert!(engine.read("nobody")?.is_none());
    Ok(())
}

#[test]
fn get_of_empty_levels_is_none() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);
    assert!(engine.get("k")?.is_none());
    Ok(())
}

#[test]
fn wal_write_wins_tie_over_flushed_sstable() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);

    // An old value for the id lands on disk, then a same-version write
    // arrives in the WAL. The WAL write is newer and must win the tie.
    engine.put("u1", &rec(r#"{x:"disk"}"#))?;
    engine.update("u1", &rec(r#"{x:"wal"}"#))?;

    assert_eq!(engine.read("u1")?.unwrap().to_string(), r#"{x:"wal"}"#);
    Ok(())
}

#[test]
fn sstable_field_with_higher_version_beats_wal() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);

    engine.put("u1", &rec(r#"{x@5:"disk"}"#))?;
    engine.update("u1", &rec(r#"{x@2:"wal"}"#))?;

    let found = engine.read("u1")?.unwrap();
    assert_eq!(found.get("x").unwrap().value, "disk");
    assert_eq!(found.get("x").unwrap().version, 5);
    Ok(())
}

#[test]
fn read_merges_fields_from_wal_and_sstables() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);

    engine.put("u1", &rec(r#"{a:"1"}"#))?;
    engine.update("u1", &rec(r#"{b:"2"}"#))?;

    let found = engine.read("u1")?.unwrap();
    assert_eq!(found.to_string(), r#"{a:"1" b:"2"}"#);
    Ok(())
}

#[test]
fn newer_sstable_wins_tie_within_a_level() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);

    // Two single-entry L0 SSTables for the same key, same field version.
    // The later file is newer and must win the tie.
    engine.put("u1", &rec(r#"{x:"old"}"#))?;
    engine.put("u1", &rec(r#"{x:"new"}"#))?;

    assert_eq!(engine.level_file_count(0), 2);
    assert_eq!(engine.get("u1")?.unwrap().get("x").unwrap().value, "new");
    Ok(())
}

#[test]
fn damaged_sstable_never_fails_a_lookup() -> Result<()> {
    let dir = tempdir()?;
    let mut engine = test_engine(&dir);

    engine.put("u1", &rec(r#"{a:"1"}"#))?;

    // Drop a garbage .sst into L0; lookups must skip it.
    let junk = dir.path().join("lsm_db").join("L0").join("00000000000000000000.sst");
    std::fs::write(&junk, b"not an sstable at all")?;

    assert_eq!(engine.read("u1")?.unwrap().to_string(), r#"{a:"1"}"#);
    assert!(engine.read("u2")?.is_none());
    Ok(())
}
