use crate::Engine;
use record::Record;
use tempfile::TempDir;

pub fn rec(s: &str) -> Record {
    Record::parse(s)
}

/// An engine whose WAL never overflows on its own.
pub fn test_engine(dir: &TempDir) -> Engine {
    test_engine_with_wal_max(dir, u64::MAX)
}

pub fn test_engine_with_wal_max(dir: &TempDir, wal_max: u64) -> Engine {
    Engine::new(
        dir.path().join("wal.log"),
        dir.path().join("lsm_db"),
        wal_max,
    )
    .unwrap()
}

pub fn count_sst_files(dir: &TempDir, level: usize) -> usize {
    let level_dir = dir.path().join("lsm_db").join(format!("L{level}"));
    if !level_dir.exists() {
        return 0;
    }
    std::fs::read_dir(level_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "sst")
                .unwrap_or(false)
        })
        .count()
}
