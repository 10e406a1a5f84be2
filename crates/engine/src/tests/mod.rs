mod helpers;
mod read_tests;
mod wal_flush_tests;
