//! # redka — append-only record store over TCP
//!
//! Binds `0.0.0.0:8080`, opens the storage engine, and serves the text
//! protocol: `{<record>}` creates, `{@<id> <record>}` updates, a bare UUID
//! reads. One cooperative task per connection on a single thread.
//!
//! ## Configuration
//!
//! No command-line flags; all settings come from environment variables
//! with defaults matching the on-disk layout:
//!
//! ```text
//! REDKA_PORT           listen port                  (default: 8080)
//! REDKA_WAL_PATH       WAL file path                (default: "wal.log")
//! REDKA_DB_DIR         LSM level directory          (default: "lsm_db")
//! REDKA_WAL_MAX_BYTES  WAL flush threshold in bytes (default: 4 GiB)
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use engine::{Engine, WAL_MAX_SIZE};
use runtime::{Acceptor, Executor};
use tracing::{error, info};

use server::handle_client;

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> Result<()> {
    init_tracing();

    let port: u16 = env_or("REDKA_PORT", "8080").parse().unwrap_or(8080);
    let wal_path = env_or("REDKA_WAL_PATH", "wal.log");
    let db_dir = env_or("REDKA_DB_DIR", "lsm_db");
    let wal_max: u64 = std::env::var("REDKA_WAL_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(WAL_MAX_SIZE);

    let engine = Engine::new(&wal_path, &db_dir, wal_max)
        .context("failed to open storage engine")?;
    info!(wal = %wal_path, db = %db_dir, wal_max, "engine opened");
    let engine = Rc::new(RefCell::new(engine));

    let acceptor = Acceptor::bind(("0.0.0.0", port))
        .with_context(|| format!("failed to bind 0.0.0.0:{port}"))?;
    let executor = Executor::new(Rc::clone(&acceptor));

    println!("Server listening on port {port}");

    executor.spawn({
        let acceptor = Rc::clone(&acceptor);
        let executor = Rc::clone(&executor);
        async move {
            loop {
                match Rc::clone(&acceptor).accept().await {
                    Ok(socket) => {
                        executor.spawn(handle_client(socket, Rc::clone(&engine)));
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                }
            }
        }
    });

    executor.run();
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
