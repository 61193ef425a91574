//! # HazelDB
//!
//! Entry point for the **HazelDB** storage engine demo.
//!
//! The engine is composed of internal components organized under the
//! `/crates/storage` directory of this workspace:
//!
//! - `disk`: page-granular file access
//! - `buffer`: the buffer pool mediating all page traffic
//! - `hash-index`: a disk-backed extendible hash index
//!
//! This binary wires them together from a TOML configuration, runs a small
//! workload through the index and a sharded pool, and flushes everything
//! back to disk on the way out.

use crate::config::EngineConfig;
use crate::environment::EngineEnvironment;
use hash_index::hash_fn::HashFunction;
use hash_index::table::ExtendibleHashTable;
use page::rid::Rid;
use std::env;
use std::error::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

mod config;
mod environment;

fn main() -> Result<(), Box<dyn Error>> {
    // An argument names a config file; otherwise run with local defaults.
    let config = match env::args().nth(1) {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::local_defaults(),
    };

    let _logging_guard = init_logging(&config.storage.logs_dir.display().to_string())?;

    let environment = EngineEnvironment::new(config)?;

    run_index_workload(&environment)?;
    run_heap_workload(&environment)?;

    environment.shutdown()?;
    tracing::info!("shutdown complete");
    Ok(())
}

/// Builds an index, loads it, and reads a sample back.
fn run_index_workload(environment: &EngineEnvironment) -> Result<(), Box<dyn Error>> {
    let table: ExtendibleHashTable<u64, Rid, _> =
        ExtendibleHashTable::new(environment.pool.clone(), HashFunction::default())?;
    tracing::info!(
        directory_page_id = table.directory_page_id(),
        "hash index created"
    );

    for key in 0..5000u64 {
        let rid = Rid::new((key / 100) as i32, (key % 100) as u32);
        table.insert(&key, &rid)?;
    }
    tracing::info!(
        entries = 5000,
        global_depth = table.global_depth()?,
        "index loaded"
    );

    for key in [0u64, 999, 2500, 4999] {
        let values = table.get_value(&key)?;
        tracing::info!(key, ?values, "index probe");
    }

    for key in 4000..5000u64 {
        let rid = Rid::new((key / 100) as i32, (key % 100) as u32);
        table.remove(&key, &rid)?;
    }
    tracing::info!(global_depth = table.global_depth()?, "tail removed");

    Ok(())
}

/// Pushes raw page traffic through the sharded pool.
fn run_heap_workload(environment: &EngineEnvironment) -> Result<(), Box<dyn Error>> {
    let pool = &environment.heap_pool;

    let mut page_ids = Vec::new();
    for sequence in 0..64u8 {
        let handle = pool.new_page()?;
        handle.write().data_mut()[0] = sequence;
        page_ids.push(handle.page_id());
        pool.unpin_page(handle.page_id(), true)?;
    }

    for (sequence, page_id) in page_ids.iter().enumerate() {
        let handle = pool.fetch_page(*page_id)?;
        assert_eq!(handle.read().data()[0], sequence as u8);
        pool.unpin_page(*page_id, false)?;
    }
    tracing::info!(pages = page_ids.len(), "heap pages verified");

    Ok(())
}

/// Sets up logging: compact console output plus a daily-rolling JSON file.
fn init_logging(log_dir: &str) -> Result<WorkerGuard, Box<dyn Error>> {
    let file_appender = tracing_appender::rolling::daily(log_dir, "hazeldb.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_level(true)
        .compact();

    let file_layer = fmt::layer().with_writer(file_writer).json();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
