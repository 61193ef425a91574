use crate::config::EngineConfig;
use buffer::pool::BufferPoolManager;
use buffer::pool_group::PoolGroup;
use disk::file_disk_manager::FileDiskManager;
use std::io;
use std::sync::Arc;

/// Owner of the singleton-like instances that live for the whole process.
#[derive(Debug)]
pub struct EngineEnvironment {
    pub disk: Arc<FileDiskManager>,
    /// Pool serving the index workload.
    pub pool: Arc<BufferPoolManager<FileDiskManager>>,
    /// Sharded pool over a separate file, for heap-style page traffic.
    pub heap_pool: PoolGroup<FileDiskManager>,
    pub heap_disk: Arc<FileDiskManager>,
    pub config: EngineConfig,
}

impl EngineEnvironment {
    pub fn new(config: EngineConfig) -> io::Result<Self> {
        let storage = &config.storage;

        let disk = Arc::new(FileDiskManager::open(storage.data_dir.join("index.db"))?);
        let pool = Arc::new(BufferPoolManager::new(
            storage.pool_pages.get(),
            disk.clone(),
        ));

        let heap_disk = Arc::new(FileDiskManager::open(storage.data_dir.join("heap.db"))?);
        let shards = storage.shards.get();
        let pages_per_shard = storage.pool_pages.get().div_ceil(shards as usize);
        let heap_pool = PoolGroup::new(shards, pages_per_shard, heap_disk.clone());

        tracing::info!(
            pool_pages = storage.pool_pages.get(),
            shards,
            data_dir = %storage.data_dir.display(),
            "storage engine ready"
        );

        Ok(Self {
            disk,
            pool,
            heap_pool,
            heap_disk,
            config,
        })
    }

    /// Flushes every pool and syncs the backing files.
    pub fn shutdown(&self) -> io::Result<()> {
        self.pool
            .flush_all()
            .map_err(|error| io::Error::other(error.to_string()))?;
        self.heap_pool
            .flush_all()
            .map_err(|error| io::Error::other(error.to_string()))?;
        self.disk.sync()?;
        self.heap_disk.sync()?;
        Ok(())
    }
}
