use page::page_id::PageId;
use thiserror::Error;

/// Buffer pool error.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Every frame is pinned; nothing can be evicted.
    #[error("every frame in the pool is pinned")]
    PoolExhausted,
    /// The page is not in the pool.
    #[error("page {0} is not resident")]
    NotResident(PageId),
    /// An unpin was requested for a page with no outstanding pins.
    #[error("page {0} has no outstanding pins")]
    NotPinned(PageId),
    /// A delete was requested for a page that is still pinned.
    #[error("page {page_id} still has {pin_count} pin(s) and cannot be deleted")]
    PinnedOnDelete { page_id: PageId, pin_count: u32 },
    /// The disk manager failed underneath the pool.
    #[error("disk i/o failed for page {page_id}")]
    Io {
        page_id: PageId,
        #[source]
        source: std::io::Error,
    },
}
