//! Public API for the `disk` crate.

use page::page_id::PageId;
use std::io;

/// Page-granular access to a backing store.
///
/// A `DiskManager` serves fixed-size pages addressed by `PageId`. Reads and
/// writes are synchronous; when a call returns `Ok` the operation is durable
/// as far as the implementation can make it without an explicit sync.
/// Implementations are shared across threads by the buffer pool, so every
/// method takes `&self`.
pub trait DiskManager: Send + Sync + 'static {
    /// Reads the page identified by `page_id` into `destination`.
    ///
    /// `destination` must be exactly one page long. A page that was never
    /// written reads back as all zeroes.
    fn read_page(&self, page_id: PageId, destination: &mut [u8]) -> io::Result<()>;

    /// Writes `page_data` as the page identified by `page_id`.
    ///
    /// `page_data` must be exactly one page long.
    fn write_page(&self, page_id: PageId, page_data: &[u8]) -> io::Result<()>;

    /// Releases the page identified by `page_id`.
    ///
    /// After deallocation the id must read back as zeroes if it is ever
    /// fetched again.
    fn deallocate_page(&self, page_id: PageId);
}

pub(crate) fn check_page_buffer(page_id: PageId, buffer_len: usize) -> io::Result<()> {
    if page_id < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid page id {page_id}"),
        ));
    }
    if buffer_len != page::PAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "page buffer must be {} bytes, got {buffer_len}",
                page::PAGE_SIZE
            ),
        ));
    }
    Ok(())
}
