use page::page::Page;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32};

/// The ID of a frame is just its index in the pool's frame vector.
pub(crate) type FrameId = usize;

/// A frame is a memory slot able to hold one page, plus the metadata the
/// pool needs to manage it.
///
/// The `page` lock doubles as the page-level reader-writer latch handed to
/// callers through the guards. `pin_count` and `is_dirty` only transition
/// while the pool mutex is held; they are atomics so the latch is not needed
/// to read them.
#[derive(Debug)]
pub(crate) struct Frame {
    /// The page buffer, behind the page latch.
    pub(crate) page: RwLock<Page>,

    /// Number of outstanding pins. A frame is evictable exactly when this
    /// is zero.
    pub(crate) pin_count: AtomicU32,

    /// Whether the buffer diverged from the on-disk bytes. Set at unpin,
    /// cleared on write-back.
    pub(crate) is_dirty: AtomicBool,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }
}
