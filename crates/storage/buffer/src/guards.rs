use crate::frame::Frame;
use page::page::Page;
use page::page_id::PageId;
use std::ops::{Deref, DerefMut};
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

/// A pinned page served by the buffer pool.
///
/// The handle itself holds no lock; `read` and `write` acquire the frame's
/// page latch for the duration of the returned guard. The pin taken when the
/// handle was issued keeps the frame from being evicted, and must be released
/// with exactly one `unpin_page` call. Dropping the handle does not unpin.
#[derive(Debug)]
pub struct PageHandle<'a> {
    frame: &'a Frame,
    page_id: PageId,
}

impl<'a> PageHandle<'a> {
    pub(crate) fn new(frame: &'a Frame, page_id: PageId) -> Self {
        Self { frame, page_id }
    }

    /// Id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Acquires the page latch shared, for reading page content.
    pub fn read(&self) -> PageReadGuard<'_> {
        PageReadGuard {
            guard: self.frame.page.read().unwrap(),
        }
    }

    /// Acquires the page latch exclusive, for mutating page content.
    pub fn write(&self) -> PageWriteGuard<'_> {
        PageWriteGuard {
            guard: self.frame.page.write().unwrap(),
        }
    }
}

/// Shared latch over a page. Free as soon as possible.
#[derive(Debug)]
pub struct PageReadGuard<'a> {
    guard: RwLockReadGuard<'a, Page>,
}

impl<'a> Deref for PageReadGuard<'a> {
    type Target = Page;
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Exclusive latch over a page. Free as soon as possible.
#[derive(Debug)]
pub struct PageWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, Page>,
}

impl<'a> Deref for PageWriteGuard<'a> {
    type Target = Page;
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<'a> DerefMut for PageWriteGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
