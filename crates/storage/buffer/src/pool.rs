//! Provides the implementation for the buffer pool manager.

use crate::errors::BufferError;
use crate::frame::{Frame, FrameId};
use crate::guards::PageHandle;
use crate::replacer::LruReplacer;
use disk::api::DiskManager;
use page::page_id::PageId;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

/// The buffer pool manager: a fixed set of frames fronting the disk.
///
/// All bookkeeping (page table, free list, replacer membership, frame
/// metadata transitions) is guarded by one instance-wide mutex held for the
/// duration of each public operation, disk I/O included. A pool may be one
/// shard of a [`crate::pool_group::PoolGroup`], in which case the ids it
/// allocates satisfy `page_id % num_shards == shard_index`.
#[derive(Debug)]
pub struct BufferPoolManager<D: DiskManager> {
    num_shards: u32,
    shard_index: u32,
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    replacer: LruReplacer,
    disk: Arc<D>,
}

#[derive(Debug)]
struct PoolState {
    /// Resident pages: page id to frame index.
    page_table: HashMap<PageId, FrameId>,
    /// Frames never used or reclaimed by a delete. Consulted before the
    /// replacer when a frame is needed.
    free_list: VecDeque<FrameId>,
    /// Next id this shard will hand out; steps by `num_shards`.
    next_page_id: PageId,
}

impl<D: DiskManager> BufferPoolManager<D> {
    /// Creates a standalone pool with `pool_size` frames.
    pub fn new(pool_size: usize, disk: Arc<D>) -> Self {
        Self::new_shard(pool_size, 1, 0, disk)
    }

    /// Creates one shard of a pool group. Ids allocated here are congruent
    /// to `shard_index` modulo `num_shards`.
    pub fn new_shard(pool_size: usize, num_shards: u32, shard_index: u32, disk: Arc<D>) -> Self {
        assert!(pool_size > 0, "pool must have at least one frame");
        assert!(num_shards > 0, "a pool group has at least one shard");
        assert!(
            shard_index < num_shards,
            "shard index {shard_index} out of range for {num_shards} shard(s)"
        );

        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for frame_id in 0..pool_size {
            frames.push(Frame::new());
            free_list.push_back(frame_id);
        }

        Self {
            num_shards,
            shard_index,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                next_page_id: shard_index as PageId,
            }),
            replacer: LruReplacer::new(),
            disk,
        }
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.frames.len()
    }

    /// Allocates a fresh page id and returns it pinned in a zeroed frame.
    ///
    /// The new page is not written to disk until it is flushed or evicted
    /// dirty.
    pub fn new_page(&self) -> Result<PageHandle<'_>, BufferError> {
        let mut state = self.state.lock().unwrap();

        let frame_id = self.take_usable_frame(&mut state)?;
        let page_id = self.allocate_page(&mut state);

        let frame = &self.frames[frame_id];
        {
            let mut page = frame.page.write().unwrap();
            page.reset();
            page.set_page_id(page_id);
        }
        frame.pin_count.store(1, Ordering::Relaxed);
        frame.is_dirty.store(false, Ordering::Relaxed);
        state.page_table.insert(page_id, frame_id);

        Ok(PageHandle::new(frame, page_id))
    }

    /// Returns the page pinned, reading it from disk if it is not resident.
    ///
    /// A hit only bumps the pin count; it does not touch the disk and keeps
    /// the dirty flag as is.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageHandle<'_>, BufferError> {
        let mut state = self.state.lock().unwrap();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id];
            frame.pin_count.fetch_add(1, Ordering::Relaxed);
            self.replacer.pin(frame_id);
            return Ok(PageHandle::new(frame, page_id));
        }

        let frame_id = self.take_usable_frame(&mut state)?;
        let frame = &self.frames[frame_id];
        {
            let mut page = frame.page.write().unwrap();
            page.set_page_id(page_id);
            if let Err(source) = self.disk.read_page(page_id, page.data_mut()) {
                // Hand the frame back before surfacing the failure.
                page.reset();
                state.free_list.push_front(frame_id);
                return Err(BufferError::Io { page_id, source });
            }
        }
        frame.pin_count.store(1, Ordering::Relaxed);
        frame.is_dirty.store(false, Ordering::Relaxed);
        state.page_table.insert(page_id, frame_id);

        Ok(PageHandle::new(frame, page_id))
    }

    /// Releases one pin on the page, recording `is_dirty` if set. When the
    /// last pin goes away the frame becomes an eviction candidate.
    ///
    /// The dirty flag only moves from clean to dirty here; write-back is the
    /// only thing that clears it.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BufferError> {
        let state = self.state.lock().unwrap();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Err(BufferError::NotResident(page_id));
        };
        let frame = &self.frames[frame_id];

        let pin_count = frame.pin_count.load(Ordering::Relaxed);
        if pin_count == 0 {
            return Err(BufferError::NotPinned(page_id));
        }

        if is_dirty {
            frame.is_dirty.store(true, Ordering::Relaxed);
        }
        frame.pin_count.store(pin_count - 1, Ordering::Relaxed);
        if pin_count == 1 {
            self.replacer.unpin(frame_id);
        }
        Ok(())
    }

    /// Writes the page to disk if it is resident and dirty. Flushing a clean
    /// resident page is a successful no-op.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferError> {
        let state = self.state.lock().unwrap();
        self.flush_resident(&state, page_id)
    }

    /// Flushes every resident page.
    pub fn flush_all(&self) -> Result<(), BufferError> {
        let state = self.state.lock().unwrap();
        let resident: Vec<PageId> = state.page_table.keys().copied().collect();
        for page_id in resident {
            self.flush_resident(&state, page_id)?;
        }
        Ok(())
    }

    /// Removes the page from the pool and deallocates its id on disk.
    ///
    /// Deleting a page that is not resident succeeds without touching the
    /// disk. Deleting a pinned page fails.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferError> {
        let mut state = self.state.lock().unwrap();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(());
        };
        let frame = &self.frames[frame_id];

        let pin_count = frame.pin_count.load(Ordering::Relaxed);
        if pin_count > 0 {
            tracing::error!(page_id, pin_count, "delete rejected for pinned page");
            return Err(BufferError::PinnedOnDelete {
                page_id,
                pin_count,
            });
        }

        state.page_table.remove(&page_id);
        self.replacer.pin(frame_id);
        self.disk.deallocate_page(page_id);

        {
            let mut page = frame.page.write().unwrap();
            page.reset();
        }
        frame.is_dirty.store(false, Ordering::Relaxed);
        state.free_list.push_back(frame_id);

        Ok(())
    }

    /// Finds a frame for a new resident page: the free list first, then the
    /// replacer. A dirty victim is written back and removed from the page
    /// table before its frame is reused.
    fn take_usable_frame(&self, state: &mut PoolState) -> Result<FrameId, BufferError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.replacer.victim() else {
            return Err(BufferError::PoolExhausted);
        };

        let frame = &self.frames[frame_id];
        let page = frame.page.read().unwrap();
        let victim_page_id = page.page_id();
        if frame.is_dirty.load(Ordering::Relaxed) {
            tracing::debug!(page_id = victim_page_id, "writing back evicted page");
            if let Err(source) = self.disk.write_page(victim_page_id, page.data()) {
                // Put the victim back so the pool stays consistent.
                self.replacer.unpin(frame_id);
                return Err(BufferError::Io {
                    page_id: victim_page_id,
                    source,
                });
            }
            frame.is_dirty.store(false, Ordering::Relaxed);
        }
        state.page_table.remove(&victim_page_id);

        Ok(frame_id)
    }

    fn flush_resident(&self, state: &PoolState, page_id: PageId) -> Result<(), BufferError> {
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Err(BufferError::NotResident(page_id));
        };
        let frame = &self.frames[frame_id];

        if frame.is_dirty.load(Ordering::Relaxed) {
            let page = frame.page.read().unwrap();
            self.disk
                .write_page(page_id, page.data())
                .map_err(|source| BufferError::Io { page_id, source })?;
            frame.is_dirty.store(false, Ordering::Relaxed);
        }
        Ok(())
    }

    fn allocate_page(&self, state: &mut PoolState) -> PageId {
        let page_id = state.next_page_id;
        state.next_page_id += self.num_shards as PageId;
        debug_assert_eq!(
            page_id.rem_euclid(self.num_shards as PageId) as u32,
            self.shard_index
        );
        page_id
    }
}
