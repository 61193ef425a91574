use crate::api::{DiskManager, check_page_buffer};
use page::PAGE_SIZE;
use page::page_id::PageId;
use std::collections::HashMap;
use std::io;
use std::sync::RwLock;

/// A disk manager that keeps every page on the heap.
///
/// Pages that were never written read back as zeroes, matching the
/// file-backed manager. Deallocating a page drops it.
#[derive(Debug, Default)]
pub struct InMemoryDiskManager {
    pages: RwLock<HashMap<PageId, Box<[u8; PAGE_SIZE]>>>,
}

impl InMemoryDiskManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages that currently hold data.
    pub fn page_count(&self) -> usize {
        self.pages.read().unwrap().len()
    }
}

impl DiskManager for InMemoryDiskManager {
    fn read_page(&self, page_id: PageId, destination: &mut [u8]) -> io::Result<()> {
        check_page_buffer(page_id, destination.len())?;
        match self.pages.read().unwrap().get(&page_id) {
            Some(data) => destination.copy_from_slice(&data[..]),
            None => destination.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, page_data: &[u8]) -> io::Result<()> {
        check_page_buffer(page_id, page_data.len())?;
        let mut data = Box::new([0u8; PAGE_SIZE]);
        data.copy_from_slice(page_data);
        self.pages.write().unwrap().insert(page_id, data);
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) {
        self.pages.write().unwrap().remove(&page_id);
    }
}

#[cfg(test)]
mod in_memory_disk_manager_tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let manager = InMemoryDiskManager::new();

        manager.write_page(4, &vec![7u8; PAGE_SIZE]).unwrap();

        let mut back = vec![0u8; PAGE_SIZE];
        manager.read_page(4, &mut back).unwrap();
        assert_eq!(back, vec![7u8; PAGE_SIZE]);
    }

    #[test]
    fn absent_page_reads_as_zeroes() {
        let manager = InMemoryDiskManager::new();

        let mut back = vec![0xffu8; PAGE_SIZE];
        manager.read_page(9, &mut back).unwrap();
        assert!(back.iter().all(|b| *b == 0));
    }

    #[test]
    fn deallocate_drops_the_page() {
        let manager = InMemoryDiskManager::new();

        manager.write_page(1, &vec![3u8; PAGE_SIZE]).unwrap();
        assert_eq!(manager.page_count(), 1);

        manager.deallocate_page(1);
        assert_eq!(manager.page_count(), 0);

        let mut back = vec![0xffu8; PAGE_SIZE];
        manager.read_page(1, &mut back).unwrap();
        assert!(back.iter().all(|b| *b == 0));
    }
}
