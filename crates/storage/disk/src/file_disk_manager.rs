use crate::api::{DiskManager, check_page_buffer};
use page::PAGE_SIZE;
use page::page_id::PageId;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;

/// A disk manager backed by a single paged file.
///
/// Page `p` occupies the byte range `[p * PAGE_SIZE, (p + 1) * PAGE_SIZE)`.
/// Positioned reads and writes keep the shared `File` free of seek state, so
/// concurrent calls from the buffer pool do not interfere.
#[derive(Debug)]
pub struct FileDiskManager {
    file: File,
    /// Ids released by `deallocate_page`. Bookkeeping only; file space is
    /// not reclaimed.
    freed_pages: Mutex<Vec<PageId>>,
}

impl FileDiskManager {
    /// Opens the paged file at `path`, creating it (and its parent
    /// directories) if missing.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            file,
            freed_pages: Mutex::new(Vec::new()),
        })
    }

    /// Flushes file data to the device.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_data()
    }

    /// Ids released by `deallocate_page` since this manager was opened.
    pub fn freed_page_count(&self) -> usize {
        self.freed_pages.lock().unwrap().len()
    }

    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.file.read_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.file.seek_read(buf, offset)
    }

    #[cfg(unix)]
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.file.write_at(buf, offset)
    }

    #[cfg(windows)]
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        self.file.seek_write(buf, offset)
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&self, page_id: PageId, destination: &mut [u8]) -> io::Result<()> {
        check_page_buffer(page_id, destination.len())?;
        let offset = page_id as u64 * PAGE_SIZE as u64;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = self.read_at(&mut destination[filled..], offset + filled as u64)?;
            if n == 0 {
                // Reading past the end of the file: the page was never
                // written, so the tail reads as zeroes.
                destination[filled..].fill(0);
                break;
            }
            filled += n;
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, page_data: &[u8]) -> io::Result<()> {
        check_page_buffer(page_id, page_data.len())?;
        let offset = page_id as u64 * PAGE_SIZE as u64;

        let mut written = 0;
        while written < PAGE_SIZE {
            let n = self.write_at(&page_data[written..], offset + written as u64)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("wrote 0 bytes for page {page_id}"),
                ));
            }
            written += n;
        }
        Ok(())
    }

    fn deallocate_page(&self, page_id: PageId) {
        tracing::debug!(page_id, "page deallocated");
        self.freed_pages.lock().unwrap().push(page_id);
    }
}
