//! Typed views over the extendible hash directory page.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! offset   0: page_id            (i32)
//! offset   4: lsn                (u32)
//! offset   8: global_depth       (u32)
//! offset  12: local_depths       (512 x u8)
//! offset 524: bucket_page_ids    (512 x i32)
//! ```
//!
//! The arrays are sized for the maximum directory; only the first
//! `2^global_depth` slots are meaningful.

use crate::PAGE_SIZE;
use crate::errors::directory_error::DirectoryError;
use crate::page_id::{INVALID_PAGE_ID, PageId};
use binary_helpers::le::{read_le, write_le};
use paste::paste;

/// Maximum global depth the directory page can reach.
pub const MAX_DEPTH: u32 = 9;

/// Number of slots in the on-page arrays, `2^MAX_DEPTH`.
pub const DIRECTORY_ARRAY_SIZE: usize = 1 << MAX_DEPTH;

const LOCAL_DEPTHS_OFFSET: usize = 12;
const BUCKET_PAGE_IDS_OFFSET: usize = LOCAL_DEPTHS_OFFSET + DIRECTORY_ARRAY_SIZE;

/// Immutable view into a directory page.
#[derive(Debug)]
pub struct DirectoryRef<'a> {
    bytes: &'a [u8; PAGE_SIZE],
}

/// Mutable view into a directory page.
#[derive(Debug)]
pub struct DirectoryMut<'a> {
    bytes: &'a mut [u8; PAGE_SIZE],
}

/// Defines the scalar header fields with getters on both views and setters
/// on the mutable one.
///
/// Pattern: `field_id(identifier) : field_type(type) = field_offset(usize)`
macro_rules! impl_directory_header_fields {
    ( $( $field:ident : $ty:ty = $offset:expr ; )* ) => {
        paste! {
            $(
                impl<'a> DirectoryRef<'a> {
                    #[doc = concat!("Reads the `", stringify!($field), "` header field.")]
                    pub fn $field(&self) -> Result<$ty, DirectoryError> {
                        Ok(read_le::<$ty>(&self.bytes[..], $offset)?)
                    }
                }

                impl<'a> DirectoryMut<'a> {
                    #[doc = concat!("Reads the `", stringify!($field), "` header field.")]
                    pub fn $field(&self) -> Result<$ty, DirectoryError> {
                        self.as_ref().$field()
                    }

                    #[doc = concat!("Writes the `", stringify!($field), "` header field.")]
                    pub fn [<set_ $field>](&mut self, value: $ty) -> Result<(), DirectoryError> {
                        write_le::<$ty>(&mut self.bytes[..], $offset, value)?;
                        Ok(())
                    }
                }
            )*
        }
    };
}

impl_directory_header_fields! {
    page_id: i32 = 0;
    lsn: u32 = 4;
    global_depth: u32 = 8;
}

fn check_slot(index: usize) -> Result<(), DirectoryError> {
    if index >= DIRECTORY_ARRAY_SIZE {
        return Err(DirectoryError::SlotOutOfBounds {
            index,
            capacity: DIRECTORY_ARRAY_SIZE,
        });
    }
    Ok(())
}

impl<'a> DirectoryRef<'a> {
    /// Creates a view over the raw bytes of a directory page.
    pub fn new(bytes: &'a [u8; PAGE_SIZE]) -> Self {
        Self { bytes }
    }

    /// Current number of addressable directory slots, `2^global_depth`.
    pub fn size(&self) -> Result<usize, DirectoryError> {
        Ok(1usize << self.global_depth()?)
    }

    /// Mask selecting the `global_depth` low bits of a hash.
    pub fn global_depth_mask(&self) -> Result<u32, DirectoryError> {
        Ok((1u32 << self.global_depth()?) - 1)
    }

    /// Local depth of the bucket mapped at `index`.
    pub fn local_depth(&self, index: usize) -> Result<u32, DirectoryError> {
        check_slot(index)?;
        Ok(read_le::<u8>(&self.bytes[..], LOCAL_DEPTHS_OFFSET + index)? as u32)
    }

    /// Mask selecting the `local_depth` low bits of a hash for the bucket at
    /// `index`.
    pub fn local_depth_mask(&self, index: usize) -> Result<u32, DirectoryError> {
        Ok((1u32 << self.local_depth(index)?) - 1)
    }

    /// Highest bit of the local depth mask at `index`, zero when the local
    /// depth is zero. Slot `index ^ local_high_bit(index)` is the merge image.
    pub fn local_high_bit(&self, index: usize) -> Result<u32, DirectoryError> {
        let depth = self.local_depth(index)?;
        Ok(if depth == 0 { 0 } else { 1u32 << (depth - 1) })
    }

    /// Id of the bucket page mapped at `index`.
    pub fn bucket_page_id(&self, index: usize) -> Result<PageId, DirectoryError> {
        check_slot(index)?;
        Ok(read_le::<i32>(
            &self.bytes[..],
            BUCKET_PAGE_IDS_OFFSET + index * 4,
        )?)
    }

    /// Whether the directory has reached the maximum global depth and can no
    /// longer grow.
    pub fn is_full(&self) -> Result<bool, DirectoryError> {
        Ok(self.global_depth()? == MAX_DEPTH)
    }

    /// Whether the upper half of the directory is redundant, i.e. every local
    /// depth is strictly below the global depth.
    pub fn can_shrink(&self) -> Result<bool, DirectoryError> {
        let global_depth = self.global_depth()?;
        if global_depth == 0 {
            return Ok(false);
        }
        for index in 0..self.size()? {
            if self.local_depth(index)? == global_depth {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Audits the directory structure, panicking on any violated invariant:
    /// every local depth at most the global depth, every bucket page mapped
    /// at a single local depth, and every bucket owning exactly
    /// `2^(global_depth - local_depth)` slots.
    pub fn verify_integrity(&self) -> Result<(), DirectoryError> {
        use std::collections::HashMap;

        let global_depth = self.global_depth()?;
        // bucket page id -> (slots owned, local depth)
        let mut buckets: HashMap<PageId, (u32, u32)> = HashMap::new();

        for index in 0..self.size()? {
            let local_depth = self.local_depth(index)?;
            let bucket_page_id = self.bucket_page_id(index)?;
            assert!(
                local_depth <= global_depth,
                "slot {index}: local depth {local_depth} exceeds global depth {global_depth}"
            );

            let entry = buckets.entry(bucket_page_id).or_insert((0, local_depth));
            entry.0 += 1;
            assert_eq!(
                entry.1, local_depth,
                "bucket page {bucket_page_id} mapped at two different local depths"
            );
        }

        for (bucket_page_id, (count, local_depth)) in buckets {
            let expected = 1u32 << (global_depth - local_depth);
            assert_eq!(
                count, expected,
                "bucket page {bucket_page_id} at local depth {local_depth} owns {count} slots, expected {expected}"
            );
        }
        Ok(())
    }
}

impl<'a> DirectoryMut<'a> {
    /// Creates a mutable view over the raw bytes of a directory page.
    pub fn new(bytes: &'a mut [u8; PAGE_SIZE]) -> Self {
        Self { bytes }
    }

    /// Reborrows as an immutable view for the read accessors.
    pub fn as_ref(&self) -> DirectoryRef<'_> {
        DirectoryRef { bytes: self.bytes }
    }

    /// Initializes a freshly allocated directory page: depth zero, all local
    /// depths zero, all bucket mappings invalid.
    pub fn init(&mut self, page_id: PageId) -> Result<(), DirectoryError> {
        self.set_page_id(page_id)?;
        self.set_lsn(0)?;
        self.set_global_depth(0)?;
        for index in 0..DIRECTORY_ARRAY_SIZE {
            self.set_local_depth(index, 0)?;
            self.set_bucket_page_id(index, INVALID_PAGE_ID)?;
        }
        Ok(())
    }

    /// Sets the local depth of the slot at `index`.
    pub fn set_local_depth(&mut self, index: usize, depth: u32) -> Result<(), DirectoryError> {
        check_slot(index)?;
        if depth > MAX_DEPTH {
            return Err(DirectoryError::DepthOutOfRange {
                depth,
                max: MAX_DEPTH,
            });
        }
        write_le::<u8>(&mut self.bytes[..], LOCAL_DEPTHS_OFFSET + index, depth as u8)?;
        Ok(())
    }

    /// Increments the local depth of the slot at `index`.
    pub fn incr_local_depth(&mut self, index: usize) -> Result<(), DirectoryError> {
        let depth = self.as_ref().local_depth(index)?;
        self.set_local_depth(index, depth + 1)
    }

    /// Decrements the local depth of the slot at `index`.
    pub fn decr_local_depth(&mut self, index: usize) -> Result<(), DirectoryError> {
        let depth = self.as_ref().local_depth(index)?;
        if depth == 0 {
            return Err(DirectoryError::DepthUnderflow);
        }
        self.set_local_depth(index, depth - 1)
    }

    /// Maps the slot at `index` to the bucket page `page_id`.
    pub fn set_bucket_page_id(
        &mut self,
        index: usize,
        page_id: PageId,
    ) -> Result<(), DirectoryError> {
        check_slot(index)?;
        write_le::<i32>(
            &mut self.bytes[..],
            BUCKET_PAGE_IDS_OFFSET + index * 4,
            page_id,
        )?;
        Ok(())
    }

    /// Doubles the directory. Every new slot `j` in the upper half mirrors
    /// its split pair `j ^ 2^global_depth` in the lower half, so the doubled
    /// directory routes exactly as the old one did.
    pub fn incr_global_depth(&mut self) -> Result<(), DirectoryError> {
        let global_depth = self.global_depth()?;
        if global_depth == MAX_DEPTH {
            return Err(DirectoryError::AtMaxDepth);
        }

        let size = 1usize << global_depth;
        for slot in size..size * 2 {
            let twin = slot - size;
            let depth = self.as_ref().local_depth(twin)?;
            let bucket_page_id = self.as_ref().bucket_page_id(twin)?;
            self.set_local_depth(slot, depth)?;
            self.set_bucket_page_id(slot, bucket_page_id)?;
        }

        self.set_global_depth(global_depth + 1)
    }

    /// Halves the directory, logically discarding the upper half. Only legal
    /// when `can_shrink()` holds.
    pub fn decr_global_depth(&mut self) -> Result<(), DirectoryError> {
        let global_depth = self.global_depth()?;
        if global_depth == 0 {
            return Err(DirectoryError::DepthUnderflow);
        }
        self.set_global_depth(global_depth - 1)
    }
}
