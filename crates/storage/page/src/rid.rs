use crate::page_id::PageId;
use binary_helpers::bin_error::BinaryError;
use binary_helpers::fixed::FixedEncode;
use std::fmt;

/// Identifies a record by the page holding it and its slot within that page.
///
/// This is the natural value type for an index over a table heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    /// Page holding the record.
    pub page_id: PageId,
    /// Slot of the record within the page.
    pub slot_num: u32,
}

impl Rid {
    /// Creates a new `Rid` for the given page and slot.
    pub fn new(page_id: PageId, slot_num: u32) -> Self {
        Self { page_id, slot_num }
    }
}

impl FixedEncode for Rid {
    const SIZE: usize = 8;

    fn write_to(&self, bytes: &mut [u8], offset: usize) -> Result<(), BinaryError> {
        self.page_id.write_to(bytes, offset)?;
        self.slot_num.write_to(bytes, offset + 4)
    }

    fn read_from(bytes: &[u8], offset: usize) -> Result<Self, BinaryError> {
        Ok(Self {
            page_id: PageId::read_from(bytes, offset)?,
            slot_num: u32::read_from(bytes, offset + 4)?,
        })
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_num)
    }
}
