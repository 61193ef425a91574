/// A stable identifier for a page on disk.
///
/// Page ids are signed so that `INVALID_PAGE_ID` can sit outside the valid
/// range; every allocated id is non-negative.
pub type PageId = i32;

/// Sentinel id carried by empty frames and unset directory slots.
pub const INVALID_PAGE_ID: PageId = -1;
