use crate::bin_error::BinaryError;
use crate::le::{LeScalar, read_le, write_le};

/// Fixed-width binary encoding for keys and values stored in index pages.
///
/// An implementor occupies exactly `SIZE` bytes at a given offset inside a
/// page. Index page layouts are computed from `SIZE`, so the width must not
/// depend on the value being encoded.
pub trait FixedEncode: Copy {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Writes the value at `bytes[offset..offset + SIZE]`.
    fn write_to(&self, bytes: &mut [u8], offset: usize) -> Result<(), BinaryError>;

    /// Reads a value from `bytes[offset..offset + SIZE]`.
    fn read_from(bytes: &[u8], offset: usize) -> Result<Self, BinaryError>;
}

/// Every little-endian scalar is its own fixed-width encoding.
impl<T: LeScalar> FixedEncode for T {
    const SIZE: usize = T::WIDTH;

    fn write_to(&self, bytes: &mut [u8], offset: usize) -> Result<(), BinaryError> {
        write_le(bytes, offset, *self)
    }

    fn read_from(bytes: &[u8], offset: usize) -> Result<Self, BinaryError> {
        read_le(bytes, offset)
    }
}
