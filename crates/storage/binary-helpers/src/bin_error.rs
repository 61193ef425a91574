use thiserror::Error;

/// Errors that can occur when working with binary data.
#[derive(Error, Debug)]
pub enum BinaryError {
    /// The requested byte range does not fit inside the provided slice.
    #[error("attempt to access {width} bytes at offset {offset} in a slice of {len} bytes")]
    OutOfRange {
        offset: usize,
        width: usize,
        len: usize,
    },
    /// A scalar was asked to decode from / encode into a slice of the wrong width.
    #[error("scalar of width {expected} given a slice of {actual} bytes")]
    WidthMismatch { expected: usize, actual: usize },
}
