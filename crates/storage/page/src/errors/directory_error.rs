use binary_helpers::bin_error::BinaryError;
use thiserror::Error;

/// Errors surfaced by the directory page views.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// A slot index past the end of the directory arrays.
    #[error("directory slot {index} out of bounds (capacity {capacity})")]
    SlotOutOfBounds { index: usize, capacity: usize },
    /// A local depth larger than the directory supports.
    #[error("local depth {depth} exceeds the maximum depth {max}")]
    DepthOutOfRange { depth: u32, max: u32 },
    /// The directory cannot grow past the maximum global depth.
    #[error("directory is already at the maximum global depth")]
    AtMaxDepth,
    /// A depth decrement below zero.
    #[error("depth underflow")]
    DepthUnderflow,
    /// Error while accessing the raw page bytes.
    #[error(transparent)]
    Binary(#[from] BinaryError),
}
