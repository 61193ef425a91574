use binary_helpers::bin_error::BinaryError;
use thiserror::Error;

/// Errors surfaced by the bucket page views.
#[derive(Debug, Error)]
pub enum BucketError {
    /// A slot index past the bucket's capacity.
    #[error("bucket slot {index} out of bounds (capacity {capacity})")]
    SlotOutOfBounds { index: usize, capacity: usize },
    /// Error while accessing the raw page bytes.
    #[error(transparent)]
    Binary(#[from] BinaryError),
}
