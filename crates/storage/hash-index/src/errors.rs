use buffer::BufferError;
use page::errors::bucket_error::BucketError;
use page::errors::directory_error::DirectoryError;
use thiserror::Error;

/// Hash table error.
#[derive(Debug, Error)]
pub enum HashTableError {
    /// The exact `(key, value)` entry is already present.
    #[error("the (key, value) entry is already present")]
    DuplicateEntry,
    /// No live entry matches the `(key, value)` pair.
    #[error("no matching (key, value) entry")]
    NotPresent,
    /// The directory is at its maximum depth and the target bucket is full.
    #[error("directory is at maximum depth and the target bucket is full")]
    DirectoryFull,
    /// The buffer pool failed underneath the table.
    #[error("buffer pool error")]
    Buffer(#[from] BufferError),
    /// Error while accessing the directory page.
    #[error("directory page error")]
    Directory(#[from] DirectoryError),
    /// Error while accessing a bucket page.
    #[error("bucket page error")]
    Bucket(#[from] BucketError),
}
