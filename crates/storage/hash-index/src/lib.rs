//! A disk-backed extendible hash index.
//!
//! The index is two kinds of ordinary pages served through the buffer pool:
//! one directory page routing hashes to buckets, and bucket pages holding
//! the entries. Buckets split as they fill (growing the directory when
//! needed) and merge with their image when they empty, so the structure
//! tracks the live data set in both directions.

mod errors;

/// Pluggable key hashing.
pub mod hash_fn;

/// The hash table itself.
pub mod table;

pub use errors::HashTableError;
