//! Helpers for reading and writing binary values inside page byte buffers.
//! Everything stored on a page goes through this crate, so the on-disk format
//! is little-endian regardless of the host.

pub mod bin_error;

/// Little-endian scalar field access at arbitrary byte offsets.
pub mod le;

/// Fixed-width encoding for keys and values stored in index pages.
pub mod fixed;
