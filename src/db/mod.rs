//! Database backends read by the reply generator.
//!
//! Every backend exposes a fixed number of elements addressed by index and
//! serves arbitrary byte ranges of them, so the server can import a database
//! larger than memory in several passes.

mod directory;
mod generator;
mod vector;

use crate::error::Result;

pub use directory::DbDirectoryProcessor;
pub use generator::DbGenerator;
pub use vector::DbVectorProcessor;

/// Read access to the elements of a PIR database
pub trait DbHandler: Send + Sync {
    /// Number of elements
    fn num_elements(&self) -> u64;

    /// Size of the largest element; smaller elements are zero-padded to it
    fn max_element_bytesize(&self) -> u64;

    /// Human readable name of an element (file name for directory databases)
    fn element_name(&self, index: u64) -> String;

    /// Read `len` bytes of element `index` starting at `offset`.
    ///
    /// Always returns exactly `len` bytes; anything past the end of the
    /// element reads as zero.
    fn read_element_chunk(&self, index: u64, offset: u64, len: usize) -> Result<Vec<u8>>;
}

/// Copy `src[offset..offset + len]` into a zero-padded buffer of `len` bytes
pub(crate) fn padded_slice(src: &[u8], offset: u64, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(src.len());
    let end = start.saturating_add(len).min(src.len());
    out[..end - start].copy_from_slice(&src[start..end]);
    out
}
