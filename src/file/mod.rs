//! Block-addressed file abstraction and download metadata.
//!
//! A file is fetched in fixed-size blocks addressed by index; the last
//! block may be short. Workers consume the `BlockFile` trait; the disk
//! implementation here covers the common case of a preallocated local
//! file with a completion bitmap.

mod bitmap;
mod disk;

pub use bitmap::BlockBitmap;
pub use disk::DiskBlockFile;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index of a block within a file.
pub type BlockId = usize;

/// Errors from block-level file access.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("zero block size")]
    ZeroBlockSize,
    #[error("missing block {0}")]
    MissingBlock(BlockId),
    #[error("block {0} out of range")]
    OutOfRange(BlockId),
    #[error("block {block}: expected {expected} bytes, got {got}")]
    WrongLength {
        block: BlockId,
        expected: u64,
        got: u64,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Block-level access to a partially downloaded file.
pub trait BlockFile: Send + Sync {
    /// Total file size in bytes.
    fn file_size(&self) -> u64;

    /// Block size in bytes (the last block may be shorter).
    fn block_size(&self) -> u64;

    /// True if the block has been written.
    fn has_block(&self, block: BlockId) -> bool;

    /// Read a completed block. `MissingBlock` if it was never written.
    fn read_block(&self, block: BlockId) -> Result<Vec<u8>, FileError>;

    /// Write one complete block. The content length must match the block's
    /// span exactly.
    fn write_block(&self, block: BlockId, content: &[u8]) -> Result<(), FileError>;

    /// Flush and release the file.
    fn close(self: Box<Self>) -> Result<(), FileError>;
}

/// Download metadata stored in the coordination store as a JSON record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub checksum: String,
    pub timestamp: i64,
    pub size: u64,
    pub block_size: u64,
}

impl FileInfo {
    /// Number of blocks this file splits into, or `None` for a zero block
    /// size (a malformed record).
    pub fn block_count(&self) -> Option<usize> {
        block_count(self.size, self.block_size)
    }
}

/// Ceiling division of `size` into blocks; `None` when `block_size` is 0.
pub fn block_count(size: u64, block_size: u64) -> Option<usize> {
    if block_size == 0 {
        return None;
    }
    Some((size.div_ceil(block_size)) as usize)
}
