//! Disk-backed block file.
//!
//! One preallocated file, written block by block at fixed offsets
//! (pwrite-style, safe for concurrent writers through a shared handle)
//! with a bitmap recording which blocks have landed.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

#[cfg(unix)]
use std::os::unix::fs::FileExt;

use super::{block_count, BlockBitmap, BlockFile, BlockId, FileError};

/// `BlockFile` over a local file.
pub struct DiskBlockFile {
    file: File,
    size: u64,
    block_size: u64,
    blocks: usize,
    have: Mutex<BlockBitmap>,
}

impl DiskBlockFile {
    /// Create (or truncate) the file at `path`, preallocated to `size`.
    pub fn create(path: &Path, size: u64, block_size: u64) -> Result<Self, FileError> {
        let blocks = block_count(size, block_size).ok_or(FileError::ZeroBlockSize)?;
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size)?;
        Ok(Self {
            file,
            size,
            block_size,
            blocks,
            have: Mutex::new(BlockBitmap::new(blocks)),
        })
    }

    /// Open an existing partial file for resume, restoring completion
    /// state from persisted bitmap bytes.
    pub fn open_existing(
        path: &Path,
        size: u64,
        block_size: u64,
        bitmap: &[u8],
    ) -> Result<Self, FileError> {
        let blocks = block_count(size, block_size).ok_or(FileError::ZeroBlockSize)?;
        let file = File::options().read(true).write(true).open(path)?;
        Ok(Self {
            file,
            size,
            block_size,
            blocks,
            have: Mutex::new(BlockBitmap::from_bytes(bitmap, blocks)),
        })
    }

    /// Snapshot of the completion bitmap for persistence.
    pub fn bitmap_bytes(&self) -> Vec<u8> {
        self.have.lock().unwrap().to_bytes()
    }

    /// Byte offset and exact length of `block`, or `OutOfRange`.
    fn span(&self, block: BlockId) -> Result<(u64, u64), FileError> {
        if block >= self.blocks {
            return Err(FileError::OutOfRange(block));
        }
        let offset = block as u64 * self.block_size;
        let len = self.block_size.min(self.size - offset);
        Ok((offset, len))
    }

    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(unix)]
    fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Non-Unix fallback: seek + read/write on a cloned handle.
    #[cfg(not(unix))]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        use std::io::{Read, Seek, SeekFrom};
        let mut f = self.file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.read_exact(buf)
    }

    #[cfg(not(unix))]
    fn write_at(&self, offset: u64, data: &[u8]) -> std::io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = self.file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
    }
}

impl BlockFile for DiskBlockFile {
    fn file_size(&self) -> u64 {
        self.size
    }

    fn block_size(&self) -> u64 {
        self.block_size
    }

    fn has_block(&self, block: BlockId) -> bool {
        self.have.lock().unwrap().is_complete(block)
    }

    fn read_block(&self, block: BlockId) -> Result<Vec<u8>, FileError> {
        let (offset, len) = self.span(block)?;
        if !self.has_block(block) {
            return Err(FileError::MissingBlock(block));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    fn write_block(&self, block: BlockId, content: &[u8]) -> Result<(), FileError> {
        let (offset, len) = self.span(block)?;
        if content.len() as u64 != len {
            return Err(FileError::WrongLength {
                block,
                expected: len,
                got: content.len() as u64,
            });
        }
        self.write_at(offset, content)?;
        self.have.lock().unwrap().set_complete(block);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), FileError> {
        self.file.sync_all()?;
        Ok(())
    }
}
