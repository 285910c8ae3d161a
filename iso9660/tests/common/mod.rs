//! Common test utilities and mock block devices

#![allow(dead_code)]

pub mod builder;
pub use builder::IsoBuilder;

use blockio::BlockError;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

/// In-memory block device for testing
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    pub data: Vec<u8>,
    pub block_size: usize,
    /// Number of `read_blocks` calls served
    pub reads: usize,
}

impl MemoryBlockDevice {
    /// Create a new memory block device from raw data
    pub fn new(data: Vec<u8>, block_size: usize) -> Self {
        Self {
            data,
            block_size,
            reads: 0,
        }
    }

    /// Mutable view of one 2048-byte ISO sector
    pub fn iso_sector_mut(&mut self, lba: usize) -> &mut [u8] {
        &mut self.data[lba * 2048..(lba + 1) * 2048]
    }
}

impl BlockIo for MemoryBlockDevice {
    type Error = BlockError;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(self.block_size as u32).expect("valid block size")
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok((self.data.len() / self.block_size) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        if dst.len() % self.block_size != 0 {
            return Err(BlockError::BufferTooSmall);
        }
        let offset = start_lba.0 as usize * self.block_size;
        if offset + dst.len() > self.data.len() {
            return Err(BlockError::OutOfRange);
        }
        self.reads += 1;
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<(), Self::Error> {
        Err(BlockError::ReadOnly)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
