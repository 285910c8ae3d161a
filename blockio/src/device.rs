//! Transport-agnostic sector reader

use crate::error::{BlockError, Result};
use crate::geometry::{Geometry, TransportKind};
use crate::trace::trace;
use crate::transport::Transport;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

/// How many times a failing transfer is attempted before giving up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
}

impl RetryPolicy {
    /// Attempts used when the configuration does not say otherwise
    pub const DEFAULT_ATTEMPTS: u32 = 3;

    /// Policy with `attempts` tries per transfer (at least one)
    pub const fn new(attempts: u32) -> Self {
        Self {
            attempts: if attempts == 0 { 1 } else { attempts },
        }
    }

    /// Total tries per transfer
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS)
    }
}

/// Block device over a direct or packet transport
///
/// All reads are validated against the device geometry before the first
/// command goes out, so an `OutOfRange` or `BufferTooSmall` error never leaves
/// the destination half written.
pub struct BlockDevice<'a> {
    geometry: Geometry,
    transport: Transport<'a>,
    retry: RetryPolicy,
}

impl<'a> BlockDevice<'a> {
    /// Wrap a transport with its reported geometry
    pub fn new(geometry: Geometry, transport: Transport<'a>) -> Self {
        Self {
            geometry,
            transport,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sector size in bytes
    pub fn sector_size(&self) -> u32 {
        self.geometry.sector_size()
    }

    /// Number of addressable sectors
    pub fn total_sectors(&self) -> u64 {
        self.geometry.total_sectors()
    }

    /// Transport family in use
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Geometry reported at discovery
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Read `count` sectors starting at `start` into the front of `dst`
    ///
    /// On success exactly `count * sector_size` bytes of `dst` are overwritten.
    /// A read of zero sectors succeeds without touching the device.
    pub fn read_sectors(&mut self, start: u64, count: u64, dst: &mut [u8]) -> Result<()> {
        if !self.geometry.contains(start, count) {
            return Err(BlockError::OutOfRange);
        }

        let needed = self
            .geometry
            .bytes_for(count)
            .ok_or(BlockError::BufferTooSmall)?;
        if dst.len() < needed {
            return Err(BlockError::BufferTooSmall);
        }
        if count == 0 {
            return Ok(());
        }

        let sector_size = self.geometry.sector_size() as usize;
        let max_transfer = self.geometry.max_transfer() as u64;

        let mut lba = start;
        let mut remaining = count;
        let mut offset = 0usize;

        while remaining > 0 {
            let chunk = remaining.min(max_transfer);
            let len = chunk as usize * sector_size;
            self.transfer_with_retry(lba, chunk as u32, &mut dst[offset..offset + len])?;

            lba += chunk;
            remaining -= chunk;
            offset += len;
        }

        Ok(())
    }

    fn transfer_with_retry(&mut self, lba: u64, count: u32, dst: &mut [u8]) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.transport.transfer(lba, count, dst) {
                Ok(()) => return Ok(()),
                Err(_) if attempt < self.retry.attempts() => {
                    trace("blockio: transfer failed, retrying");
                    attempt += 1;
                }
                Err(fault) => {
                    trace("blockio: transfer failed, retries exhausted");
                    return Err(BlockError::TransportFailure(fault));
                }
            }
        }
    }
}

impl BlockIo for BlockDevice<'_> {
    type Error = BlockError;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(self.geometry.sector_size()).unwrap_or(BlockSize::BS_512)
    }

    fn num_blocks(&mut self) -> Result<u64> {
        Ok(self.geometry.total_sectors())
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<()> {
        let sector_size = self.geometry.sector_size() as usize;
        if dst.len() % sector_size != 0 {
            return Err(BlockError::BufferTooSmall);
        }
        let count = (dst.len() / sector_size) as u64;
        self.read_sectors(start_lba.0, count, dst)
    }

    fn write_blocks(&mut self, _start_lba: Lba, _src: &[u8]) -> Result<()> {
        Err(BlockError::ReadOnly)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
