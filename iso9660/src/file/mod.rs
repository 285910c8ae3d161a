//! File reading
//!
//! Files are single extents of consecutive logical blocks. Reads go straight
//! into the caller's buffer in whole device sectors; only an unaligned head or
//! tail passes through a one-sector bounce buffer.

use crate::error::{FsError, Result};
use crate::types::{DirectoryRecord, VolumeDescriptor, MAX_LOGICAL_BLOCK};
use blockio::BlockError;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

/// Read `dst.len()` bytes starting `offset` bytes into the file
///
/// # Errors
/// `ExtentOutOfBounds` if the range passes the end of the file or the file's
/// extent passes the end of the volume.
pub fn read_range<B: BlockIo<Error = BlockError>>(
    block_io: &mut B,
    volume: &VolumeDescriptor,
    record: &DirectoryRecord,
    offset: u64,
    dst: &mut [u8],
) -> Result<()> {
    let end = offset
        .checked_add(dst.len() as u64)
        .ok_or(FsError::ExtentOutOfBounds)?;
    if end > record.len() || !volume.contains_extent(record) {
        return Err(FsError::ExtentOutOfBounds);
    }

    let sector_size = volume.device_sector_size as usize;
    let first_sector = volume.device_sector(record.extent_lba as u64);
    let mut bounce = [0u8; MAX_LOGICAL_BLOCK];

    let mut position = offset;
    let mut written = 0usize;

    while written < dst.len() {
        let sector = first_sector + position / sector_size as u64;
        let within = (position % sector_size as u64) as usize;
        let remaining = dst.len() - written;

        let taken = if within == 0 && remaining >= sector_size {
            let bytes = remaining - remaining % sector_size;
            block_io.read_blocks(Lba(sector), &mut dst[written..written + bytes])?;
            bytes
        } else {
            let scratch = &mut bounce[..sector_size];
            block_io.read_blocks(Lba(sector), scratch)?;
            let bytes = (sector_size - within).min(remaining);
            dst[written..written + bytes].copy_from_slice(&scratch[within..within + bytes]);
            bytes
        };

        written += taken;
        position += taken as u64;
    }

    Ok(())
}

/// Read a whole file into the front of `dst`
///
/// `dst` must hold at least `record.data_length` bytes; anything past that is
/// left untouched.
pub fn read_into<B: BlockIo<Error = BlockError>>(
    block_io: &mut B,
    volume: &VolumeDescriptor,
    record: &DirectoryRecord,
    dst: &mut [u8],
) -> Result<()> {
    let length = record.data_length as usize;
    if dst.len() < length {
        return Err(FsError::BufferTooSmall);
    }
    read_range(block_io, volume, record, 0, &mut dst[..length])
}
