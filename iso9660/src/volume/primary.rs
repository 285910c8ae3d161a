//! Primary Volume Descriptor parsing
//!
//! See ECMA-119 8.4. Offsets are 0-based byte positions in the 2048-byte
//! descriptor.

use crate::directory::record::RawRecord;
use crate::error::{FsError, Result};
use crate::types::{VolumeDescriptor, MAX_LOGICAL_BLOCK, MIN_LOGICAL_BLOCK};
use crate::utils::sector::{both_endian_u16, both_endian_u32};
use crate::utils::string::trim_trailing_spaces;
use alloc::string::String;

const VOLUME_ID: core::ops::Range<usize> = 40..72;
const VOLUME_SPACE_SIZE: usize = 80;
const LOGICAL_BLOCK_SIZE: usize = 128;
const ROOT_RECORD: usize = 156;
const ROOT_RECORD_LEN: usize = 34;

/// Parse a Primary Volume Descriptor
///
/// The logical block size must be a power of two between 512 and 2048 and a
/// whole multiple of the device sector size. Every both-endian field consulted
/// must agree with itself.
pub fn parse(
    data: &[u8],
    device_sector_size: u32,
    start_sector: u64,
) -> Result<VolumeDescriptor> {
    let volume_space_size = both_endian_u32(data, VOLUME_SPACE_SIZE).ok_or(FsError::BadVolume)?;
    let logical_block_size =
        both_endian_u16(data, LOGICAL_BLOCK_SIZE).ok_or(FsError::BadVolume)? as u32;

    if !logical_block_size.is_power_of_two()
        || !(MIN_LOGICAL_BLOCK as u32..=MAX_LOGICAL_BLOCK as u32).contains(&logical_block_size)
        || logical_block_size % device_sector_size != 0
    {
        return Err(FsError::BadVolume);
    }

    let root_bytes = data
        .get(ROOT_RECORD..ROOT_RECORD + ROOT_RECORD_LEN)
        .ok_or(FsError::BadVolume)?;
    both_endian_u32(root_bytes, 2).ok_or(FsError::BadVolume)?;
    both_endian_u32(root_bytes, 10).ok_or(FsError::BadVolume)?;

    let mut root = RawRecord::parse(root_bytes)
        .map_err(|_| FsError::BadVolume)?
        .to_record();
    if !root.is_directory() {
        return Err(FsError::BadVolume);
    }
    root.name = String::new();

    let volume = VolumeDescriptor {
        volume_id: String::from_utf8_lossy(trim_trailing_spaces(&data[VOLUME_ID])).into_owned(),
        logical_block_size,
        volume_space_size,
        root,
        device_sector_size,
        start_sector,
    };

    if !volume.contains_extent(&volume.root) {
        return Err(FsError::BadVolume);
    }

    Ok(volume)
}
