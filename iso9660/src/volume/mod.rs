//! Volume descriptor parsing
//!
//! ISO9660 volume descriptors start at byte 32768 (descriptor 16) and run
//! until the set terminator. Only the Primary Volume Descriptor is used;
//! boot records and supplementary descriptors are skipped.

pub mod primary;

use crate::error::{FsError, Result};
use crate::trace::trace;
use crate::types::{
    VolumeDescriptor, VolumeDescriptorType, DESCRIPTOR_SIZE, MAX_DESCRIPTORS,
    VOLUME_DESCRIPTOR_START,
};
use blockio::BlockError;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;

/// Open the ISO9660 volume on a block device
///
/// # Arguments
/// * `block_io` - Block device containing the volume
/// * `start_sector` - Device sector where the volume begins (0 for a raw image)
///
/// # Errors
/// `BadVolume` when no descriptor carries the `CD001` signature, the set ends
/// without a Primary Volume Descriptor, or its fields are inconsistent. A read
/// past the end of the device also means there is no volume. Transport
/// failures are passed through as `Block`.
pub fn open<B: BlockIo<Error = BlockError>>(
    block_io: &mut B,
    start_sector: u64,
) -> Result<VolumeDescriptor> {
    let device_sector_size = block_io.block_size().to_u32();
    if device_sector_size == 0 || DESCRIPTOR_SIZE as u32 % device_sector_size != 0 {
        trace("iso9660: device sector size cannot hold descriptors");
        return Err(FsError::BadVolume);
    }
    let sectors_per_descriptor = (DESCRIPTOR_SIZE as u32 / device_sector_size) as u64;

    let mut buffer = [0u8; DESCRIPTOR_SIZE];

    for index in 0..MAX_DESCRIPTORS {
        let lba = start_sector + (VOLUME_DESCRIPTOR_START + index) * sectors_per_descriptor;
        match block_io.read_blocks(Lba(lba), &mut buffer) {
            Ok(()) => {}
            Err(BlockError::OutOfRange) => return Err(FsError::BadVolume),
            Err(err) => return Err(FsError::Block(err)),
        }

        let header = DescriptorHeader::parse(&buffer).ok_or_else(|| {
            trace("iso9660: missing CD001 signature");
            FsError::BadVolume
        })?;

        match header.type_code {
            code if code == VolumeDescriptorType::Primary as u8 => {
                return primary::parse(&buffer, device_sector_size, start_sector);
            }
            code if code == VolumeDescriptorType::Terminator as u8 => break,
            _ => {}
        }
    }

    trace("iso9660: no primary volume descriptor");
    Err(FsError::BadVolume)
}

/// Volume Descriptor header (first 7 bytes of each descriptor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeader {
    /// Type code (0=boot, 1=primary, 2=supplementary, 255=terminator)
    pub type_code: u8,
    /// Version (always 1)
    pub version: u8,
}

impl DescriptorHeader {
    /// CD001 magic bytes
    pub const MAGIC: &'static [u8; 5] = b"CD001";

    /// Parse and validate the header; `None` without the signature
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 7 || &data[1..6] != Self::MAGIC || data[6] != 1 {
            return None;
        }
        Some(Self {
            type_code: data[0],
            version: data[6],
        })
    }
}
