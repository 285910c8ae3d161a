//! Common types and constants for ISO9660

use alloc::string::String;

/// Size of one volume descriptor (and of the standard logical block)
pub const DESCRIPTOR_SIZE: usize = 2048;

/// Largest logical block size accepted; also the scan buffer size
pub const MAX_LOGICAL_BLOCK: usize = 2048;

/// Smallest logical block size accepted
pub const MIN_LOGICAL_BLOCK: usize = 512;

/// Volume descriptor set starts at descriptor 16 (byte 32768)
pub const VOLUME_DESCRIPTOR_START: u64 = 16;

/// Descriptors scanned before giving up on a terminator
pub const MAX_DESCRIPTORS: u64 = 100;

/// Maximum directory depth
pub const MAX_DIRECTORY_DEPTH: usize = 8;

/// Volume descriptor type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VolumeDescriptorType {
    /// Boot Record (El Torito)
    BootRecord = 0,
    /// Primary Volume Descriptor
    Primary = 1,
    /// Supplementary Volume Descriptor (Joliet)
    Supplementary = 2,
    /// Volume Partition Descriptor
    Partition = 3,
    /// Volume Descriptor Set Terminator
    Terminator = 255,
}

/// Parsed Primary Volume Descriptor plus where it lives on the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDescriptor {
    /// Volume identifier, trailing spaces removed
    pub volume_id: String,

    /// Logical block size in bytes (512, 1024 or 2048)
    pub logical_block_size: u32,

    /// Volume size in logical blocks
    pub volume_space_size: u32,

    /// Root directory record
    pub root: DirectoryRecord,

    /// Sector size of the underlying device
    pub device_sector_size: u32,

    /// Device sector at which the volume begins
    pub start_sector: u64,
}

impl VolumeDescriptor {
    /// Device sectors per logical block
    pub fn sectors_per_block(&self) -> u64 {
        (self.logical_block_size / self.device_sector_size) as u64
    }

    /// Device sector holding the start of logical block `block`
    pub fn device_sector(&self, block: u64) -> u64 {
        self.start_sector + block * self.sectors_per_block()
    }

    /// Logical blocks needed to hold `bytes`
    pub fn blocks_for(&self, bytes: u32) -> u64 {
        (bytes as u64).div_ceil(self.logical_block_size as u64)
    }

    /// Whether the whole extent of `record` lies inside the volume
    pub fn contains_extent(&self, record: &DirectoryRecord) -> bool {
        record.extent_lba as u64 + self.blocks_for(record.data_length)
            <= self.volume_space_size as u64
    }
}

/// One directory entry: a file or subdirectory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Identifier as recorded on disk (version suffix included)
    pub name: String,

    /// First logical block of the extent
    pub extent_lba: u32,

    /// Extent length in bytes
    pub data_length: u32,

    /// File flags
    pub flags: FileFlags,
}

impl DirectoryRecord {
    /// Whether this record names a subdirectory
    pub fn is_directory(&self) -> bool {
        self.flags.directory
    }

    /// File length in bytes
    pub fn len(&self) -> u64 {
        self.data_length as u64
    }

    /// Whether the extent holds no data
    pub fn is_empty(&self) -> bool {
        self.data_length == 0
    }
}

/// File flags from directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileFlags {
    /// Hidden file
    pub hidden: bool,

    /// Directory (not a file)
    pub directory: bool,

    /// Associated file
    pub associated: bool,

    /// Not final directory record for this file
    pub not_final: bool,
}

impl FileFlags {
    /// Decode the flags byte (BP 26)
    pub fn from_bits(bits: u8) -> Self {
        Self {
            hidden: bits & 0x01 != 0,
            directory: bits & 0x02 != 0,
            associated: bits & 0x04 != 0,
            not_final: bits & 0x80 != 0,
        }
    }
}
