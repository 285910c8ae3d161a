//! Device geometry
//!
//! The `(sector_size, total_sectors, transport_kind)` triple the firmware
//! reports at discovery time. Immutable afterwards.

/// Smallest sector size accepted (matches `gpt_disk_types::BlockSize`)
pub const MIN_SECTOR_SIZE: u32 = 512;

/// Largest sector size accepted
pub const MAX_SECTOR_SIZE: u32 = 4096;

/// Default cap on sectors per transport operation (64 KiB at 2048 bytes)
pub const DEFAULT_MAX_TRANSFER: u32 = 32;

/// How commands reach the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// One command per read (UEFI BlockIo, ATA PIO)
    Direct,
    /// Command descriptor block, then poll for data (ATAPI)
    Packet,
}

/// Sector size and extent of a block device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    sector_size: u32,
    total_sectors: u64,
    max_transfer: u32,
}

impl Geometry {
    /// Create geometry for a device
    ///
    /// Returns `None` unless `sector_size` is a power of two between
    /// [`MIN_SECTOR_SIZE`] and [`MAX_SECTOR_SIZE`].
    pub fn new(sector_size: u32, total_sectors: u64) -> Option<Self> {
        if !sector_size.is_power_of_two()
            || !(MIN_SECTOR_SIZE..=MAX_SECTOR_SIZE).contains(&sector_size)
        {
            return None;
        }

        Some(Self {
            sector_size,
            total_sectors,
            max_transfer: DEFAULT_MAX_TRANSFER,
        })
    }

    /// Limit the number of sectors moved by one transport operation
    pub fn with_max_transfer(mut self, sectors: u32) -> Self {
        self.max_transfer = sectors.max(1);
        self
    }

    /// Sector size in bytes
    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    /// Total number of addressable sectors
    pub fn total_sectors(&self) -> u64 {
        self.total_sectors
    }

    /// Maximum sectors per transport operation
    pub fn max_transfer(&self) -> u32 {
        self.max_transfer
    }

    /// Whether `[start, start + count)` lies inside the device
    pub fn contains(&self, start: u64, count: u64) -> bool {
        match start.checked_add(count) {
            Some(end) => end <= self.total_sectors,
            None => false,
        }
    }

    /// Bytes occupied by `count` sectors
    pub fn bytes_for(&self, count: u64) -> Option<usize> {
        count
            .checked_mul(self.sector_size as u64)
            .and_then(|bytes| usize::try_from(bytes).ok())
    }
}
