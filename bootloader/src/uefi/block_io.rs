// UEFI Block I/O Protocol for disk access

use blockio::{DirectCommand, Geometry, TransportFault};

#[repr(C)]
pub struct BlockIoProtocol {
    pub revision: u64,
    pub media: *const BlockIoMedia,
    pub reset: extern "efiapi" fn(*mut BlockIoProtocol, bool) -> usize,
    pub read_blocks: extern "efiapi" fn(
        *mut BlockIoProtocol,
        u32,     // MediaId
        u64,     // LBA
        usize,   // BufferSize
        *mut u8, // Buffer
    ) -> usize,
    pub write_blocks: extern "efiapi" fn(*mut BlockIoProtocol, u32, u64, usize, *const u8) -> usize,
    pub flush_blocks: extern "efiapi" fn(*mut BlockIoProtocol) -> usize,
}

#[repr(C)]
pub struct BlockIoMedia {
    pub media_id: u32,
    pub removable_media: bool,
    pub media_present: bool,
    pub logical_partition: bool,
    pub read_only: bool,
    pub write_caching: bool,
    pub block_size: u32,
    pub io_align: u32,
    pub last_block: u64,
    // UEFI 2.0+
    pub lowest_aligned_lba: u64,
    pub logical_blocks_per_physical_block: u32,
    // UEFI 2.1+
    pub optimal_transfer_length_granularity: u32,
}

pub const EFI_BLOCK_IO_PROTOCOL_GUID: [u8; 16] = [
    0x21, 0x5b, 0x4e, 0x96, 0x59, 0x64, 0xd2, 0x11, 0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b,
];

/// `EFI_NO_MEDIA`
const NO_MEDIA: usize = (1 << (usize::BITS - 1)) | 12;
/// `EFI_TIMEOUT`
const TIMEOUT: usize = (1 << (usize::BITS - 1)) | 18;

/// Firmware block device driven as a direct transport
pub struct UefiBlockIo {
    protocol: *mut BlockIoProtocol,
}

impl UefiBlockIo {
    /// # Safety
    /// `protocol` must be a live `EFI_BLOCK_IO_PROTOCOL` instance.
    pub unsafe fn new(protocol: *mut BlockIoProtocol) -> Self {
        Self { protocol }
    }

    fn media(&self) -> &BlockIoMedia {
        // SAFETY: checked at construction
        unsafe { &*(*self.protocol).media }
    }

    pub fn is_whole_disk(&self) -> bool {
        !self.media().logical_partition
    }

    pub fn media_present(&self) -> bool {
        self.media().media_present
    }

    pub fn sector_size(&self) -> u32 {
        self.media().block_size
    }

    /// Geometry as reported by the media descriptor
    pub fn geometry(&self) -> Option<Geometry> {
        let media = self.media();
        Geometry::new(media.block_size, media.last_block.checked_add(1)?)
    }
}

impl DirectCommand for UefiBlockIo {
    fn read(&mut self, lba: u64, count: u32, dst: &mut [u8]) -> Result<(), TransportFault> {
        let media_id = self.media().media_id;
        let size = self.media().block_size as usize * count as usize;
        // SAFETY: dst holds count * block_size bytes, checked by the caller
        let status = unsafe {
            ((*self.protocol).read_blocks)(self.protocol, media_id, lba, size, dst.as_mut_ptr())
        };

        match status {
            0 => Ok(()),
            NO_MEDIA => Err(TransportFault::NoMedia),
            TIMEOUT => Err(TransportFault::Timeout),
            other => Err(TransportFault::Firmware(other)),
        }
    }
}
