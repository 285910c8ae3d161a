//! Shared fixtures: boot volumes, kernel images, RAM and firmware doubles

#![allow(dead_code)]

pub mod elf;
// Same image builder the volume reader is tested with
#[path = "../../../iso9660/tests/common/builder.rs"]
pub mod iso;

pub use elf::ElfWriter;
pub use iso::IsoBuilder;

use blockio::BlockError;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use keel_core::bootinfo::{Firmware, HandoffError};
use keel_core::memory::{MemoryError, MemoryKind, MemoryMap, MemoryRegion, PhysicalMemory};

/// In-memory block device
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    pub data: Vec<u8>,
    pub block_size: usize,
}

impl MemoryBlockDevice {
    pub fn new(data: Vec<u8>, block_size: usize) -> Self {
        Self { data, block_size }
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
        let offset = start_lba.0 as usize * self.block_size;
        if offset + dst.len() > self.data.len() {
            return Err(BlockError::OutOfRange);
        }
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

/// Physical RAM from `base` backed by a Vec
pub struct RamMemory {
    pub base: u64,
    pub bytes: Vec<u8>,
    /// Every window handed out, in order
    pub windows: Vec<(u64, usize)>,
}

impl RamMemory {
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0xCC; size],
            windows: Vec::new(),
        }
    }

    /// Bytes at a physical address
    pub fn at(&self, address: u64, len: usize) -> &[u8] {
        let start = (address - self.base) as usize;
        &self.bytes[start..start + len]
    }

    pub fn u32_at(&self, address: u64) -> u32 {
        u32::from_le_bytes(self.at(address, 4).try_into().unwrap())
    }

    pub fn u64_at(&self, address: u64) -> u64 {
        u64::from_le_bytes(self.at(address, 8).try_into().unwrap())
    }

    /// NUL-terminated string at a physical address
    pub fn c_str_at(&self, address: u64) -> String {
        let start = (address - self.base) as usize;
        let end = self.bytes[start..].iter().position(|&b| b == 0).unwrap() + start;
        String::from_utf8(self.bytes[start..end].to_vec()).unwrap()
    }
}

impl PhysicalMemory for RamMemory {
    fn window(&mut self, base: u64, len: usize) -> Result<&mut [u8], MemoryError> {
        let conflict = MemoryError::Conflict {
            base,
            length: len as u64,
        };
        let start = base.checked_sub(self.base).ok_or(conflict)? as usize;
        if start + len > self.bytes.len() {
            return Err(conflict);
        }
        self.windows.push((base, len));
        Ok(&mut self.bytes[start..start + len])
    }
}

/// 640 KiB low memory, then 15 MiB of RAM from 1 MiB with a firmware hole
pub fn test_memory_map() -> MemoryMap {
    MemoryMap::from_regions([
        MemoryRegion::new(0, 0xA0000, MemoryKind::Usable),
        MemoryRegion::new(0xF0000, 0x10000, MemoryKind::Reserved),
        MemoryRegion::new(0x100000, 0x700000, MemoryKind::Usable),
        MemoryRegion::new(0x800000, 0x100000, MemoryKind::Reclaimable),
        MemoryRegion::new(0x900000, 0x700000, MemoryKind::Usable),
        MemoryRegion::new(0xFEC00000, 0x1000, MemoryKind::Reserved),
    ])
}

/// RAM covering the placeable part of [`test_memory_map`]
pub fn test_ram() -> RamMemory {
    RamMemory::new(0x100000, 0xF00000)
}

/// Records firmware calls; entering the kernel panics with the registers
#[derive(Debug, Default)]
pub struct MockFirmware {
    pub ready_calls: usize,
    pub exit_calls: usize,
    pub refuse_ready: bool,
    pub refuse_exit: bool,
}

impl Firmware for MockFirmware {
    fn ready_exit(&mut self) -> Result<(), HandoffError> {
        self.ready_calls += 1;
        if self.refuse_ready {
            return Err(HandoffError::Firmware(0x8000_0000_0000_0002));
        }
        Ok(())
    }

    fn exit_boot_services(&mut self) -> Result<(), HandoffError> {
        self.exit_calls += 1;
        if self.refuse_exit {
            return Err(HandoffError::Firmware(0x8000_0000_0000_0002));
        }
        Ok(())
    }

    fn enter_kernel(self, entry: u32, magic: u32, info: u32) -> ! {
        panic!("enter_kernel entry={:#x} magic={:#x} info={:#x}", entry, magic, info);
    }

    fn halt(self) -> ! {
        panic!("halted after {} exit attempt(s)", self.exit_calls);
    }
}
