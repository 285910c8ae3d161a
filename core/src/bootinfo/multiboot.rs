//! Multiboot 1 information structure
//!
//! Layout of the encoded area, every pointer a 32-bit physical address:
//!
//! ```text
//! +0      info block (116 bytes)
//! +116    module entries (16 bytes each)
//!         memory map entries (24 bytes each)
//!         command line, loader name, module names (NUL terminated)
//! ```

use super::{BootDescriptor, HandoffError, PixelFormat};
use crate::memory::MemoryKind;
use alloc::vec;
use alloc::vec::Vec;

/// Fixed part of the info block
pub const INFO_SIZE: usize = 116;
/// One `mods` entry
pub const MODULE_ENTRY_SIZE: usize = 16;
/// One `mmap` entry, `size` field included
pub const MMAP_ENTRY_SIZE: usize = 24;

/// `flags` bits the loader sets
#[allow(missing_docs)]
pub mod flags {
    pub const MEMORY: u32 = 1 << 0;
    pub const CMDLINE: u32 = 1 << 2;
    pub const MODS: u32 = 1 << 3;
    pub const MMAP: u32 = 1 << 6;
    pub const LOADER_NAME: u32 = 1 << 9;
    pub const FRAMEBUFFER: u32 = 1 << 12;
}

/// Byte offsets of the info block fields
#[allow(missing_docs)]
pub mod offset {
    pub const FLAGS: usize = 0;
    pub const MEM_LOWER: usize = 4;
    pub const MEM_UPPER: usize = 8;
    pub const CMDLINE: usize = 16;
    pub const MODS_COUNT: usize = 20;
    pub const MODS_ADDR: usize = 24;
    pub const MMAP_LENGTH: usize = 44;
    pub const MMAP_ADDR: usize = 48;
    pub const BOOT_LOADER_NAME: usize = 64;
    pub const FRAMEBUFFER_ADDR: usize = 88;
    pub const FRAMEBUFFER_PITCH: usize = 96;
    pub const FRAMEBUFFER_WIDTH: usize = 100;
    pub const FRAMEBUFFER_HEIGHT: usize = 104;
    pub const FRAMEBUFFER_BPP: usize = 108;
    pub const FRAMEBUFFER_TYPE: usize = 109;
    pub const COLOR_INFO: usize = 110;
}

/// `size` field of a memory map entry (excludes the field itself)
const MMAP_ENTRY_SIZE_FIELD: u32 = 20;
const FRAMEBUFFER_TYPE_RGB: u8 = 1;
const FRAMEBUFFER_BPP: u8 = 32;

/// Multiboot memory map type
pub fn memory_type(kind: MemoryKind) -> u32 {
    match kind {
        MemoryKind::Usable | MemoryKind::Reclaimable => 1,
        MemoryKind::Reserved | MemoryKind::LoaderOccupied => 2,
        MemoryKind::AcpiReclaimable => 3,
        MemoryKind::AcpiNvs => 4,
        MemoryKind::Unusable => 5,
    }
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_u64(buf: &mut [u8], at: usize, value: u64) {
    buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

fn low32(address: u64) -> Result<u32, HandoffError> {
    u32::try_from(address).map_err(|_| HandoffError::AddressTooHigh { address })
}

/// Size of the encoded structure for `descriptor`
pub fn encoded_len(descriptor: &BootDescriptor) -> usize {
    INFO_SIZE
        + descriptor.modules.len() * MODULE_ENTRY_SIZE
        + descriptor.memory_map.len() * MMAP_ENTRY_SIZE
        + descriptor.command_line.len()
        + 1
        + descriptor.boot_loader_name.len()
        + 1
        + descriptor
            .modules
            .iter()
            .map(|m| m.name.len() + 1)
            .sum::<usize>()
}

/// Encode `descriptor` for placement at physical address `base`
pub fn encode(descriptor: &BootDescriptor, base: u64) -> Result<Vec<u8>, HandoffError> {
    let mut buf = vec![0u8; encoded_len(descriptor)];
    let addr = |at: usize| low32(base + at as u64);

    let mods_at = INFO_SIZE;
    let mmap_at = mods_at + descriptor.modules.len() * MODULE_ENTRY_SIZE;
    let mut strings_at = mmap_at + descriptor.memory_map.len() * MMAP_ENTRY_SIZE;
    low32(base + buf.len() as u64)?;

    let mut put_str = |buf: &mut [u8], text: &str| -> usize {
        let at = strings_at;
        buf[at..at + text.len()].copy_from_slice(text.as_bytes());
        strings_at += text.len() + 1;
        at
    };

    let mut info_flags = flags::MEMORY | flags::CMDLINE | flags::MODS | flags::MMAP | flags::LOADER_NAME;

    let (lower, upper) = descriptor.memory_map.lower_upper_kib();
    put_u32(&mut buf, offset::MEM_LOWER, lower);
    put_u32(&mut buf, offset::MEM_UPPER, upper);

    let cmdline_at = put_str(&mut buf, &descriptor.command_line);
    put_u32(&mut buf, offset::CMDLINE, addr(cmdline_at)?);

    let loader_at = put_str(&mut buf, &descriptor.boot_loader_name);
    put_u32(&mut buf, offset::BOOT_LOADER_NAME, addr(loader_at)?);

    put_u32(&mut buf, offset::MODS_COUNT, descriptor.modules.len() as u32);
    put_u32(&mut buf, offset::MODS_ADDR, addr(mods_at)?);
    for (i, module) in descriptor.modules.iter().enumerate() {
        let entry = mods_at + i * MODULE_ENTRY_SIZE;
        let name_at = put_str(&mut buf, &module.name);
        put_u32(&mut buf, entry, low32(module.address)?);
        put_u32(&mut buf, entry + 4, low32(module.end())?);
        put_u32(&mut buf, entry + 8, addr(name_at)?);
    }

    put_u32(
        &mut buf,
        offset::MMAP_LENGTH,
        (descriptor.memory_map.len() * MMAP_ENTRY_SIZE) as u32,
    );
    put_u32(&mut buf, offset::MMAP_ADDR, addr(mmap_at)?);
    for (i, region) in descriptor.memory_map.regions().iter().enumerate() {
        let entry = mmap_at + i * MMAP_ENTRY_SIZE;
        put_u32(&mut buf, entry, MMAP_ENTRY_SIZE_FIELD);
        put_u64(&mut buf, entry + 4, region.base);
        put_u64(&mut buf, entry + 12, region.length);
        put_u32(&mut buf, entry + 20, memory_type(region.kind));
    }

    if let Some(fb) = descriptor.reported_framebuffer() {
        info_flags |= flags::FRAMEBUFFER;
        put_u64(&mut buf, offset::FRAMEBUFFER_ADDR, fb.address);
        put_u32(&mut buf, offset::FRAMEBUFFER_PITCH, fb.pitch);
        put_u32(&mut buf, offset::FRAMEBUFFER_WIDTH, fb.width);
        put_u32(&mut buf, offset::FRAMEBUFFER_HEIGHT, fb.height);
        buf[offset::FRAMEBUFFER_BPP] = FRAMEBUFFER_BPP;
        buf[offset::FRAMEBUFFER_TYPE] = FRAMEBUFFER_TYPE_RGB;

        // red position, red size, green position, green size, blue position, blue size
        let color: [u8; 6] = match fb.format {
            PixelFormat::Rgbx => [0, 8, 8, 8, 16, 8],
            PixelFormat::Bgrx => [16, 8, 8, 8, 0, 8],
        };
        buf[offset::COLOR_INFO..offset::COLOR_INFO + 6].copy_from_slice(&color);
    }

    put_u32(&mut buf, offset::FLAGS, info_flags);
    Ok(buf)
}
