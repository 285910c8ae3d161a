//! Boot image assembly
//!
//! One device, one configuration, one allocation record:
//! open volume, resolve and load the kernel, stage modules, reserve and
//! build the boot information, prepare the handoff.

use crate::bootinfo::{self, BootDescriptor, Firmware, Framebuffer, PreparedHandoff};
use crate::config::BootConfiguration;
use crate::error::{BootError, Result};
use crate::image;
use crate::memory::{AllocationRecord, MemoryMap, PhysicalMemory};
use crate::stage;
use alloc::vec::Vec;
use blockio::BlockError;
use core::ops::Range;
use gpt_disk_io::BlockIo;

/// What the firmware reports about the machine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformInfo {
    /// Firmware memory map, taken before any placement
    pub memory_map: MemoryMap,
    /// Active linear framebuffer, if any
    pub framebuffer: Option<Framebuffer>,
    /// Ranges the loader keeps using up to the kernel jump (heap, map
    /// buffer, trampoline page)
    pub loader_buffers: Vec<Range<u64>>,
}

/// Result of a successful assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Everything the kernel is told
    pub descriptor: BootDescriptor,
    /// Encoded boot information, ready for the jump
    pub handoff: PreparedHandoff,
}

/// Assemble a bootable kernel from the volume starting at `start_sector`
pub fn assemble<B, M, F>(
    block_io: &mut B,
    start_sector: u64,
    config: &BootConfiguration,
    platform: &PlatformInfo,
    memory: &mut M,
    firmware: &mut F,
) -> Result<Assembly>
where
    B: BlockIo<Error = BlockError>,
    M: PhysicalMemory + ?Sized,
    F: Firmware,
{
    let volume = iso9660::open(block_io, start_sector).map_err(BootError::Volume)?;
    crate::log_info!("Volume '{}'", volume.volume_id);

    let kernel = iso9660::resolve(block_io, &volume, &config.kernel_path)
        .map_err(BootError::KernelPath)?;

    let mut allocations = AllocationRecord::new(&platform.memory_map);
    for buffer in &platform.loader_buffers {
        allocations.record_loader_buffer(buffer.start, buffer.end.saturating_sub(buffer.start));
    }

    let image = image::load(
        block_io,
        &volume,
        &kernel,
        config.target,
        &mut allocations,
        memory,
    )?;

    let modules = stage::stage_all(block_io, &volume, config, &mut allocations, memory)?;

    bootinfo::reserve_info_area(&mut allocations, config, &modules, &platform.memory_map)?;

    let descriptor = bootinfo::build(&image, modules, config, &platform.memory_map, &allocations)
        .with_framebuffer(platform.framebuffer);

    let handoff = bootinfo::prepare(&descriptor, memory, firmware)?;

    Ok(Assembly {
        descriptor,
        handoff,
    })
}
