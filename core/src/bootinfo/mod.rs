//! Boot information for the kernel
//!
//! [`build`] gathers everything the loader placed into a [`BootDescriptor`].
//! [`handoff`] encodes it in the kernel's Multiboot format and transfers
//! control.

pub mod handoff;
pub mod multiboot;

pub use handoff::{commit, prepare, Firmware, HandoffError, PreparedHandoff, MULTIBOOT_MAGIC};

use crate::config::{BootConfiguration, BootMode};
use crate::image::LoadedImage;
use crate::memory::{AllocationRecord, MemoryError, MemoryMap, Occupant, Reservation};
use crate::stage::ModuleRecord;
use alloc::string::String;
use alloc::vec::Vec;

/// Byte order of a 32-bit framebuffer pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Red in the lowest byte
    Rgbx,
    /// Blue in the lowest byte
    Bgrx,
}

/// Linear framebuffer set up by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    /// Physical base address
    pub address: u64,
    /// Bytes per scanline
    pub pitch: u32,
    /// Visible pixels per scanline
    pub width: u32,
    /// Scanlines
    pub height: u32,
    /// Pixel byte order
    pub format: PixelFormat,
}

/// Everything the kernel is told about its environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootDescriptor {
    /// Kernel entry address
    pub entry_point: u64,
    /// Staged modules in table order
    pub modules: Vec<ModuleRecord>,
    /// Kernel command line
    pub command_line: String,
    /// Final map with loader placements marked occupied
    pub memory_map: MemoryMap,
    /// Firmware framebuffer, reported only in graphical modes
    pub framebuffer: Option<Framebuffer>,
    /// Name the kernel sees as its loader
    pub boot_loader_name: String,
    /// Mode selected for this boot
    pub entry_mode: BootMode,
    /// Where the encoded structure goes
    pub info_area: Option<Reservation>,
}

impl BootDescriptor {
    /// Attach the firmware framebuffer
    pub fn with_framebuffer(mut self, framebuffer: Option<Framebuffer>) -> Self {
        self.framebuffer = framebuffer;
        self
    }

    /// Framebuffer the kernel should be told about, if any
    pub fn reported_framebuffer(&self) -> Option<&Framebuffer> {
        self.framebuffer
            .as_ref()
            .filter(|_| self.entry_mode.wants_framebuffer())
    }
}

/// Reserve room for the encoded boot information
///
/// Must come after the kernel and modules are placed and before [`build`],
/// so the final map accounts for the area itself.
pub fn reserve_info_area(
    allocations: &mut AllocationRecord,
    config: &BootConfiguration,
    modules: &[ModuleRecord],
    firmware_map: &MemoryMap,
) -> Result<Reservation, MemoryError> {
    // Each reservation (this one included) can split one region into three
    let regions = firmware_map.len() + 2 * (allocations.reservations().len() + 1);
    let names: usize = modules.iter().map(|m| m.name.len() + 1).sum();

    let size = multiboot::INFO_SIZE
        + modules.len() * multiboot::MODULE_ENTRY_SIZE
        + regions * multiboot::MMAP_ENTRY_SIZE
        + config.command_line.len()
        + 1
        + config.loader_name.len()
        + 1
        + names;

    allocations.allocate(size as u64, crate::config::PAGE_SIZE, Occupant::BootInfo)
}

/// Assemble the descriptor; no I/O
pub fn build(
    image: &LoadedImage,
    modules: Vec<ModuleRecord>,
    config: &BootConfiguration,
    firmware_map: &MemoryMap,
    allocations: &AllocationRecord,
) -> BootDescriptor {
    let info_area = allocations
        .reservations()
        .iter()
        .rev()
        .find(|r| r.occupant == Occupant::BootInfo)
        .copied();

    BootDescriptor {
        entry_point: image.entry_point,
        modules,
        command_line: config.command_line.clone(),
        memory_map: firmware_map.carve(allocations.reservations()),
        framebuffer: None,
        boot_loader_name: config.loader_name.clone(),
        entry_mode: config.entry_mode,
        info_area,
    }
}
