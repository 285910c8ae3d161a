//! Physical memory accounting
//!
//! The firmware memory map, the single allocation record every placement goes
//! through, and the map handed to the kernel once everything is placed.

pub mod allocation;
pub mod physical;

pub use allocation::{AllocationRecord, Occupant, Reservation};
pub use physical::PhysicalMemory;

use alloc::vec::Vec;
use core::fmt;

/// Align value up to alignment (a power of two)
pub fn align_up(value: u64, align: u64) -> Option<u64> {
    let mask = align.max(1) - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

/// Align value down to alignment (a power of two)
pub fn align_down(value: u64, align: u64) -> u64 {
    value & !(align.max(1) - 1)
}

/// Memory placement errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Range overlaps a reservation or lies outside placeable RAM
    Conflict {
        /// Start of the requested range
        base: u64,
        /// Requested bytes
        length: u64,
    },
    /// No placeable range can hold the request
    Exhausted {
        /// Requested bytes
        length: u64,
    },
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { base, length } => {
                write!(f, "Memory conflict at {:#x} (+{:#x})", base, length)
            }
            Self::Exhausted { length } => write!(f, "No room for {:#x} bytes", length),
        }
    }
}

/// What a physical range holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    /// Free RAM
    Usable,
    /// Firmware boot-time code and data; free once boot services exit
    Reclaimable,
    /// Firmware or device reserved
    Reserved,
    /// ACPI tables, reclaimable by the OS after parsing
    AcpiReclaimable,
    /// ACPI non-volatile storage
    AcpiNvs,
    /// Defective RAM
    Unusable,
    /// Kernel, modules, boot information and loader buffers
    LoaderOccupied,
}

/// One physical range of a memory map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    /// Physical start address
    pub base: u64,
    /// Length in bytes
    pub length: u64,
    /// What the range holds
    pub kind: MemoryKind,
}

impl MemoryRegion {
    /// Region of `length` bytes at `base`
    pub const fn new(base: u64, length: u64, kind: MemoryKind) -> Self {
        Self { base, length, kind }
    }

    /// One past the last byte
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }
}

/// Memory map, sorted by base address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryMap {
    regions: Vec<MemoryRegion>,
}

impl MemoryMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unsorted regions; empty regions are dropped
    pub fn from_regions<I: IntoIterator<Item = MemoryRegion>>(regions: I) -> Self {
        let mut map = Self::new();
        for region in regions {
            map.push(region);
        }
        map
    }

    /// Insert keeping base order
    pub fn push(&mut self, region: MemoryRegion) {
        if region.length == 0 {
            return;
        }
        let index = self.regions.partition_point(|r| r.base <= region.base);
        self.regions.insert(index, region);
    }

    /// Regions in base order
    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    /// Number of regions
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the map has no regions
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Map as the kernel should see it
    ///
    /// Every reserved range becomes `LoaderOccupied`, firmware boot-time
    /// memory becomes `Usable`, and neighbouring regions of the same kind are
    /// merged.
    pub fn carve(&self, reservations: &[Reservation]) -> MemoryMap {
        let mut out: Vec<MemoryRegion> = Vec::with_capacity(self.regions.len() + reservations.len() * 2);

        for region in &self.regions {
            let mut cuts: Vec<u64> = alloc::vec![region.base, region.end()];
            for reservation in reservations {
                for point in [reservation.base, reservation.end()] {
                    if point > region.base && point < region.end() {
                        cuts.push(point);
                    }
                }
            }
            cuts.sort_unstable();
            cuts.dedup();

            for pair in cuts.windows(2) {
                let (start, end) = (pair[0], pair[1]);
                let occupied = reservations
                    .iter()
                    .any(|r| r.base < end && start < r.end());
                let kind = if occupied {
                    MemoryKind::LoaderOccupied
                } else if region.kind == MemoryKind::Reclaimable {
                    MemoryKind::Usable
                } else {
                    region.kind
                };
                push_merged(&mut out, MemoryRegion::new(start, end - start, kind));
            }
        }

        MemoryMap { regions: out }
    }

    /// KiB of RAM below 640 KiB and contiguous from 1 MiB
    ///
    /// Loader-occupied ranges count as RAM.
    pub fn lower_upper_kib(&self) -> (u32, u32) {
        const ONE_MIB: u64 = 0x10_0000;
        const LOWER_LIMIT: u64 = 0xA_0000;

        let lower = self
            .regions
            .iter()
            .find(|r| is_ram(r.kind) && r.base == 0)
            .map(|r| r.end().min(LOWER_LIMIT))
            .unwrap_or(0);

        let mut upper_end = ONE_MIB;
        for region in self.regions.iter().filter(|r| is_ram(r.kind)) {
            if region.base <= upper_end && region.end() > upper_end {
                upper_end = region.end();
            }
        }

        let kib = |bytes: u64| (bytes / 1024).min(u32::MAX as u64) as u32;
        (kib(lower), kib(upper_end - ONE_MIB))
    }
}

fn is_ram(kind: MemoryKind) -> bool {
    matches!(kind, MemoryKind::Usable | MemoryKind::LoaderOccupied)
}

fn push_merged(out: &mut Vec<MemoryRegion>, region: MemoryRegion) {
    if let Some(last) = out.last_mut() {
        if last.kind == region.kind && last.end() == region.base {
            last.length += region.length;
            return;
        }
    }
    out.push(region);
}
