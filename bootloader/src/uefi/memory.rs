// UEFI memory map snapshots and physical page claims

use core::{marker::PhantomData, ops::Range, ptr};

use super::{
    BootServices, ALLOCATE_ADDRESS, ALLOCATE_ANY_PAGES, EFI_BUFFER_TOO_SMALL, EFI_SUCCESS,
    LOADER_DATA, PAGE_SIZE,
};
use alloc::vec::Vec;
use keel_core::memory::{
    align_down, align_up, MemoryError, MemoryKind, MemoryMap, MemoryRegion, PhysicalMemory,
};

#[repr(C)]
pub struct UefiMemoryDescriptor {
    pub typ: u32,
    _pad: u32,
    pub physical_start: u64,
    pub virtual_start: u64,
    pub number_of_pages: u64,
    pub attribute: u64,
}

/// Firmware memory types
mod efi_type {
    pub const LOADER_CODE: u32 = 1;
    pub const BOOT_SERVICES_DATA: u32 = 4;
    pub const CONVENTIONAL: u32 = 7;
    pub const UNUSABLE: u32 = 8;
    pub const ACPI_RECLAIM: u32 = 9;
    pub const ACPI_NVS: u32 = 10;
}

fn kind_of(typ: u32) -> MemoryKind {
    match typ {
        efi_type::CONVENTIONAL => MemoryKind::Usable,
        efi_type::LOADER_CODE..=efi_type::BOOT_SERVICES_DATA => MemoryKind::Reclaimable,
        efi_type::ACPI_RECLAIM => MemoryKind::AcpiReclaimable,
        efi_type::ACPI_NVS => MemoryKind::AcpiNvs,
        efi_type::UNUSABLE => MemoryKind::Unusable,
        _ => MemoryKind::Reserved,
    }
}

/// Page-backed buffer for `GetMemoryMap`
///
/// The buffer comes from `AllocatePages` up front so that taking a snapshot
/// right before `ExitBootServices` does not change the map it describes.
pub struct FirmwareMap {
    buffer: *mut u8,
    capacity: usize,
    size: usize,
    pub map_key: usize,
    descriptor_size: usize,
}

impl FirmwareMap {
    pub const fn new() -> Self {
        Self {
            buffer: ptr::null_mut(),
            capacity: 0,
            size: 0,
            map_key: 0,
            descriptor_size: 0,
        }
    }

    /// Refresh the snapshot and its map key
    pub fn snapshot(&mut self, bs: &BootServices) -> Result<(), usize> {
        if self.buffer.is_null() {
            self.bootstrap(bs)?;
        }

        loop {
            let mut reported_size = self.capacity;
            let mut version = 0u32;
            let status = (bs.get_memory_map)(
                &mut reported_size,
                self.buffer,
                &mut self.map_key,
                &mut self.descriptor_size,
                &mut version,
            );

            if status == EFI_SUCCESS {
                self.size = reported_size;
                return Ok(());
            }

            if status == EFI_BUFFER_TOO_SMALL {
                let needed = reported_size + self.descriptor_size * 2;
                self.reserve(bs, needed)?;
                continue;
            }

            return Err(status);
        }
    }

    /// Pages backing the snapshot buffer
    pub fn buffer(&self) -> Range<u64> {
        let start = self.buffer as u64;
        start..start + self.capacity as u64
    }

    pub fn descriptors(&self) -> DescriptorIter<'_> {
        DescriptorIter {
            descriptor_size: self.descriptor_size,
            current: self.buffer as *const u8,
            remaining: self.size,
            _marker: PhantomData,
        }
    }

    /// Snapshot as a loader memory map
    pub fn to_memory_map(&self) -> MemoryMap {
        MemoryMap::from_regions(self.descriptors().map(|d| {
            MemoryRegion::new(
                d.physical_start,
                d.number_of_pages * PAGE_SIZE as u64,
                kind_of(d.typ),
            )
        }))
    }

    fn bootstrap(&mut self, bs: &BootServices) -> Result<(), usize> {
        let mut needed = 0usize;
        let mut map_key = 0usize;
        let mut version = 0u32;

        let status = (bs.get_memory_map)(
            &mut needed,
            ptr::null_mut(),
            &mut map_key,
            &mut self.descriptor_size,
            &mut version,
        );
        if status != EFI_BUFFER_TOO_SMALL {
            return Err(status);
        }

        // Room for the descriptors our own page claims will add
        self.reserve(bs, needed + self.descriptor_size * 32)
    }

    fn reserve(&mut self, bs: &BootServices, bytes: usize) -> Result<(), usize> {
        if !self.buffer.is_null() {
            let pages = self.capacity / PAGE_SIZE;
            let _ = (bs.free_pages)(self.buffer as u64, pages);
            self.buffer = ptr::null_mut();
            self.capacity = 0;
        }

        let pages = bytes.div_ceil(PAGE_SIZE);
        let mut address = 0u64;
        let status = (bs.allocate_pages)(ALLOCATE_ANY_PAGES, LOADER_DATA, pages, &mut address);
        if status != EFI_SUCCESS {
            return Err(status);
        }

        self.buffer = address as *mut u8;
        self.capacity = pages * PAGE_SIZE;
        Ok(())
    }
}

pub struct DescriptorIter<'a> {
    descriptor_size: usize,
    current: *const u8,
    remaining: usize,
    _marker: PhantomData<&'a UefiMemoryDescriptor>,
}

impl<'a> Iterator for DescriptorIter<'a> {
    type Item = &'a UefiMemoryDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.descriptor_size == 0 || self.remaining < self.descriptor_size {
            return None;
        }
        // SAFETY: the firmware filled `remaining` bytes of descriptors
        let descriptor = unsafe { &*(self.current as *const UefiMemoryDescriptor) };
        self.current = self.current.wrapping_add(self.descriptor_size);
        self.remaining -= self.descriptor_size;
        Some(descriptor)
    }
}

/// Identity-mapped physical memory, claimed from the firmware page by page
///
/// A window's pages are taken with `AllocatePages(AllocateAddress)` the first
/// time they are touched, so the firmware never hands them out again.
pub struct UefiPhysicalMemory<'a> {
    bs: &'a BootServices,
    claimed: Vec<(u64, u64)>,
}

impl<'a> UefiPhysicalMemory<'a> {
    pub fn new(bs: &'a BootServices) -> Self {
        Self {
            bs,
            claimed: Vec::new(),
        }
    }

    fn is_claimed(&self, page: u64) -> bool {
        self.claimed
            .iter()
            .any(|&(base, end)| base <= page && page < end)
    }

    fn claim(&mut self, base: u64, end: u64) -> Result<(), MemoryError> {
        let conflict = MemoryError::Conflict {
            base,
            length: end - base,
        };
        let page_size = PAGE_SIZE as u64;
        let mut page = align_down(base, page_size);
        let last = align_up(end, page_size).ok_or(conflict)?;

        while page < last {
            if self.is_claimed(page) {
                page += page_size;
                continue;
            }

            let mut run_end = page + page_size;
            while run_end < last && !self.is_claimed(run_end) {
                run_end += page_size;
            }

            let mut address = page;
            let pages = ((run_end - page) / page_size) as usize;
            let status =
                (self.bs.allocate_pages)(ALLOCATE_ADDRESS, LOADER_DATA, pages, &mut address);
            if status != EFI_SUCCESS {
                keel_core::log_error!(
                    "AllocatePages {:#x} x{} failed: {:#x}",
                    page,
                    pages,
                    status
                );
                return Err(MemoryError::Conflict {
                    base: page,
                    length: run_end - page,
                });
            }

            self.claimed.push((page, run_end));
            page = run_end;
        }

        Ok(())
    }
}

impl PhysicalMemory for UefiPhysicalMemory<'_> {
    fn window(&mut self, base: u64, len: usize) -> Result<&mut [u8], MemoryError> {
        let conflict = MemoryError::Conflict {
            base,
            length: len as u64,
        };
        let end = base.checked_add(len as u64).ok_or(conflict)?;
        if len == 0 {
            return Ok(&mut []);
        }
        self.claim(base, end)?;

        // SAFETY: identity mapped, claimed from the firmware above and
        // reserved in the allocation record by the caller
        Ok(unsafe { core::slice::from_raw_parts_mut(base as *mut u8, len) })
    }
}

