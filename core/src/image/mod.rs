//! Kernel image loading
//!
//! Reads an ELF executable from the boot volume and copies its loadable
//! segments to the physical addresses the image was linked for. Nothing is
//! written until every header has been validated and every destination has
//! been reserved in the allocation record.

pub mod elf;

use crate::memory::{AllocationRecord, MemoryError, Occupant, PhysicalMemory};
use alloc::vec;
use alloc::vec::Vec;
use blockio::BlockError;
use core::fmt;
use elf::{ElfHeader, ProgramHeader, HEADER_READ};
use gpt_disk_io::BlockIo;
use iso9660::{DirectoryRecord, FsError, VolumeDescriptor};

/// Architecture the kernel image must be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetArch {
    /// ELF32, entered in 32-bit protected mode
    #[default]
    I386,
    /// ELF64
    X86_64,
}

/// Why the kernel image was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageError {
    /// Not an ELF file
    BadMagic,
    /// ELF, but not for the configured target (class, byte order, machine or type)
    UnsupportedClass,
    /// A segment lands outside placeable RAM or on something already placed
    MemoryConflict {
        /// Segment load address
        base: u64,
        /// Segment size in memory
        length: u64,
    },
    /// Header or program header table is truncated or inconsistent
    Malformed,
    /// No `PT_LOAD` segment with a memory size
    NoLoadableSegments,
    /// Reading the image failed
    Fs(FsError),
}

impl From<FsError> for ImageError {
    fn from(e: FsError) -> Self {
        ImageError::Fs(e)
    }
}

impl From<BlockError> for ImageError {
    fn from(e: BlockError) -> Self {
        ImageError::Fs(FsError::Block(e))
    }
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "Not an ELF image"),
            Self::UnsupportedClass => write!(f, "ELF image is for another architecture"),
            Self::MemoryConflict { base, length } => {
                write!(f, "Segment at {:#x} (+{:#x}) conflicts with reserved memory", base, length)
            }
            Self::Malformed => write!(f, "Malformed ELF headers"),
            Self::NoLoadableSegments => write!(f, "ELF image has no loadable segments"),
            Self::Fs(e) => write!(f, "Failed to read image: {}", e),
        }
    }
}

/// Whether a placement holds file bytes or zeroes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    /// Bytes copied from the image file
    Copy,
    /// Zeroed tail past the file bytes (bss)
    ZeroFill,
}

/// One placed piece of a loadable segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPlacement {
    /// Physical address
    pub address: u64,
    /// Bytes placed
    pub length: u64,
    /// Copied or zeroed
    pub kind: PlacementKind,
}

/// A kernel in memory, ready to be described to itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    /// Physical entry address from the ELF header
    pub entry_point: u64,
    /// Placements in program header order
    pub placements: Vec<SegmentPlacement>,
}

impl LoadedImage {
    /// Lowest and one-past-highest placed address
    pub fn span(&self) -> Option<(u64, u64)> {
        let start = self.placements.iter().map(|p| p.address).min()?;
        let end = self.placements.iter().map(|p| p.address + p.length).max()?;
        Some((start, end))
    }
}

/// A validated loadable segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    address: u64,
    offset: u64,
    file_len: u64,
    mem_len: u64,
}

/// Load the ELF image at `record` into physical memory
///
/// On any error before the first segment write, neither `allocations` nor
/// `memory` has been touched.
pub fn load<B, M>(
    block_io: &mut B,
    volume: &VolumeDescriptor,
    record: &DirectoryRecord,
    target: TargetArch,
    allocations: &mut AllocationRecord,
    memory: &mut M,
) -> Result<LoadedImage, ImageError>
where
    B: BlockIo<Error = BlockError>,
    M: PhysicalMemory + ?Sized,
{
    let file_len = record.len();

    let mut raw_header = [0u8; HEADER_READ];
    let header_len = (HEADER_READ as u64).min(file_len) as usize;
    iso9660::read_range(block_io, volume, record, 0, &mut raw_header[..header_len])?;
    let header = ElfHeader::parse(&raw_header[..header_len], target)?;

    let segments = read_segments(block_io, volume, record, &header)?;

    // Reserve on a copy first so a conflict leaves the record unchanged
    let mut trial = allocations.clone();
    for segment in &segments {
        trial
            .reserve(segment.address, segment.mem_len, Occupant::Kernel)
            .map_err(|_| ImageError::MemoryConflict {
                base: segment.address,
                length: segment.mem_len,
            })?;
    }
    *allocations = trial;

    let mut placements = Vec::with_capacity(segments.len() * 2);
    for segment in &segments {
        write_segment(block_io, volume, record, segment, memory)?;

        if segment.file_len > 0 {
            placements.push(SegmentPlacement {
                address: segment.address,
                length: segment.file_len,
                kind: PlacementKind::Copy,
            });
        }
        if segment.mem_len > segment.file_len {
            placements.push(SegmentPlacement {
                address: segment.address + segment.file_len,
                length: segment.mem_len - segment.file_len,
                kind: PlacementKind::ZeroFill,
            });
        }
    }

    crate::log_info!(
        "Loaded kernel: {} segment(s), entry {:#x}",
        segments.len(),
        header.entry
    );

    Ok(LoadedImage {
        entry_point: header.entry,
        placements,
    })
}

fn read_segments<B: BlockIo<Error = BlockError>>(
    block_io: &mut B,
    volume: &VolumeDescriptor,
    record: &DirectoryRecord,
    header: &ElfHeader,
) -> Result<Vec<Segment>, ImageError> {
    let file_len = record.len();
    let table_len = header.table_len();
    let table_end = header
        .phoff
        .checked_add(table_len)
        .ok_or(ImageError::Malformed)?;
    if table_end > file_len {
        return Err(ImageError::Malformed);
    }

    let mut table = vec![0u8; table_len as usize];
    iso9660::read_range(block_io, volume, record, header.phoff, &mut table)?;

    let mut segments = Vec::new();
    for raw in table.chunks_exact(header.phentsize as usize) {
        let ph = ProgramHeader::parse(raw, header.target);
        if !ph.is_loadable() {
            continue;
        }

        let file_end = ph.offset.checked_add(ph.filesz).ok_or(ImageError::Malformed)?;
        if ph.filesz > ph.memsz || file_end > file_len {
            return Err(ImageError::Malformed);
        }
        ph.paddr.checked_add(ph.memsz).ok_or(ImageError::Malformed)?;

        segments.push(Segment {
            address: ph.paddr,
            offset: ph.offset,
            file_len: ph.filesz,
            mem_len: ph.memsz,
        });
    }

    if segments.is_empty() {
        return Err(ImageError::NoLoadableSegments);
    }
    Ok(segments)
}

fn write_segment<B, M>(
    block_io: &mut B,
    volume: &VolumeDescriptor,
    record: &DirectoryRecord,
    segment: &Segment,
    memory: &mut M,
) -> Result<(), ImageError>
where
    B: BlockIo<Error = BlockError>,
    M: PhysicalMemory + ?Sized,
{
    let conflict = |_: MemoryError| ImageError::MemoryConflict {
        base: segment.address,
        length: segment.mem_len,
    };
    let file_len = usize::try_from(segment.file_len).map_err(|_| ImageError::Malformed)?;
    let mem_len = usize::try_from(segment.mem_len).map_err(|_| ImageError::Malformed)?;

    let window = memory.window(segment.address, mem_len).map_err(conflict)?;
    let (copied, zeroed) = window.split_at_mut(file_len);
    iso9660::read_range(block_io, volume, record, segment.offset, copied)?;
    zeroed.fill(0);
    Ok(())
}
