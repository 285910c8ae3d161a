//! The single allocation record
//!
//! Every placement decision (kernel segments, modules, the boot information
//! area) consults and updates this record before any byte is written.
//! Placeable memory is firmware-usable RAM between 1 MiB and 4 GiB; the
//! kernel is entered in 32-bit mode and can only address below 4 GiB.

use super::{align_up, MemoryError, MemoryKind, MemoryMap};
use alloc::vec::Vec;
use core::ops::Range;

/// Lowest placeable address
pub const PLACEMENT_FLOOR: u64 = 0x10_0000;

/// One past the highest placeable address
pub const PLACEMENT_CEILING: u64 = 0x1_0000_0000;

/// What a reservation holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// A kernel segment
    Kernel,
    /// A staged module
    Module,
    /// The boot information area
    BootInfo,
    /// Memory the loader itself uses up to the jump
    LoaderBuffer,
}

/// A claimed physical range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// Physical start address
    pub base: u64,
    /// Reserved bytes
    pub length: u64,
    /// What the range holds
    pub occupant: Occupant,
}

impl Reservation {
    /// One past the last reserved byte
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }

    fn overlaps(&self, base: u64, end: u64) -> bool {
        self.base < end && base < self.end()
    }
}

/// Single-writer bump allocator over the placeable ranges
#[derive(Debug, Clone)]
pub struct AllocationRecord {
    placeable: Vec<Range<u64>>,
    reservations: Vec<Reservation>,
    cursor: u64,
}

impl AllocationRecord {
    /// Record over the usable RAM of `map` between 1 MiB and 4 GiB
    pub fn new(map: &MemoryMap) -> Self {
        Self::with_bounds(map, PLACEMENT_FLOOR, PLACEMENT_CEILING)
    }

    /// Record over the usable RAM of `map` clipped to `[floor, ceiling)`
    pub fn with_bounds(map: &MemoryMap, floor: u64, ceiling: u64) -> Self {
        let mut placeable: Vec<Range<u64>> = Vec::new();
        for region in map.regions().iter().filter(|r| r.kind == MemoryKind::Usable) {
            let start = region.base.max(floor);
            let end = region.end().min(ceiling);
            if start >= end {
                continue;
            }
            match placeable.last_mut() {
                Some(last) if last.end == start => last.end = end,
                _ => placeable.push(start..end),
            }
        }

        Self {
            placeable,
            reservations: Vec::new(),
            cursor: floor,
        }
    }

    /// Placeable ranges, ascending
    pub fn placeable(&self) -> &[Range<u64>] {
        &self.placeable
    }

    /// Everything reserved so far, in reservation order
    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    /// Whether `[base, base + length)` could be reserved right now
    pub fn check(&self, base: u64, length: u64) -> Result<(), MemoryError> {
        let conflict = MemoryError::Conflict { base, length };
        let end = base.checked_add(length).ok_or(conflict)?;

        let inside = self
            .placeable
            .iter()
            .any(|range| range.start <= base && end <= range.end);
        if !inside {
            return Err(conflict);
        }

        if self.reservations.iter().any(|r| r.overlaps(base, end)) {
            return Err(conflict);
        }

        Ok(())
    }

    /// Claim a fixed range
    pub fn reserve(
        &mut self,
        base: u64,
        length: u64,
        occupant: Occupant,
    ) -> Result<Reservation, MemoryError> {
        self.check(base, length)?;
        Ok(self.record(base, length, occupant))
    }

    /// Claim `length` bytes (at least one byte, rounded to `align`) above
    /// everything reserved so far
    pub fn allocate(
        &mut self,
        length: u64,
        align: u64,
        occupant: Occupant,
    ) -> Result<Reservation, MemoryError> {
        let exhausted = MemoryError::Exhausted { length };
        let size = align_up(length.max(1), align).ok_or(exhausted)?;

        for range in &self.placeable {
            let mut base = align_up(self.cursor.max(range.start), align).ok_or(exhausted)?;

            loop {
                let end = match base.checked_add(size) {
                    Some(end) if end <= range.end => end,
                    _ => break,
                };

                match self.reservations.iter().find(|r| r.overlaps(base, end)) {
                    Some(blocker) => {
                        base = align_up(blocker.end(), align).ok_or(exhausted)?;
                    }
                    None => return Ok(self.record(base, size, occupant)),
                }
            }
        }

        Err(exhausted)
    }

    /// Track memory the loader itself still holds at handoff
    ///
    /// The range usually lies outside the placeable ranges (the firmware
    /// reports it as loader memory), so it is neither checked against them
    /// nor allowed to move the cursor.
    pub fn record_loader_buffer(&mut self, base: u64, length: u64) -> Reservation {
        let reservation = Reservation {
            base,
            length,
            occupant: Occupant::LoaderBuffer,
        };
        self.reservations.push(reservation);
        reservation
    }

    fn record(&mut self, base: u64, length: u64, occupant: Occupant) -> Reservation {
        let reservation = Reservation {
            base,
            length,
            occupant,
        };
        self.reservations.push(reservation);
        self.cursor = self.cursor.max(reservation.end());
        reservation
    }
}
