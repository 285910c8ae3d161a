//! Direct transport: one command per read

use crate::error::TransportFault;

/// Device that reads a run of sectors with a single command
///
/// Implemented by the UEFI BlockIo adapter and the legacy ATA PIO driver.
pub trait DirectCommand {
    /// Read `count` sectors starting at `lba` into `dst`
    ///
    /// `dst.len()` is always `count * sector_size`. A failed call may leave
    /// `dst` partially written; the caller retries the whole command.
    fn read(&mut self, lba: u64, count: u32, dst: &mut [u8]) -> Result<(), TransportFault>;
}
