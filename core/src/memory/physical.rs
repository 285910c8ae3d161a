//! Access to physical memory
//!
//! On the firmware side the loader runs identity mapped, so a window is the
//! physical range itself once its pages have been claimed. Host tests back
//! it with an ordinary buffer.

use super::MemoryError;

/// Writable view of physical memory
pub trait PhysicalMemory {
    /// Writable bytes of `[base, base + len)`
    ///
    /// Only called for ranges already reserved in the allocation record.
    fn window(&mut self, base: u64, len: usize) -> Result<&mut [u8], MemoryError>;

    /// Copy `bytes` to `base`
    fn write(&mut self, base: u64, bytes: &[u8]) -> Result<(), MemoryError> {
        self.window(base, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }
}
