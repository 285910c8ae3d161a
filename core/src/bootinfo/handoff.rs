//! Control transfer
//!
//! [`prepare`] does everything that can fail while the firmware is still
//! there to report it. [`commit`] releases the firmware and jumps; it never
//! returns.

use super::{multiboot, BootDescriptor};
use crate::memory::{MemoryError, PhysicalMemory};
use core::fmt;

/// Value in `EAX` at kernel entry
pub const MULTIBOOT_MAGIC: u32 = 0x2BAD_B002;

/// Why the kernel could not be entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    /// No boot information area was reserved
    NoInfoArea,
    /// Encoded structure is larger than its reserved area
    InfoAreaTooSmall {
        /// Encoded size
        needed: usize,
        /// Reserved size
        available: u64,
    },
    /// A 32-bit field cannot hold this address
    AddressTooHigh {
        /// Offending address
        address: u64,
    },
    /// Writing the encoded structure failed
    Memory(MemoryError),
    /// Firmware status code
    Firmware(usize),
}

impl From<MemoryError> for HandoffError {
    fn from(e: MemoryError) -> Self {
        HandoffError::Memory(e)
    }
}

impl fmt::Display for HandoffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInfoArea => write!(f, "No boot information area reserved"),
            Self::InfoAreaTooSmall { needed, available } => write!(
                f,
                "Boot information needs {} bytes, {} reserved",
                needed, available
            ),
            Self::AddressTooHigh { address } => {
                write!(f, "Address {:#x} is not reachable from 32-bit code", address)
            }
            Self::Memory(e) => write!(f, "{}", e),
            Self::Firmware(status) => write!(f, "Firmware error {:#x}", status),
        }
    }
}

/// Firmware operations around the jump
pub trait Firmware {
    /// Last checks before anything is released
    fn ready_exit(&mut self) -> Result<(), HandoffError>;

    /// Give up firmware ownership of the machine
    fn exit_boot_services(&mut self) -> Result<(), HandoffError>;

    /// Jump to `entry` with the Multiboot register contract
    fn enter_kernel(self, entry: u32, magic: u32, info: u32) -> !;

    /// Stop the machine
    fn halt(self) -> !;
}

/// Encoded, written and ready to jump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreparedHandoff {
    entry: u32,
    info: u32,
}

impl PreparedHandoff {
    /// Kernel entry address
    pub fn entry(&self) -> u32 {
        self.entry
    }

    /// Physical address of the Multiboot information block
    pub fn info(&self) -> u32 {
        self.info
    }
}

/// Encode `descriptor` into its reserved area and check the firmware can exit
pub fn prepare<M, F>(
    descriptor: &BootDescriptor,
    memory: &mut M,
    firmware: &mut F,
) -> Result<PreparedHandoff, HandoffError>
where
    M: PhysicalMemory + ?Sized,
    F: Firmware,
{
    let area = descriptor.info_area.ok_or(HandoffError::NoInfoArea)?;
    let entry = u32::try_from(descriptor.entry_point).map_err(|_| HandoffError::AddressTooHigh {
        address: descriptor.entry_point,
    })?;
    let info = u32::try_from(area.base).map_err(|_| HandoffError::AddressTooHigh { address: area.base })?;

    let encoded = multiboot::encode(descriptor, area.base)?;
    if encoded.len() as u64 > area.length {
        return Err(HandoffError::InfoAreaTooSmall {
            needed: encoded.len(),
            available: area.length,
        });
    }
    memory.write(area.base, &encoded)?;

    firmware.ready_exit()?;

    crate::log_info!(
        "Boot information at {:#x}: {} module(s), {} map entries",
        info,
        descriptor.modules.len(),
        descriptor.memory_map.len()
    );

    Ok(PreparedHandoff { entry, info })
}

/// Release the firmware and enter the kernel
///
/// Logging stops first; a failed exit halts.
pub fn commit<F: Firmware>(prepared: PreparedHandoff, mut firmware: F) -> ! {
    crate::log_info!("Entering kernel at {:#x}", prepared.entry);
    crate::logger::freeze();

    match firmware.exit_boot_services() {
        Ok(()) => firmware.enter_kernel(prepared.entry, MULTIBOOT_MAGIC, prepared.info),
        Err(_) => firmware.halt(),
    }
}
