//! Pipeline error type

use crate::bootinfo::HandoffError;
use crate::image::ImageError;
use crate::memory::MemoryError;
use crate::stage::StageError;
use core::fmt;
use iso9660::FsError;

/// Why a device could not be booted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    /// Opening the boot volume
    Volume(FsError),
    /// Locating the kernel image
    KernelPath(FsError),
    /// Loading the kernel image
    Kernel(ImageError),
    /// Staging the modules
    Modules(StageError),
    /// Reserving the boot information area
    Memory(MemoryError),
    /// Writing the boot information or leaving the firmware
    Handoff(HandoffError),
}

impl BootError {
    /// Whether this device simply does not hold a bootable volume
    pub fn is_not_bootable(&self) -> bool {
        matches!(
            self,
            BootError::Volume(FsError::BadVolume) | BootError::KernelPath(FsError::NotFound)
        )
    }
}

impl From<ImageError> for BootError {
    fn from(e: ImageError) -> Self {
        BootError::Kernel(e)
    }
}

impl From<StageError> for BootError {
    fn from(e: StageError) -> Self {
        BootError::Modules(e)
    }
}

impl From<MemoryError> for BootError {
    fn from(e: MemoryError) -> Self {
        BootError::Memory(e)
    }
}

impl From<HandoffError> for BootError {
    fn from(e: HandoffError) -> Self {
        BootError::Handoff(e)
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volume(e) => write!(f, "Boot volume: {}", e),
            Self::KernelPath(e) => write!(f, "Kernel: {}", e),
            Self::Kernel(e) => write!(f, "Kernel: {}", e),
            Self::Modules(e) => write!(f, "{}", e),
            Self::Memory(e) => write!(f, "{}", e),
            Self::Handoff(e) => write!(f, "Handoff: {}", e),
        }
    }
}

/// Result of a pipeline step
pub type Result<T> = core::result::Result<T, BootError>;
