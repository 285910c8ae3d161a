//! Error types for block I/O operations

use core::fmt;

/// Result type for block I/O operations
pub type Result<T> = core::result::Result<T, BlockError>;

/// Errors surfaced by [`crate::BlockDevice`]
///
/// `OutOfRange` and `BufferTooSmall` are detected before any transfer is
/// issued. `TransportFailure` is only returned once the retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// Request extends past the last sector of the device
    OutOfRange,

    /// Destination buffer cannot hold the requested sectors
    BufferTooSmall,

    /// Controller or firmware reported an error on every attempt
    TransportFailure(TransportFault),

    /// Write requested on the read-only boot medium
    ReadOnly,
}

/// What went wrong inside a single transport operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// Device set its error bit; raw status and error registers
    Device {
        /// Status register
        status: u8,
        /// Error register
        error: u8,
    },

    /// Device never signalled completion within the poll budget
    Timeout,

    /// Firmware protocol returned a non-success status code
    Firmware(usize),

    /// Device delivered more or less data than was requested
    Protocol,

    /// No medium in the drive
    NoMedia,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "Sector range exceeds device extent"),
            Self::BufferTooSmall => write!(f, "Destination buffer too small"),
            Self::TransportFailure(fault) => write!(f, "Transport failure: {}", fault),
            Self::ReadOnly => write!(f, "Device is read-only"),
        }
    }
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device { status, error } => {
                write!(f, "device error (status={:#04x}, error={:#04x})", status, error)
            }
            Self::Timeout => write!(f, "command timed out"),
            Self::Firmware(status) => write!(f, "firmware status {:#x}", status),
            Self::Protocol => write!(f, "unexpected transfer length"),
            Self::NoMedia => write!(f, "no media present"),
        }
    }
}
