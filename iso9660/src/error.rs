//! Error types for ISO9660 operations

use blockio::BlockError;
use core::fmt;

/// Result type for ISO9660 operations
pub type Result<T> = core::result::Result<T, FsError>;

/// Errors that can occur while reading the volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// No valid Primary Volume Descriptor, or one with inconsistent fields
    BadVolume,

    /// A path component has no matching directory entry
    NotFound,

    /// A non-terminal path component names a file
    NotADirectory,

    /// Path has more components than the directory depth limit
    PathTooDeep,

    /// Destination buffer shorter than the file
    BufferTooSmall,

    /// Directory record overruns its block or is shorter than the fixed header
    CorruptDirectory,

    /// Requested range lies outside the file extent or the volume
    ExtentOutOfBounds,

    /// Block layer failure, passed through unchanged
    Block(BlockError),
}

impl From<BlockError> for FsError {
    fn from(err: BlockError) -> Self {
        Self::Block(err)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadVolume => write!(f, "No valid ISO9660 volume descriptor"),
            Self::NotFound => write!(f, "File or directory not found"),
            Self::NotADirectory => write!(f, "Path component is not a directory"),
            Self::PathTooDeep => write!(f, "Path exceeds maximum directory depth"),
            Self::BufferTooSmall => write!(f, "Buffer too small for file"),
            Self::CorruptDirectory => write!(f, "Corrupted directory record"),
            Self::ExtentOutOfBounds => write!(f, "File extent out of bounds"),
            Self::Block(err) => write!(f, "Block I/O error: {}", err),
        }
    }
}
