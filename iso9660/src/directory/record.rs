//! Directory Record structure
//!
//! Directory records describe files and subdirectories. Layout (BP = byte
//! position, 1-based as in ECMA-119):
//!
//! | BP    | field                                  |
//! |-------|----------------------------------------|
//! | 1     | record length                          |
//! | 3-10  | extent location (both-endian 32-bit)   |
//! | 11-18 | data length (both-endian 32-bit)       |
//! | 26    | file flags                             |
//! | 33    | file identifier length                 |
//! | 34-   | file identifier                        |

use crate::error::{FsError, Result};
use crate::types::{DirectoryRecord, FileFlags};
use crate::utils::sector::le_u32;
use alloc::string::String;

/// Fixed part of a record, before the identifier
pub const HEADER_LENGTH: usize = 33;

/// Minimum record length (header plus a one-byte identifier)
pub const MIN_LENGTH: usize = HEADER_LENGTH + 1;

/// Borrowed view of one on-disk record
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    bytes: &'a [u8],
}

impl<'a> RawRecord<'a> {
    /// Parse the record at the start of `data`
    ///
    /// `data` must extend at least to the end of the record; a record whose
    /// declared length or identifier runs past it is corrupt.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let length = *data.first().ok_or(FsError::CorruptDirectory)? as usize;
        if length < MIN_LENGTH || length > data.len() {
            return Err(FsError::CorruptDirectory);
        }

        let id_len = data[32] as usize;
        if id_len == 0 || HEADER_LENGTH + id_len > length {
            return Err(FsError::CorruptDirectory);
        }

        Ok(Self {
            bytes: &data[..length],
        })
    }

    /// Record length in bytes
    pub fn length(&self) -> usize {
        self.bytes.len()
    }

    /// Extent LBA (little-endian part of both-endian field)
    pub fn extent_lba(&self) -> u32 {
        le_u32(self.bytes, 2)
    }

    /// Data length (little-endian part)
    pub fn data_length(&self) -> u32 {
        le_u32(self.bytes, 10)
    }

    /// Parse file flags
    pub fn flags(&self) -> FileFlags {
        FileFlags::from_bits(self.bytes[25])
    }

    /// File identifier bytes
    pub fn identifier(&self) -> &'a [u8] {
        let len = self.bytes[32] as usize;
        &self.bytes[HEADER_LENGTH..HEADER_LENGTH + len]
    }

    /// The `.` (0x00) and `..` (0x01) entries
    pub fn is_self_or_parent(&self) -> bool {
        matches!(self.identifier(), [0x00] | [0x01])
    }

    /// Copy into an owned record
    pub fn to_record(&self) -> DirectoryRecord {
        DirectoryRecord {
            name: String::from_utf8_lossy(self.identifier()).into_owned(),
            extent_lba: self.extent_lba(),
            data_length: self.data_length(),
            flags: self.flags(),
        }
    }
}
