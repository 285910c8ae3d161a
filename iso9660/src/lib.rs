//! ISO9660 Volume Reader
//!
//! A `no_std` reader for the read-only ISO9660 (ECMA-119) filesystem found on
//! the boot medium.
//!
//! # Overview
//!
//! - Primary Volume Descriptor parsing (sector 16 onwards)
//! - Path resolution by streaming directory scans, one logical block at a time
//! - File reads into caller-supplied buffers, whole sectors straight from the
//!   device and a single bounce sector for unaligned edges
//!
//! Directories are never materialised in memory: each path component is a
//! fresh scan of its parent's extent, so arbitrarily large directories cost a
//! single block of stack.
//!
//! # Architecture
//!
//! 1. **Volume layer** - finds and validates the Primary Volume Descriptor
//! 2. **Directory layer** - raw record parsing and per-component scans
//! 3. **File layer** - byte-range reads from a file extent
//!
//! # Usage
//!
//! ```ignore
//! use iso9660::{open, resolve, read_into};
//!
//! let volume = open(&mut device, 0)?;
//! let kernel = resolve(&mut device, &volume, "/KERNEL.")?;
//! read_into(&mut device, &volume, &kernel, &mut buffer)?;
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod directory;
pub mod error;
pub mod file;
pub mod types;
pub mod utils;
pub mod volume;

mod trace;

pub use error::{FsError, Result};
pub use types::{DirectoryRecord, FileFlags, VolumeDescriptor};

// High-level API exports
pub use directory::resolve;
pub use file::{read_into, read_range};
pub use volume::open;
