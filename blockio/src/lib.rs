//! Sector-level block I/O for the boot medium
//!
//! A `no_std` block layer that reads fixed-size sectors from a storage device
//! through one of two transport families:
//!
//! - **Direct** - one device command per transfer (UEFI BlockIo, ATA PIO)
//! - **Packet** - a SCSI command descriptor block is submitted and the device
//!   is polled until it has delivered the data (ATAPI)
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     ISO9660 volume reader / loaders    │
//! │        (uses gpt_disk_io::BlockIo)     │
//! └───────────────────┬────────────────────┘
//!                     │
//!                     ▼
//! ┌────────────────────────────────────────┐
//! │            BlockDevice                 │
//! │  range checks, chunking, bounded retry │
//! └───────────────────┬────────────────────┘
//!                     │ Transport
//!          ┌──────────┴──────────┐
//!          ▼                     ▼
//!   DirectCommand          PacketCommand
//!  (single command)   (CDB, submit, poll, drain)
//! ```
//!
//! Callers above [`BlockDevice`] never see which transport is in use. Every
//! read is a fresh transport operation; there is no caching.
//!
//! # Usage
//!
//! ```ignore
//! use blockio::{BlockDevice, Geometry, Transport};
//!
//! let geometry = Geometry::new(2048, total_sectors).ok_or(...)?;
//! let mut device = BlockDevice::new(geometry, Transport::Packet(&mut atapi));
//! device.read_sectors(16, 1, &mut buffer)?;
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod device;
pub mod error;
pub mod geometry;
pub mod transport;

mod trace;

pub use device::{BlockDevice, RetryPolicy};
pub use error::{BlockError, Result, TransportFault};
pub use geometry::{Geometry, TransportKind};
pub use transport::direct::DirectCommand;
pub use transport::packet::{Cdb, PacketCommand, PacketPhase};
pub use transport::Transport;
