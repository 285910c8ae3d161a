//! Keel boot core
//!
//! Turns a block device and a boot configuration into a kernel in memory
//! with its modules and Multiboot information, ready for the jump.
//!
//! ```text
//! BootConfiguration ──┐
//!                     ▼
//! BlockIo ─► iso9660::open ─► resolve kernel ─► image::load
//!                                                   │
//!                       stage::stage_all ◄──────────┘
//!                             │
//!                             ▼
//!            bootinfo::build ─► prepare ─► commit (never returns)
//! ```
//!
//! Every placement goes through one [`memory::AllocationRecord`]; nothing is
//! written to physical memory until its range is reserved there.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
pub mod logger;

pub mod bootinfo;
pub mod config;
pub mod error;
pub mod image;
pub mod memory;
pub mod pipeline;
pub mod stage;

pub use config::{BootConfiguration, BootMode, BootOptions, LoaderSettings};
pub use error::{BootError, Result};
pub use pipeline::{assemble, Assembly, PlatformInfo};
