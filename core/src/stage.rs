//! Module staging
//!
//! Copies every configured module into freshly allocated physical memory, in
//! table order. Tombstones are skipped without a trace in the output.

use crate::config::{BootConfiguration, ModuleEntry, ModuleLocation};
use crate::memory::{AllocationRecord, MemoryError, Occupant, PhysicalMemory};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use blockio::BlockError;
use core::fmt;
use gpt_disk_io::BlockIo;
use iso9660::{FsError, VolumeDescriptor};

/// One staged module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Configured file name
    pub name: String,
    /// Physical load address
    pub address: u64,
    /// File length in bytes
    pub length: u64,
}

impl ModuleRecord {
    /// One past the last byte of the module
    pub fn end(&self) -> u64 {
        self.address + self.length
    }
}

/// Why staging stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A required module is not on the volume
    Missing {
        /// Configured file name
        module: String,
        /// Always [`FsError::NotFound`]
        source: FsError,
    },
    /// Looking a module up failed for another reason
    Resolve {
        /// Configured file name
        module: String,
        /// Lookup failure as the volume reader reported it
        source: FsError,
    },
    /// A located module could not be read
    Read {
        /// Configured file name
        module: String,
        /// Read failure as the volume reader reported it
        source: FsError,
    },
    /// No room for a module
    Memory(MemoryError),
}

impl From<MemoryError> for StageError {
    fn from(e: MemoryError) -> Self {
        StageError::Memory(e)
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { module, source } => write!(f, "Module {}: {}", module, source),
            Self::Resolve { module, source } => {
                write!(f, "Looking up module {}: {}", module, source)
            }
            Self::Read { module, source } => write!(f, "Reading module {}: {}", module, source),
            Self::Memory(e) => write!(f, "Staging modules: {}", e),
        }
    }
}

/// Path of a module on the volume
pub fn module_path(module_dir: &str, entry: &ModuleEntry) -> Option<String> {
    let name = entry.name()?;
    Some(match entry.location {
        ModuleLocation::Drivers => format!("/{}/{}", module_dir.trim_matches('/'), name),
        ModuleLocation::Root => format!("/{}", name),
    })
}

/// Stage every module of `config` into memory
///
/// The returned records mirror table order with tombstones and skipped
/// best-effort modules left out. Only a best-effort module that is absent
/// is skipped; a failed lookup stops staging whatever the module's flag.
pub fn stage_all<B, M>(
    block_io: &mut B,
    volume: &VolumeDescriptor,
    config: &BootConfiguration,
    allocations: &mut AllocationRecord,
    memory: &mut M,
) -> Result<Vec<ModuleRecord>, StageError>
where
    B: BlockIo<Error = BlockError>,
    M: PhysicalMemory + ?Sized,
{
    let mut staged = Vec::new();

    for entry in config.modules.iter() {
        let (name, path) = match (entry.name(), module_path(&config.module_dir, entry)) {
            (Some(name), Some(path)) => (name, path),
            _ => continue,
        };

        let record = match iso9660::resolve(block_io, volume, &path) {
            Ok(record) => record,
            Err(FsError::NotFound) if !entry.required => {
                crate::log_warn!("Module {} not found, skipping", path);
                continue;
            }
            Err(FsError::NotFound) => {
                crate::log_error!("Required module {} not found", path);
                return Err(StageError::Missing {
                    module: name.to_string(),
                    source: FsError::NotFound,
                });
            }
            Err(source) => {
                crate::log_error!("Module {}: {}", path, source);
                return Err(StageError::Resolve {
                    module: name.to_string(),
                    source,
                });
            }
        };

        let reservation =
            allocations.allocate(record.len(), config.module_alignment, Occupant::Module)?;
        let window = memory.window(reservation.base, record.data_length as usize)?;
        iso9660::read_into(block_io, volume, &record, window).map_err(|source| StageError::Read {
            module: name.to_string(),
            source,
        })?;

        crate::log_debug!(
            "Staged {} at {:#x} ({} bytes)",
            name,
            reservation.base,
            record.data_length
        );

        staged.push(ModuleRecord {
            name: name.to_string(),
            address: reservation.base,
            length: record.len(),
        });
    }

    crate::log_info!("Staged {} module(s)", staged.len());
    Ok(staged)
}
