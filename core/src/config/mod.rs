//! Boot configuration
//!
//! Turns the menu's toggles and chosen mode into the immutable
//! [`BootConfiguration`] the assembly pipeline consumes.

pub mod cmdline;
pub mod modules;
pub mod options;

pub use cmdline::{CommandLineBuilder, Fragment};
pub use modules::{ModuleEntry, ModuleFile, ModuleId, ModuleLocation, ModuleTable, TOMBSTONE};
pub use options::{BootMode, BootOptions};

use crate::image::TargetArch;
use alloc::string::{String, ToString};

/// Page size used for module placement
pub const PAGE_SIZE: u64 = 4096;

/// Fixed loader settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Directory holding the driver modules
    pub module_dir: &'static str,
    /// Kernel image path
    pub kernel_path: &'static str,
    /// Root ramdisk image
    pub ramdisk_path: &'static str,
    /// Ramdisk used when netinit is on
    pub netinit_path: &'static str,
    /// Placement alignment for staged modules
    pub module_alignment: u64,
    /// Kernel image architecture
    pub target: TargetArch,
    /// Attempts per sector transfer
    pub retry_attempts: u32,
    /// Polls per packet command before timing out
    pub poll_limit: u32,
    /// Name reported to the kernel
    pub loader_name: &'static str,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            module_dir: "MOD",
            kernel_path: "/KERNEL.",
            ramdisk_path: "RAMDISK.IMG",
            netinit_path: "NETINIT.",
            module_alignment: PAGE_SIZE,
            target: TargetArch::I386,
            retry_attempts: blockio::RetryPolicy::DEFAULT_ATTEMPTS,
            poll_limit: blockio::transport::packet::DEFAULT_POLL_LIMIT,
            loader_name: "keelboot",
        }
    }
}

/// Everything the pipeline needs to know about what to boot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootConfiguration {
    /// Modules to stage, in table order
    pub modules: ModuleTable,
    /// Kernel command line
    pub command_line: String,
    /// Kernel image path on the volume
    pub kernel_path: String,
    /// Selected boot mode
    pub entry_mode: BootMode,
    /// Directory holding the driver modules
    pub module_dir: String,
    /// Placement alignment for staged modules
    pub module_alignment: u64,
    /// Kernel image architecture
    pub target: TargetArch,
    /// Name reported to the kernel
    pub loader_name: String,
}

impl BootConfiguration {
    /// Resolve toggles and mode into a configuration
    pub fn resolve(options: &BootOptions, mode: BootMode, settings: &LoaderSettings) -> Self {
        let ramdisk = if options.netinit {
            settings.netinit_path
        } else {
            settings.ramdisk_path
        };

        Self {
            modules: ModuleTable::resolve(options, ramdisk),
            command_line: CommandLineBuilder::from_options(options, mode).build(),
            kernel_path: settings.kernel_path.to_string(),
            entry_mode: mode,
            module_dir: settings.module_dir.to_string(),
            module_alignment: settings.module_alignment,
            target: settings.target,
            loader_name: settings.loader_name.to_string(),
        }
    }
}
