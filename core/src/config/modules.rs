//! Driver module table
//!
//! The kernel loads its driver modules in table order, so the order below is
//! part of the boot contract. Each configuration rule names the module it
//! affects; [`ModuleTable::resolve`] is a pure function of the options.

use super::options::BootOptions;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Name meaning "configured out, do not load"
pub const TOMBSTONE: &str = "NONE";

/// Symbolic driver module identifiers, in load order
///
/// See [`ModuleId::file_name`] for the file behind each one.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleId {
    Zero,
    Random,
    Serial,
    DebugShell,
    Procfs,
    Tmpfs,
    Ata,
    Ext2,
    Iso9660,
    Ps2Keyboard,
    Ps2Mouse,
    LfbVideo,
    VboxGuest,
    Vmware,
    VideoSet,
    PacketFs,
    Sound,
    Ac97,
    Net,
    Pcnet,
    Rtl,
    E1000,
    PcSpeaker,
}

impl ModuleId {
    /// Every module, in load order
    pub const ALL: [ModuleId; 23] = [
        ModuleId::Zero,
        ModuleId::Random,
        ModuleId::Serial,
        ModuleId::DebugShell,
        ModuleId::Procfs,
        ModuleId::Tmpfs,
        ModuleId::Ata,
        ModuleId::Ext2,
        ModuleId::Iso9660,
        ModuleId::Ps2Keyboard,
        ModuleId::Ps2Mouse,
        ModuleId::LfbVideo,
        ModuleId::VboxGuest,
        ModuleId::Vmware,
        ModuleId::VideoSet,
        ModuleId::PacketFs,
        ModuleId::Sound,
        ModuleId::Ac97,
        ModuleId::Net,
        ModuleId::Pcnet,
        ModuleId::Rtl,
        ModuleId::E1000,
        ModuleId::PcSpeaker,
    ];

    /// Default file name in the module directory
    pub fn file_name(self) -> &'static str {
        match self {
            ModuleId::Zero => "ZERO.KO",
            ModuleId::Random => "RANDOM.KO",
            ModuleId::Serial => "SERIAL.KO",
            ModuleId::DebugShell => "DEBUG_SH.KO",
            ModuleId::Procfs => "PROCFS.KO",
            ModuleId::Tmpfs => "TMPFS.KO",
            ModuleId::Ata => "ATA.KO",
            ModuleId::Ext2 => "EXT2.KO",
            ModuleId::Iso9660 => "ISO9660.KO",
            ModuleId::Ps2Keyboard => "PS2KBD.KO",
            ModuleId::Ps2Mouse => "PS2MOUSE.KO",
            ModuleId::LfbVideo => "LFBVIDEO.KO",
            ModuleId::VboxGuest => "VBOXGUES.KO",
            ModuleId::Vmware => "VMWARE.KO",
            ModuleId::VideoSet => "VIDSET.KO",
            ModuleId::PacketFs => "PACKETFS.KO",
            ModuleId::Sound => "SND.KO",
            ModuleId::Ac97 => "AC97.KO",
            ModuleId::Net => "NET.KO",
            ModuleId::Pcnet => "PCNET.KO",
            ModuleId::Rtl => "RTL.KO",
            ModuleId::E1000 => "E1000.KO",
            ModuleId::PcSpeaker => "PCSPKR.KO",
        }
    }

    /// Staging aborts if this module is missing (root filesystem driver)
    pub fn is_required(self) -> bool {
        matches!(self, ModuleId::Ext2)
    }

    /// File to load under `options`, or `None` when configured out
    pub fn select(self, options: &BootOptions) -> Option<&'static str> {
        let enabled = match self {
            ModuleId::Ata => {
                return if options.legacy_ata {
                    Some("ATAOLD.KO")
                } else if options.dma_ata {
                    Some(self.file_name())
                } else {
                    None
                };
            }
            ModuleId::DebugShell => options.debug_shell,
            ModuleId::LfbVideo => options.video,
            ModuleId::VboxGuest => options.video && options.vbox,
            ModuleId::Vmware => options.video && options.vmware,
            ModuleId::VideoSet => options.video && options.debug_shell,
            ModuleId::Sound | ModuleId::Ac97 => options.sound,
            ModuleId::Net | ModuleId::Pcnet | ModuleId::Rtl | ModuleId::E1000 => options.network,
            _ => true,
        };
        enabled.then(|| self.file_name())
    }
}

/// File an entry refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleFile {
    /// Configured out
    Tombstone,
    /// File name within the entry's location
    Named(String),
}

/// Directory an entry is loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleLocation {
    /// The configured module directory
    Drivers,
    /// The volume root
    Root,
}

/// One row of the resolved module table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// What to load
    pub file: ModuleFile,
    /// Where to load it from
    pub location: ModuleLocation,
    /// Whether staging stops when the file is absent
    pub required: bool,
}

impl ModuleEntry {
    /// Best-effort driver module; `"NONE"` yields a tombstone
    pub fn driver(name: &str) -> Self {
        let file = if name == TOMBSTONE {
            ModuleFile::Tombstone
        } else {
            ModuleFile::Named(name.to_string())
        };
        Self {
            file,
            location: ModuleLocation::Drivers,
            required: false,
        }
    }

    /// Required file at the volume root
    pub fn root_file(name: &str) -> Self {
        Self {
            file: ModuleFile::Named(name.to_string()),
            location: ModuleLocation::Root,
            required: true,
        }
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Whether the entry is configured out
    pub fn is_tombstone(&self) -> bool {
        self.file == ModuleFile::Tombstone
    }

    /// File name, `None` for a tombstone
    pub fn name(&self) -> Option<&str> {
        match &self.file {
            ModuleFile::Tombstone => None,
            ModuleFile::Named(name) => Some(name),
        }
    }
}

/// Immutable, ordered module table
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleTable {
    entries: Vec<ModuleEntry>,
}

impl ModuleTable {
    /// Driver table for `options`, followed by the ramdisk at the volume root
    pub fn resolve(options: &BootOptions, ramdisk: &str) -> Self {
        let mut entries: Vec<ModuleEntry> = ModuleId::ALL
            .iter()
            .map(|&id| {
                let entry = ModuleEntry::driver(id.select(options).unwrap_or(TOMBSTONE));
                if id.is_required() {
                    entry.required()
                } else {
                    entry
                }
            })
            .collect();

        entries.push(ModuleEntry::root_file(ramdisk));
        Self { entries }
    }

    /// Table from explicit entries, kept in the given order
    pub fn from_entries(entries: Vec<ModuleEntry>) -> Self {
        Self { entries }
    }

    /// Best-effort driver table from plain names (`"NONE"` = tombstone)
    pub fn from_names(names: &[&str]) -> Self {
        Self {
            entries: names.iter().map(|name| ModuleEntry::driver(name)).collect(),
        }
    }

    /// Entries in table order
    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    /// Iterate in table order
    pub fn iter(&self) -> core::slice::Iter<'_, ModuleEntry> {
        self.entries.iter()
    }

    /// Number of entries, tombstones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a driver module (table position of `id`)
    pub fn driver(&self, id: ModuleId) -> Option<&ModuleEntry> {
        let index = ModuleId::ALL.iter().position(|&m| m == id)?;
        self.entries.get(index)
    }
}
