//! Boot option toggles and entry modes

/// How the system should come up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootMode {
    /// Graphical live session
    Graphical,
    /// VGA text mode
    TextVga,
    /// Single-user graphical terminal
    SingleUserTerminal,
}

impl BootMode {
    /// Menu order
    pub const ALL: [BootMode; 3] = [
        BootMode::Graphical,
        BootMode::TextVga,
        BootMode::SingleUserTerminal,
    ];

    /// Menu label
    pub fn name(self) -> &'static str {
        match self {
            BootMode::Graphical => "Normal Boot",
            BootMode::TextVga => "VGA Text Mode",
            BootMode::SingleUserTerminal => "Single-User Graphical Terminal",
        }
    }

    /// Whether the kernel expects a linear framebuffer
    pub fn wants_framebuffer(self) -> bool {
        !matches!(self, BootMode::TextVga)
    }
}

impl Default for BootMode {
    fn default() -> Self {
        BootMode::Graphical
    }
}

/// Resolved boot option toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootOptions {
    /// Loader debug output and the kernel serial log
    pub debug: bool,
    /// Legacy PIO-only ATA driver
    pub legacy_ata: bool,
    /// DMA-capable ATA driver
    pub dma_ata: bool,
    /// Kernel debug shell
    pub debug_shell: bool,
    /// Video modules
    pub video: bool,
    /// VirtualBox guest additions
    pub vbox: bool,
    /// VMware / QEMU absolute mouse
    pub vmware: bool,
    /// Audio subsystem and AC'97
    pub sound: bool,
    /// Network stack and NIC drivers
    pub network: bool,
    /// Migrate the root ramdisk into a writable tmpfs
    pub writable_root: bool,
    /// Debug shell on the first serial port
    pub serial_shell: bool,
    /// Fetch userspace over the network at boot
    pub netinit: bool,
}

impl Default for BootOptions {
    fn default() -> Self {
        Self {
            debug: false,
            legacy_ata: false,
            dma_ata: true,
            debug_shell: true,
            video: true,
            vbox: true,
            vmware: true,
            sound: true,
            network: true,
            writable_root: true,
            serial_shell: false,
            netinit: false,
        }
    }
}
