//! Kernel command line assembly
//!
//! The command line is a sequence of named fragments. Each fragment carries
//! its own trailing separator, so the final string is a plain concatenation.

use super::options::{BootMode, BootOptions};
use alloc::string::String;
use alloc::vec::Vec;

/// Named command line fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    /// Root filesystem on the ramdisk
    Root,
    /// Network init from the ramdisk instead of a root filesystem
    NetInit,
    /// Writable root
    Migrate,
    /// Live session start
    Graphical,
    /// Text console start
    TextVga,
    /// Terminal-only start
    SingleUser,
    /// Video mode hint
    Video,
    /// Kernel log on the serial port
    DebugLog,
    /// Kernel debugger on the serial port
    SerialDebug,
}

impl Fragment {
    /// Exact text appended for this fragment
    pub fn text(self) -> &'static str {
        match self {
            Fragment::Root => "root=/dev/ram0,nocache ",
            Fragment::NetInit => "init=/dev/ram0 _",
            Fragment::Migrate => "start=--migrate _",
            Fragment::Graphical => "start=live-session ",
            Fragment::TextVga => "start=--vga ",
            Fragment::SingleUser => "start=terminal ",
            Fragment::Video => "vid=auto,1440,900 ",
            Fragment::DebugLog => "logtoserial=3 ",
            Fragment::SerialDebug => "kdebug ",
        }
    }
}

/// Ordered list of fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLineBuilder {
    fragments: Vec<Fragment>,
}

impl CommandLineBuilder {
    /// Builder without fragments
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragments contributed by `options` booting into `mode`
    pub fn from_options(options: &BootOptions, mode: BootMode) -> Self {
        let mut builder = Self::new();

        if options.netinit {
            builder.push(Fragment::NetInit);
        } else {
            builder.push(Fragment::Root);
            if options.writable_root {
                builder.push(Fragment::Migrate);
            }
        }

        match mode {
            BootMode::Graphical => {
                builder.push(Fragment::Graphical);
                builder.push(Fragment::Video);
            }
            BootMode::TextVga => builder.push(Fragment::TextVga),
            BootMode::SingleUserTerminal => {
                builder.push(Fragment::SingleUser);
                builder.push(Fragment::Video);
            }
        }

        if options.debug {
            builder.push(Fragment::DebugLog);
        }
        if options.serial_shell {
            builder.push(Fragment::SerialDebug);
        }

        builder
    }

    /// Append a fragment
    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    /// Fragments in command line order
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Consume the builder, producing the command line
    pub fn build(self) -> String {
        let len = self.fragments.iter().map(|f| f.text().len()).sum();
        let mut line = String::with_capacity(len);
        for fragment in &self.fragments {
            line.push_str(fragment.text());
        }
        line
    }
}
