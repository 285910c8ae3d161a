//! Transport families
//!
//! A transport moves whole sectors from the device into memory. It knows
//! nothing about ranges, retries or chunking; [`crate::BlockDevice`] does.

pub mod direct;
pub mod packet;

use crate::error::TransportFault;
use crate::geometry::TransportKind;

use direct::DirectCommand;
use packet::{Cdb, PacketCommand};

/// Borrowed transport backing a [`crate::BlockDevice`]
pub enum Transport<'a> {
    /// One command per read
    Direct(&'a mut dyn DirectCommand),

    /// ATAPI-style packet command with completion polling
    Packet {
        /// Device accepting command descriptor blocks
        device: &'a mut dyn PacketCommand,
        /// Polls allowed before a command is declared timed out
        poll_limit: u32,
    },
}

impl<'a> Transport<'a> {
    /// Packet transport with the default poll budget
    pub fn packet(device: &'a mut dyn PacketCommand) -> Self {
        Self::Packet {
            device,
            poll_limit: packet::DEFAULT_POLL_LIMIT,
        }
    }

    /// Which family this transport belongs to
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Direct(_) => TransportKind::Direct,
            Self::Packet { .. } => TransportKind::Packet,
        }
    }

    /// Perform one transfer of `count` sectors starting at `lba`
    ///
    /// `dst` is exactly `count * sector_size` bytes.
    pub(crate) fn transfer(
        &mut self,
        lba: u64,
        count: u32,
        dst: &mut [u8],
    ) -> Result<(), TransportFault> {
        match self {
            Self::Direct(device) => device.read(lba, count, dst),
            Self::Packet { device, poll_limit } => {
                let cdb = Cdb::read(lba, count);
                packet::execute(&mut **device, &cdb, dst, *poll_limit)
            }
        }
    }
}
