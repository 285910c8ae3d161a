//! Packet transport: SCSI command blocks over ATAPI
//!
//! A read is submitted as a command descriptor block (CDB). The device then
//! alternates between busy and data-ready phases; each data-ready phase
//! announces how many bytes it will hand over. The engine in [`execute`]
//! drains those phases into the destination until the device reports
//! completion.

use crate::error::TransportFault;

/// Polls allowed without progress before a command times out
pub const DEFAULT_POLL_LIMIT: u32 = 1_000_000;

/// Largest byte count programmed into the ATAPI byte-count registers
///
/// A multiple of 2048 so a data phase never splits a CD sector.
pub const MAX_BYTE_COUNT: u16 = 0xF800;

/// SCSI opcodes
pub mod opcode {
    /// READ CAPACITY(10)
    pub const READ_CAPACITY_10: u8 = 0x25;
    /// READ(12)
    pub const READ_12: u8 = 0xA8;
    /// READ(16)
    pub const READ_16: u8 = 0x88;
    /// TEST UNIT READY
    pub const TEST_UNIT_READY: u8 = 0x00;
}

/// Command descriptor block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cdb {
    bytes: [u8; 16],
    len: usize,
}

impl Cdb {
    /// READ(12) for `count` blocks at a 32-bit LBA
    pub fn read12(lba: u32, count: u32) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0] = opcode::READ_12;
        bytes[2..6].copy_from_slice(&lba.to_be_bytes());
        bytes[6..10].copy_from_slice(&count.to_be_bytes());
        Self { bytes, len: 12 }
    }

    /// READ(16) for `count` blocks at a 64-bit LBA
    pub fn read16(lba: u64, count: u32) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0] = opcode::READ_16;
        bytes[2..10].copy_from_slice(&lba.to_be_bytes());
        bytes[10..14].copy_from_slice(&count.to_be_bytes());
        Self { bytes, len: 16 }
    }

    /// Pick READ(12) when the whole run fits in 32-bit LBAs, READ(16) otherwise
    pub fn read(lba: u64, count: u32) -> Self {
        let last = lba.saturating_add(count as u64);
        match u32::try_from(lba) {
            Ok(short) if last <= u32::MAX as u64 => Self::read12(short, count),
            _ => Self::read16(lba, count),
        }
    }

    /// READ CAPACITY(10), padded to the 12-byte ATAPI packet
    pub fn read_capacity10() -> Self {
        let mut bytes = [0u8; 16];
        bytes[0] = opcode::READ_CAPACITY_10;
        Self { bytes, len: 12 }
    }

    /// TEST UNIT READY
    pub fn test_unit_ready() -> Self {
        Self {
            bytes: [0u8; 16],
            len: 12,
        }
    }

    /// Opcode byte
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    /// Raw packet bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Logical block address carried by a READ command
    pub fn lba(&self) -> Option<u64> {
        match self.bytes[0] {
            opcode::READ_12 => Some(read_be32(&self.bytes[2..6]) as u64),
            opcode::READ_16 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&self.bytes[2..10]);
                Some(u64::from_be_bytes(raw))
            }
            _ => None,
        }
    }

    /// Block count carried by a READ command
    pub fn block_count(&self) -> Option<u32> {
        match self.bytes[0] {
            opcode::READ_12 => Some(read_be32(&self.bytes[6..10])),
            opcode::READ_16 => Some(read_be32(&self.bytes[10..14])),
            _ => None,
        }
    }
}

fn read_be32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode READ CAPACITY(10) data into `(total_blocks, block_length)`
pub fn parse_capacity(data: &[u8; 8]) -> (u64, u32) {
    let last_lba = read_be32(&data[0..4]);
    let block_len = read_be32(&data[4..8]);
    (last_lba as u64 + 1, block_len)
}

/// Where a packet device currently is in its command cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketPhase {
    /// Still working, poll again
    Busy,
    /// Ready to hand over this many bytes
    DataIn(usize),
    /// Command finished successfully
    Complete,
    /// Command finished with an error
    Failed(TransportFault),
}

/// Device that accepts command descriptor blocks
pub trait PacketCommand {
    /// Submit `cdb`; the device delivers at most `byte_limit` bytes per data phase
    fn send_packet(&mut self, cdb: &Cdb, byte_limit: u16) -> Result<(), TransportFault>;

    /// Sample the device state once
    fn poll(&mut self) -> PacketPhase;

    /// Drain the data phase announced by the last [`PacketPhase::DataIn`]
    ///
    /// `dst.len()` equals the announced byte count.
    fn read_data(&mut self, dst: &mut [u8]) -> Result<(), TransportFault>;

    /// Wait until the status reflects the last transfer
    ///
    /// Called after the packet is sent and after every data phase. IDE
    /// devices need 400 ns before status is valid again.
    fn settle(&mut self) {}
}

/// Run one packet command to completion, filling `dst`
///
/// Fails with `Timeout` when `poll_limit` consecutive polls see no progress and
/// with `Protocol` when the device hands over more or fewer bytes than `dst`
/// holds.
pub fn execute(
    device: &mut dyn PacketCommand,
    cdb: &Cdb,
    dst: &mut [u8],
    poll_limit: u32,
) -> Result<(), TransportFault> {
    let byte_limit = dst.len().min(MAX_BYTE_COUNT as usize) as u16;
    device.send_packet(cdb, byte_limit)?;
    device.settle();

    let mut filled = 0usize;
    let mut idle_polls = 0u32;

    loop {
        match device.poll() {
            PacketPhase::Busy => {
                idle_polls += 1;
                if idle_polls >= poll_limit {
                    return Err(TransportFault::Timeout);
                }
                core::hint::spin_loop();
            }
            PacketPhase::DataIn(bytes) => {
                let end = filled.checked_add(bytes).ok_or(TransportFault::Protocol)?;
                if bytes == 0 || end > dst.len() {
                    return Err(TransportFault::Protocol);
                }
                device.read_data(&mut dst[filled..end])?;
                device.settle();
                filled = end;
                idle_polls = 0;
            }
            PacketPhase::Complete => {
                return if filled == dst.len() {
                    Ok(())
                } else {
                    Err(TransportFault::Protocol)
                };
            }
            PacketPhase::Failed(fault) => return Err(fault),
        }
    }
}
