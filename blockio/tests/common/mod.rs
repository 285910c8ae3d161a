//! Simulated devices for block layer tests

#![allow(dead_code)]

use blockio::{Cdb, DirectCommand, PacketCommand, PacketPhase, TransportFault};

/// Disk image with sector `n` filled with byte `n as u8`
pub fn patterned_image(sector_size: usize, sectors: usize) -> Vec<u8> {
    let mut data = vec![0u8; sector_size * sectors];
    for (index, sector) in data.chunks_mut(sector_size).enumerate() {
        sector.fill(index as u8);
    }
    data
}

/// In-memory disk answering direct read commands
pub struct MemoryDisk {
    pub data: Vec<u8>,
    pub sector_size: usize,
    /// Every `(lba, count)` command received
    pub commands: Vec<(u64, u32)>,
    /// Fail this many commands before succeeding
    pub failures_left: u32,
}

impl MemoryDisk {
    pub fn new(data: Vec<u8>, sector_size: usize) -> Self {
        Self {
            data,
            sector_size,
            commands: Vec::new(),
            failures_left: 0,
        }
    }

    pub fn failing(mut self, failures: u32) -> Self {
        self.failures_left = failures;
        self
    }
}

impl DirectCommand for MemoryDisk {
    fn read(&mut self, lba: u64, count: u32, dst: &mut [u8]) -> Result<(), TransportFault> {
        self.commands.push((lba, count));

        if self.failures_left > 0 {
            self.failures_left -= 1;
            // Scribble to show a failed attempt may leave garbage behind
            dst.fill(0xEE);
            return Err(TransportFault::Device {
                status: 0x51,
                error: 0x04,
            });
        }

        let start = lba as usize * self.sector_size;
        let len = count as usize * self.sector_size;
        assert_eq!(dst.len(), len, "transport handed a mis-sized buffer");
        dst.copy_from_slice(&self.data[start..start + len]);
        Ok(())
    }
}

/// ATAPI drive that hands data over in fixed-size phases
pub struct SimulatedAtapi {
    pub data: Vec<u8>,
    /// Busy polls before each data phase
    pub busy_polls: u32,
    /// Never finish (for timeout tests)
    pub stuck: bool,
    /// Keep announcing a drained data phase until told to settle
    pub stale_drq: bool,
    pub packets: Vec<Cdb>,
    pub settles: usize,

    pending: Vec<u8>,
    cursor: usize,
    phase_len: usize,
    busy_left: u32,
    unsettled: Option<usize>,
}

impl SimulatedAtapi {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            busy_polls: 2,
            stuck: false,
            stale_drq: false,
            packets: Vec::new(),
            settles: 0,
            pending: Vec::new(),
            cursor: 0,
            phase_len: 0,
            busy_left: 0,
            unsettled: None,
        }
    }
}

impl PacketCommand for SimulatedAtapi {
    fn send_packet(&mut self, cdb: &Cdb, byte_limit: u16) -> Result<(), TransportFault> {
        self.packets.push(*cdb);
        let lba = cdb.lba().ok_or(TransportFault::Protocol)? as usize;
        let count = cdb.block_count().ok_or(TransportFault::Protocol)? as usize;

        let start = lba * 2048;
        let end = start + count * 2048;
        if end > self.data.len() {
            return Err(TransportFault::Device {
                status: 0x41,
                error: 0x50,
            });
        }

        self.pending = self.data[start..end].to_vec();
        self.cursor = 0;
        self.phase_len = byte_limit as usize;
        self.busy_left = self.busy_polls;
        Ok(())
    }

    fn poll(&mut self) -> PacketPhase {
        if let Some(stale) = self.unsettled {
            return PacketPhase::DataIn(stale);
        }
        if self.stuck {
            return PacketPhase::Busy;
        }
        if self.busy_left > 0 {
            self.busy_left -= 1;
            return PacketPhase::Busy;
        }
        if self.cursor == self.pending.len() {
            return PacketPhase::Complete;
        }
        self.busy_left = self.busy_polls;
        PacketPhase::DataIn(self.phase_len.min(self.pending.len() - self.cursor))
    }

    fn read_data(&mut self, dst: &mut [u8]) -> Result<(), TransportFault> {
        let end = self.cursor + dst.len();
        dst.copy_from_slice(&self.pending[self.cursor..end]);
        self.cursor = end;
        if self.stale_drq {
            self.unsettled = Some(dst.len());
        }
        Ok(())
    }

    fn settle(&mut self) {
        self.settles += 1;
        self.unsettled = None;
    }
}
