//! ATA hard disk, PIO READ SECTORS

use super::ide::{Channel, Drive};
use blockio::{DirectCommand, Geometry, TransportFault};

const CMD_READ_SECTORS: u8 = 0x20;
const CMD_READ_SECTORS_EXT: u8 = 0x24;

const SECTOR_SIZE: usize = 512;
const LBA28_LIMIT: u64 = 1 << 28;

/// Sectors per command; keeps LBA28 counts in one byte
const MAX_TRANSFER: u32 = 128;

pub struct AtaDisk {
    channel: Channel,
    drive: Drive,
    lba48: bool,
    sectors: u64,
}

impl AtaDisk {
    /// Disk described by its IDENTIFY data
    pub fn from_identify(channel: Channel, drive: Drive, words: &[u16; 256]) -> Self {
        let lba48 = words[83] & (1 << 10) != 0;
        let sectors = if lba48 {
            words[100] as u64
                | (words[101] as u64) << 16
                | (words[102] as u64) << 32
                | (words[103] as u64) << 48
        } else {
            words[60] as u64 | (words[61] as u64) << 16
        };
        Self {
            channel,
            drive,
            lba48,
            sectors,
        }
    }

    pub fn geometry(&self) -> Option<Geometry> {
        Geometry::new(SECTOR_SIZE as u32, self.sectors).map(|g| g.with_max_transfer(MAX_TRANSFER))
    }
}

impl DirectCommand for AtaDisk {
    fn read(&mut self, lba: u64, count: u32, dst: &mut [u8]) -> Result<(), TransportFault> {
        let end = lba + count as u64;
        self.channel.wait_idle()?;

        if self.lba48 && end > LBA28_LIMIT {
            self.channel.select(self.drive, 0);
            self.channel.task_lba48(lba, count as u16);
            self.channel.command(CMD_READ_SECTORS_EXT);
        } else {
            self.channel.select(self.drive, (lba >> 24) as u8);
            self.channel.task_lba28(lba, count as u8);
            self.channel.command(CMD_READ_SECTORS);
        }

        for sector in dst.chunks_exact_mut(SECTOR_SIZE).take(count as usize) {
            self.channel.delay();
            self.channel.wait_drq()?;
            self.channel.read_block(sector);
        }

        Ok(())
    }
}
