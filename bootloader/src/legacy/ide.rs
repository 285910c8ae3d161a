//! Legacy IDE channel registers (PIO only)

use blockio::TransportFault;
use x86_64::instructions::port::Port;

pub const PRIMARY_IO: u16 = 0x1F0;
pub const SECONDARY_IO: u16 = 0x170;

const REG_DATA: u16 = 0;
const REG_ERROR: u16 = 1;
const REG_FEATURES: u16 = 1;
const REG_SECCOUNT: u16 = 2;
const REG_LBA_LOW: u16 = 3;
const REG_LBA_MID: u16 = 4;
const REG_LBA_HIGH: u16 = 5;
const REG_DEVICE: u16 = 6;
const REG_STATUS: u16 = 7;
const REG_COMMAND: u16 = 7;

pub const SR_BSY: u8 = 0x80;
pub const SR_DRQ: u8 = 0x08;
pub const SR_ERR: u8 = 0x01;

const CMD_IDENTIFY: u8 = 0xEC;
const CMD_IDENTIFY_PACKET: u8 = 0xA1;

const DEVICE_LBA: u8 = 0x40;

/// Polls allowed while waiting on BSY/DRQ
pub const WAIT_LIMIT: u32 = 1_000_000;

/// Master or slave on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    Master,
    Slave,
}

impl Drive {
    fn select_bits(self) -> u8 {
        match self {
            Drive::Master => 0xA0,
            Drive::Slave => 0xB0,
        }
    }
}

/// What answered on a channel position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveKind {
    Ata,
    Atapi,
}

/// One IDE channel
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    io_base: u16,
    control_base: u16,
}

impl Channel {
    pub const fn new(io_base: u16) -> Self {
        Self {
            io_base,
            control_base: io_base + 0x206,
        }
    }

    fn read8(&self, reg: u16) -> u8 {
        // SAFETY: legacy IDE ports, no memory side effects
        unsafe { Port::<u8>::new(self.io_base + reg).read() }
    }

    fn write8(&self, reg: u16, value: u8) {
        // SAFETY: legacy IDE ports
        unsafe { Port::<u8>::new(self.io_base + reg).write(value) }
    }

    pub fn read_data(&self) -> u16 {
        // SAFETY: legacy IDE data port
        unsafe { Port::<u16>::new(self.io_base + REG_DATA).read() }
    }

    pub fn write_data(&self, value: u16) {
        // SAFETY: legacy IDE data port
        unsafe { Port::<u16>::new(self.io_base + REG_DATA).write(value) }
    }

    pub fn status(&self) -> u8 {
        self.read8(REG_STATUS)
    }

    /// Alternate status, reading it does not clear a pending interrupt
    fn alt_status(&self) -> u8 {
        // SAFETY: legacy IDE control block
        unsafe { Port::<u8>::new(self.control_base).read() }
    }

    pub fn error(&self) -> u8 {
        self.read8(REG_ERROR)
    }

    /// Data phase byte count of an ATAPI transfer
    pub fn byte_count(&self) -> usize {
        self.read8(REG_LBA_MID) as usize | (self.read8(REG_LBA_HIGH) as usize) << 8
    }

    /// ~400ns settle delay
    pub fn delay(&self) {
        for _ in 0..4 {
            self.alt_status();
        }
    }

    pub fn select(&self, drive: Drive, lba_high: u8) {
        self.write8(REG_DEVICE, drive.select_bits() | DEVICE_LBA | (lba_high & 0x0F));
        self.delay();
    }

    /// Wait for BSY to clear; returns the final status
    pub fn wait_idle(&self) -> Result<u8, TransportFault> {
        for _ in 0..WAIT_LIMIT {
            let status = self.status();
            if status & SR_BSY == 0 {
                return Ok(status);
            }
            core::hint::spin_loop();
        }
        Err(TransportFault::Timeout)
    }

    /// Wait until the device offers data
    pub fn wait_drq(&self) -> Result<(), TransportFault> {
        for _ in 0..WAIT_LIMIT {
            let status = self.status();
            if status & SR_BSY != 0 {
                core::hint::spin_loop();
                continue;
            }
            if status & SR_ERR != 0 {
                return Err(TransportFault::Device {
                    status,
                    error: self.error(),
                });
            }
            if status & SR_DRQ != 0 {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(TransportFault::Timeout)
    }

    /// Program the task file for an LBA28 command
    pub fn task_lba28(&self, lba: u64, count: u8) {
        self.write8(REG_FEATURES, 0);
        self.write8(REG_SECCOUNT, count);
        self.write8(REG_LBA_LOW, lba as u8);
        self.write8(REG_LBA_MID, (lba >> 8) as u8);
        self.write8(REG_LBA_HIGH, (lba >> 16) as u8);
    }

    /// Program the task file for an LBA48 command (high bytes first)
    pub fn task_lba48(&self, lba: u64, count: u16) {
        self.write8(REG_SECCOUNT, (count >> 8) as u8);
        self.write8(REG_LBA_LOW, (lba >> 24) as u8);
        self.write8(REG_LBA_MID, (lba >> 32) as u8);
        self.write8(REG_LBA_HIGH, (lba >> 40) as u8);
        self.write8(REG_SECCOUNT, count as u8);
        self.write8(REG_LBA_LOW, lba as u8);
        self.write8(REG_LBA_MID, (lba >> 8) as u8);
        self.write8(REG_LBA_HIGH, (lba >> 16) as u8);
    }

    /// Set up the ATAPI PACKET byte count limit
    pub fn task_packet(&self, byte_limit: u16) {
        self.write8(REG_FEATURES, 0);
        self.write8(REG_LBA_MID, byte_limit as u8);
        self.write8(REG_LBA_HIGH, (byte_limit >> 8) as u8);
    }

    pub fn command(&self, command: u8) {
        self.write8(REG_COMMAND, command);
    }

    /// Read one 512-byte data block
    pub fn read_block(&self, dst: &mut [u8]) {
        for word in dst.chunks_exact_mut(2) {
            word.copy_from_slice(&self.read_data().to_le_bytes());
        }
    }

    /// Send IDENTIFY to `drive` and classify the answer
    ///
    /// Fills `words` with the identify data on success.
    pub fn identify(&self, drive: Drive, words: &mut [u16; 256]) -> Option<DriveKind> {
        self.select(drive, 0);
        self.task_lba28(0, 0);
        self.command(CMD_IDENTIFY);

        // Floating bus or empty position
        let status = self.status();
        if status == 0 || status == 0xFF {
            return None;
        }
        self.wait_idle().ok()?;

        // Packet devices abort IDENTIFY and leave their signature behind
        let kind = match (self.read8(REG_LBA_MID), self.read8(REG_LBA_HIGH)) {
            (0x00, 0x00) => DriveKind::Ata,
            (0x14, 0xEB) => {
                self.command(CMD_IDENTIFY_PACKET);
                DriveKind::Atapi
            }
            _ => return None,
        };

        self.wait_drq().ok()?;
        for word in words.iter_mut() {
            *word = self.read_data();
        }
        Some(kind)
    }
}
