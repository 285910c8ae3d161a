//! ATAPI optical drive, PIO PACKET command

use super::ide::{Channel, Drive, SR_BSY, SR_DRQ, SR_ERR};
use blockio::transport::packet::{self, parse_capacity};
use blockio::{Cdb, Geometry, PacketCommand, PacketPhase, TransportFault};

const CMD_PACKET: u8 = 0xA0;
const PACKET_LEN: usize = 12;

pub struct AtapiDrive {
    channel: Channel,
    drive: Drive,
}

impl AtapiDrive {
    pub fn new(channel: Channel, drive: Drive) -> Self {
        Self { channel, drive }
    }

    /// Media geometry via READ CAPACITY(10)
    pub fn media_geometry(&mut self, poll_limit: u32) -> Result<Geometry, TransportFault> {
        packet::execute(self, &Cdb::test_unit_ready(), &mut [], poll_limit)?;

        let mut data = [0u8; 8];
        packet::execute(self, &Cdb::read_capacity10(), &mut data, poll_limit)?;
        let (blocks, block_len) = parse_capacity(&data);
        Geometry::new(block_len, blocks).ok_or(TransportFault::Protocol)
    }
}

impl PacketCommand for AtapiDrive {
    fn send_packet(&mut self, cdb: &Cdb, byte_limit: u16) -> Result<(), TransportFault> {
        let bytes = cdb.as_bytes();
        if bytes.len() > PACKET_LEN {
            return Err(TransportFault::Protocol);
        }
        let mut packet = [0u8; PACKET_LEN];
        packet[..bytes.len()].copy_from_slice(bytes);

        self.channel.wait_idle()?;
        self.channel.select(self.drive, 0);
        self.channel.task_packet(byte_limit);
        self.channel.command(CMD_PACKET);
        self.channel.delay();
        self.channel.wait_drq()?;

        for word in packet.chunks_exact(2) {
            self.channel.write_data(u16::from_le_bytes([word[0], word[1]]));
        }
        Ok(())
    }

    fn poll(&mut self) -> PacketPhase {
        let status = self.channel.status();
        if status & SR_BSY != 0 {
            PacketPhase::Busy
        } else if status & SR_ERR != 0 {
            PacketPhase::Failed(TransportFault::Device {
                status,
                error: self.channel.error(),
            })
        } else if status & SR_DRQ != 0 {
            PacketPhase::DataIn(self.channel.byte_count())
        } else {
            PacketPhase::Complete
        }
    }

    fn read_data(&mut self, dst: &mut [u8]) -> Result<(), TransportFault> {
        if dst.len() % 2 != 0 {
            return Err(TransportFault::Protocol);
        }
        self.channel.read_block(dst);
        Ok(())
    }

    fn settle(&mut self) {
        self.channel.delay();
    }
}
