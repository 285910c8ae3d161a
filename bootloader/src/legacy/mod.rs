//! Legacy IDE devices, used when the firmware exposes no Block I/O for them

pub mod ata;
pub mod atapi;
pub mod ide;

use alloc::vec::Vec;
use ide::{Channel, Drive, DriveKind};

/// A legacy device found on the IDE channels
pub enum LegacyDevice {
    Ata(ata::AtaDisk),
    Atapi(atapi::AtapiDrive),
}

/// Detect drives on both channels; optical drives first
pub fn detect() -> Vec<LegacyDevice> {
    let mut optical = Vec::new();
    let mut disks = Vec::new();

    for io_base in [ide::PRIMARY_IO, ide::SECONDARY_IO] {
        let channel = Channel::new(io_base);
        for drive in [Drive::Master, Drive::Slave] {
            let mut words = [0u16; 256];
            match channel.identify(drive, &mut words) {
                Some(DriveKind::Atapi) => {
                    optical.push(LegacyDevice::Atapi(atapi::AtapiDrive::new(channel, drive)))
                }
                Some(DriveKind::Ata) => disks.push(LegacyDevice::Ata(ata::AtaDisk::from_identify(
                    channel, drive, &words,
                ))),
                None => {}
            }
        }
    }

    keel_core::log_debug!(
        "IDE: {} optical, {} disk device(s)",
        optical.len(),
        disks.len()
    );
    optical.extend(disks);
    optical
}
