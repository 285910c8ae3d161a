//! Boot device loop
//!
//! Every candidate device gets a fresh pipeline run. A device without an
//! ISO9660 volume or without a kernel is skipped; any other failure ends
//! the search and is reported to the caller.

pub mod firmware;
pub mod trampoline;

use crate::legacy::{self, LegacyDevice};
use crate::uefi::block_io::UefiBlockIo;
use blockio::{BlockDevice, Geometry, RetryPolicy, Transport};
use core::fmt;
use firmware::UefiFirmware;
use keel_core::bootinfo::{self, PreparedHandoff};
use keel_core::memory::PhysicalMemory;
use keel_core::{BootConfiguration, BootError, LoaderSettings, PlatformInfo};

/// Why no kernel was started
#[derive(Debug)]
pub enum BootFailure {
    /// No device holds a bootable volume
    NoBootableDevice,
    Boot(BootError),
}

impl fmt::Display for BootFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBootableDevice => write!(f, "No bootable device found"),
            Self::Boot(e) => write!(f, "{}", e),
        }
    }
}

/// Everything a pipeline run needs besides the device
pub struct BootContext<'a, M: PhysicalMemory> {
    pub config: &'a BootConfiguration,
    pub settings: &'a LoaderSettings,
    pub platform: &'a PlatformInfo,
    pub memory: &'a mut M,
}

enum Attempt {
    Skip,
    Fatal(BootError),
}

/// Try the firmware devices, then the legacy IDE devices
///
/// Only returns when no kernel could be started.
pub fn boot<M: PhysicalMemory>(
    ctx: &mut BootContext<'_, M>,
    firmware_devices: &mut [UefiBlockIo],
    mut firmware: UefiFirmware<'_>,
) -> BootFailure {
    for (index, device) in firmware_devices.iter_mut().enumerate() {
        let Some(geometry) = device.geometry() else {
            continue;
        };
        keel_core::log_info!(
            "Trying firmware device {} ({} x {} bytes)",
            index,
            geometry.total_sectors(),
            geometry.sector_size()
        );

        match attempt(ctx, geometry, Transport::Direct(device), &mut firmware) {
            Ok(handoff) => bootinfo::commit(handoff, firmware),
            Err(Attempt::Skip) => {}
            Err(Attempt::Fatal(e)) => return BootFailure::Boot(e),
        }
    }

    for device in legacy::detect() {
        let outcome = match device {
            LegacyDevice::Atapi(mut drive) => {
                let geometry = match drive.media_geometry(ctx.settings.poll_limit) {
                    Ok(geometry) => geometry,
                    Err(fault) => {
                        keel_core::log_debug!("ATAPI drive not ready: {}", fault);
                        continue;
                    }
                };
                keel_core::log_info!("Trying IDE optical drive");
                let transport = Transport::Packet {
                    device: &mut drive,
                    poll_limit: ctx.settings.poll_limit,
                };
                attempt(ctx, geometry, transport, &mut firmware)
            }
            LegacyDevice::Ata(mut disk) => {
                let Some(geometry) = disk.geometry() else {
                    continue;
                };
                keel_core::log_info!("Trying IDE disk ({} sectors)", geometry.total_sectors());
                attempt(ctx, geometry, Transport::Direct(&mut disk), &mut firmware)
            }
        };

        match outcome {
            Ok(handoff) => bootinfo::commit(handoff, firmware),
            Err(Attempt::Skip) => {}
            Err(Attempt::Fatal(e)) => return BootFailure::Boot(e),
        }
    }

    BootFailure::NoBootableDevice
}

/// Run the pipeline on one device
fn attempt<M: PhysicalMemory>(
    ctx: &mut BootContext<'_, M>,
    geometry: Geometry,
    transport: Transport<'_>,
    firmware: &mut UefiFirmware<'_>,
) -> Result<PreparedHandoff, Attempt> {
    let mut device = BlockDevice::new(geometry, transport)
        .with_retry(RetryPolicy::new(ctx.settings.retry_attempts));

    match keel_core::assemble(
        &mut device,
        0,
        ctx.config,
        ctx.platform,
        &mut *ctx.memory,
        firmware,
    ) {
        Ok(assembly) => Ok(assembly.handoff),
        Err(e) if e.is_not_bootable() => {
            keel_core::log_info!("Not bootable: {}", e);
            Err(Attempt::Skip)
        }
        Err(e) => {
            keel_core::log_error!("Boot failed: {}", e);
            Err(Attempt::Fatal(e))
        }
    }
}
