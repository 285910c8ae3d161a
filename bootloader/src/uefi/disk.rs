// Boot device candidates exposed by the firmware

use super::block_io::{BlockIoProtocol, UefiBlockIo, EFI_BLOCK_IO_PROTOCOL_GUID};
use super::{locate_handles, BootServices, EFI_SUCCESS};
use alloc::vec::Vec;

const CD_SECTOR_SIZE: u32 = 2048;

/// Block I/O instances with media, optical and whole-disk handles first
pub fn enumerate(bs: &BootServices) -> Vec<UefiBlockIo> {
    let handles = match locate_handles(bs, &EFI_BLOCK_IO_PROTOCOL_GUID) {
        Ok(handles) => handles,
        Err(status) => {
            keel_core::log_warn!("LocateHandle(BlockIo) failed: {:#x}", status);
            return Vec::new();
        }
    };

    let mut devices: Vec<UefiBlockIo> = Vec::new();
    for handle in handles {
        let mut protocol: *mut () = core::ptr::null_mut();
        let status = (bs.handle_protocol)(handle, &EFI_BLOCK_IO_PROTOCOL_GUID, &mut protocol);
        if status != EFI_SUCCESS || protocol.is_null() {
            continue;
        }

        // SAFETY: HandleProtocol returned a Block I/O instance
        let device = unsafe { UefiBlockIo::new(protocol as *mut BlockIoProtocol) };
        if !device.media_present() || device.sector_size() > CD_SECTOR_SIZE {
            continue;
        }
        devices.push(device);
    }

    devices.sort_by_key(|d| (d.sector_size() != CD_SECTOR_SIZE, !d.is_whole_disk()));

    keel_core::log_debug!("{} firmware block device(s)", devices.len());
    devices
}
