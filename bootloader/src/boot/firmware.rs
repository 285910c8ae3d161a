// UEFI side of the handoff

use super::trampoline::Trampoline;
use crate::uefi::memory::FirmwareMap;
use crate::uefi::{BootServices, EFI_SUCCESS};
use keel_core::bootinfo::{Firmware, HandoffError};

pub struct UefiFirmware<'a> {
    bs: &'a BootServices,
    image_handle: *mut (),
    map: &'a mut FirmwareMap,
    trampoline: Trampoline,
}

impl<'a> UefiFirmware<'a> {
    pub fn new(
        bs: &'a BootServices,
        image_handle: *mut (),
        map: &'a mut FirmwareMap,
        trampoline: Trampoline,
    ) -> Self {
        Self {
            bs,
            image_handle,
            map,
            trampoline,
        }
    }

    fn refresh_key(&mut self) -> Result<(), HandoffError> {
        self.map.snapshot(self.bs).map_err(HandoffError::Firmware)
    }
}

impl Firmware for UefiFirmware<'_> {
    fn ready_exit(&mut self) -> Result<(), HandoffError> {
        self.refresh_key()
    }

    fn exit_boot_services(&mut self) -> Result<(), HandoffError> {
        let status = (self.bs.exit_boot_services)(self.image_handle, self.map.map_key);
        if status == EFI_SUCCESS {
            return Ok(());
        }

        // Stale key: the map changed since the last snapshot
        self.refresh_key()?;
        match (self.bs.exit_boot_services)(self.image_handle, self.map.map_key) {
            EFI_SUCCESS => Ok(()),
            status => Err(HandoffError::Firmware(status)),
        }
    }

    fn enter_kernel(self, entry: u32, magic: u32, info: u32) -> ! {
        // SAFETY: only reached after exit_boot_services succeeded, with the
        // boot information written at `info`
        unsafe { self.trampoline.enter(entry, magic, info) }
    }

    fn halt(self) -> ! {
        loop {
            x86_64::instructions::interrupts::disable();
            x86_64::instructions::hlt();
        }
    }
}
