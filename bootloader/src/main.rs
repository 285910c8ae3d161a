//! Keel UEFI boot loader
//!
//! Finds an ISO9660 boot volume, loads the 32-bit kernel and its driver
//! modules and enters the kernel through Multiboot. UEFI is used for:
//! 1. Memory (heap, placement pages, the memory map)
//! 2. Console output until the handoff
//! 3. GOP framebuffer info
//! 4. Block I/O, with the legacy IDE controllers as a fallback
//! 5. ExitBootServices

#![no_std]
#![no_main]

extern crate alloc;

use core::panic::PanicInfo;

mod boot;
mod heap;
mod legacy;
mod uefi;

use boot::firmware::UefiFirmware;
use boot::trampoline::Trampoline;
use boot::{BootContext, BootFailure};
use keel_core::{BootConfiguration, BootMode, BootOptions, LoaderSettings, PlatformInfo};
use uefi::memory::{FirmwareMap, UefiPhysicalMemory};
use uefi::SystemTable;

const EFI_ERROR_BIT: usize = 1usize << (usize::BITS - 1);
const EFI_LOAD_ERROR: usize = EFI_ERROR_BIT | 1;
const EFI_NOT_FOUND: usize = EFI_ERROR_BIT | 14;

/// Seconds the failure message stays up before returning to the firmware
const FAILURE_DELAY_SECS: usize = 5;

#[no_mangle]
pub extern "efiapi" fn efi_main(image_handle: *mut (), system_table: *const ()) -> usize {
    // SAFETY: the firmware passes a valid system table
    let st = unsafe { &*(system_table as *const SystemTable) };
    // SAFETY: boot services stay valid until ExitBootServices
    let bs = unsafe { &*st.boot_services };

    let _ = (bs.set_watchdog_timer)(0, 0, 0, core::ptr::null());

    let heap = match heap::init(bs) {
        Ok(heap) => heap,
        Err(status) => return status,
    };
    uefi::console::install(st.con_out);
    keel_core::log_info!("keelboot {}", env!("CARGO_PKG_VERSION"));

    // Pages the loader keeps must be claimed before the map snapshot
    let trampoline = match Trampoline::install(bs) {
        Ok(trampoline) => trampoline,
        Err(status) => {
            keel_core::log_error!("No low page for the trampoline: {:#x}", status);
            return status;
        }
    };
    let mut map = FirmwareMap::new();
    if let Err(status) = map.snapshot(bs) {
        keel_core::log_error!("GetMemoryMap failed: {:#x}", status);
        return status;
    }

    let settings = LoaderSettings::default();
    let config = BootConfiguration::resolve(&BootOptions::default(), BootMode::Graphical, &settings);

    let platform = PlatformInfo {
        memory_map: map.to_memory_map(),
        framebuffer: uefi::gop::framebuffer(bs),
        loader_buffers: alloc::vec![heap, map.buffer(), trampoline.page()],
    };
    let (lower, upper) = platform.memory_map.lower_upper_kib();
    keel_core::log_info!(
        "Memory: {} KiB lower, {} KiB upper, {} regions",
        lower,
        upper,
        platform.memory_map.len()
    );

    let mut devices = uefi::disk::enumerate(bs);
    let mut memory = UefiPhysicalMemory::new(bs);
    let firmware = UefiFirmware::new(bs, image_handle, &mut map, trampoline);

    let mut ctx = BootContext {
        config: &config,
        settings: &settings,
        platform: &platform,
        memory: &mut memory,
    };
    let failure = boot::boot(&mut ctx, &mut devices, firmware);

    keel_core::log_error!("{}", failure);
    uefi::console::println("Boot failed; returning to firmware");
    let _ = (bs.stall)(FAILURE_DELAY_SECS * 1_000_000);

    match failure {
        BootFailure::NoBootableDevice => EFI_NOT_FOUND,
        BootFailure::Boot(_) => EFI_LOAD_ERROR,
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    keel_core::log_error!("panic: {}", info);
    loop {
        x86_64::instructions::interrupts::disable();
        x86_64::instructions::hlt();
    }
}
