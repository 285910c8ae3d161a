// Graphics Output Protocol, queried once for the kernel's framebuffer

use super::{BootServices, EFI_SUCCESS};
use keel_core::bootinfo::{Framebuffer, PixelFormat};

/// GOP Protocol GUID: 9042A9DE-23DC-4A38-96FB-7ADED080516A
pub const EFI_GRAPHICS_OUTPUT_PROTOCOL_GUID: [u8; 16] = [
    0xDE, 0xA9, 0x42, 0x90, 0xDC, 0x23, 0x38, 0x4A, 0x96, 0xFB, 0x7A, 0xDE, 0xD0, 0x80, 0x51, 0x6A,
];

/// GOP Pixel Format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GopPixelFormat {
    /// Red-Green-Blue-Reserved 8-bits per color
    Rgbx,
    /// Blue-Green-Red-Reserved 8-bits per color
    Bgrx,
    /// Pixel format defined by pixel bitmask
    BitMask,
    /// No direct framebuffer access
    BltOnly,
}

impl GopPixelFormat {
    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Rgbx),
            1 => Some(Self::Bgrx),
            2 => Some(Self::BitMask),
            3 => Some(Self::BltOnly),
            _ => None,
        }
    }
}

/// GOP Mode Information
#[repr(C)]
pub struct GopModeInfo {
    pub version: u32,
    pub horizontal_resolution: u32,
    pub vertical_resolution: u32,
    pub pixel_format: u32,
    pub pixel_information: [u32; 4], // PixelBitmask (only for BitMask format)
    pub pixels_per_scan_line: u32,
}

/// GOP Mode
#[repr(C)]
pub struct GopMode {
    pub max_mode: u32,
    pub mode: u32,
    pub info: *const GopModeInfo,
    pub size_of_info: usize,
    pub frame_buffer_base: u64,
    pub frame_buffer_size: usize,
}

/// Graphics Output Protocol
#[repr(C)]
pub struct GraphicsOutputProtocol {
    pub query_mode: extern "efiapi" fn(
        this: *mut GraphicsOutputProtocol,
        mode_number: u32,
        size_of_info: *mut usize,
        info: *mut *const GopModeInfo,
    ) -> usize,
    pub set_mode: extern "efiapi" fn(this: *mut GraphicsOutputProtocol, mode_number: u32) -> usize,
    pub blt: usize, // We don't use Blt
    pub mode: *mut GopMode,
}

/// Linear framebuffer of the current GOP mode
///
/// `None` without GOP, for blt-only and bitmask modes.
pub fn framebuffer(bs: &BootServices) -> Option<Framebuffer> {
    let mut gop_ptr: *mut GraphicsOutputProtocol = core::ptr::null_mut();
    let status = (bs.locate_protocol)(
        &EFI_GRAPHICS_OUTPUT_PROTOCOL_GUID,
        core::ptr::null(),
        &mut gop_ptr as *mut _ as *mut *mut (),
    );
    if status != EFI_SUCCESS || gop_ptr.is_null() {
        keel_core::log_debug!("No graphics output");
        return None;
    }

    // SAFETY: the firmware returned a live protocol instance
    let (mode, info) = unsafe {
        let mode = (*gop_ptr).mode;
        if mode.is_null() || (*mode).info.is_null() {
            return None;
        }
        (&*mode, &*(*mode).info)
    };

    let format = match GopPixelFormat::from_raw(info.pixel_format)? {
        GopPixelFormat::Rgbx => PixelFormat::Rgbx,
        GopPixelFormat::Bgrx => PixelFormat::Bgrx,
        other => {
            keel_core::log_debug!("GOP mode {:?} has no linear framebuffer", other);
            return None;
        }
    };

    Some(Framebuffer {
        address: mode.frame_buffer_base,
        pitch: info.pixels_per_scan_line * 4,
        width: info.horizontal_resolution,
        height: info.vertical_resolution,
        format,
    })
}
