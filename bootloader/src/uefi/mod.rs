//! UEFI tables and protocols
//!
//! Only the entries the loader calls are typed; the rest are placeholders
//! that keep the layout.

pub mod block_io;
pub mod console;
pub mod disk;
pub mod gop;
pub mod memory;

/// `EFI_SUCCESS`
pub const EFI_SUCCESS: usize = 0;
/// `EFI_BUFFER_TOO_SMALL`
pub const EFI_BUFFER_TOO_SMALL: usize = (1 << (usize::BITS - 1)) | 5;
/// `EFI_INVALID_PARAMETER`
pub const EFI_INVALID_PARAMETER: usize = (1 << (usize::BITS - 1)) | 2;

/// `LocateHandle` search type
pub const BY_PROTOCOL: usize = 2;

/// `AllocatePages` types
pub const ALLOCATE_ANY_PAGES: usize = 0;
pub const ALLOCATE_ADDRESS: usize = 2;

/// `EfiLoaderCode`
pub const LOADER_CODE: usize = 1;
/// `EfiLoaderData`
pub const LOADER_DATA: usize = 2;

pub const PAGE_SIZE: usize = 4096;

#[repr(C)]
pub struct SimpleTextOutputMode {
    max_mode: i32,
    mode: i32,
    attribute: i32,
    cursor_column: i32,
    cursor_row: i32,
    cursor_visible: bool,
}

#[repr(C)]
pub struct SimpleTextOutputProtocol {
    pub reset: extern "efiapi" fn(*mut SimpleTextOutputProtocol, bool) -> usize,
    pub output_string: extern "efiapi" fn(*mut SimpleTextOutputProtocol, *const u16) -> usize,
    test_string: usize,
    query_mode: usize,
    set_mode: usize,
    set_attribute: usize,
    pub clear_screen: extern "efiapi" fn(*mut SimpleTextOutputProtocol) -> usize,
    set_cursor_position: usize,
    enable_cursor: usize,
    mode: *const SimpleTextOutputMode,
}

#[repr(C)]
pub struct SystemTable {
    _header: [u8; 24],
    _firmware_vendor: *const u16,
    _firmware_revision: u32,
    _console_in_handle: *const (),
    _con_in: *const (),
    _console_out_handle: *const (),
    pub con_out: *mut SimpleTextOutputProtocol,
    _stderr_handle: *const (),
    _stderr: *const (),
    _runtime_services: *const (),
    pub boot_services: *const BootServices,
    _number_of_table_entries: usize,
    _configuration_table: *const (),
}

#[repr(C)]
pub struct BootServices {
    _header: [u8; 24],
    // Task Priority Services
    _raise_tpl: usize,
    _restore_tpl: usize,
    // Memory Services
    pub allocate_pages: extern "efiapi" fn(
        allocate_type: usize,
        memory_type: usize,
        pages: usize,
        memory: *mut u64,
    ) -> usize,
    pub free_pages: extern "efiapi" fn(memory: u64, pages: usize) -> usize,
    pub get_memory_map: extern "efiapi" fn(
        memory_map_size: *mut usize,
        memory_map: *mut u8,
        map_key: *mut usize,
        descriptor_size: *mut usize,
        descriptor_version: *mut u32,
    ) -> usize,
    pub allocate_pool:
        extern "efiapi" fn(pool_type: usize, size: usize, buffer: *mut *mut u8) -> usize,
    pub free_pool: extern "efiapi" fn(buffer: *mut u8) -> usize,
    // Event & Timer Services
    _create_event: usize,
    _set_timer: usize,
    _wait_for_event: usize,
    _signal_event: usize,
    _close_event: usize,
    _check_event: usize,
    // Protocol Handler Services
    _install_protocol_interface: usize,
    _reinstall_protocol_interface: usize,
    _uninstall_protocol_interface: usize,
    pub handle_protocol: extern "efiapi" fn(
        handle: *mut (),
        protocol: *const [u8; 16],
        interface: *mut *mut (),
    ) -> usize,
    _reserved: usize,
    _register_protocol_notify: usize,
    pub locate_handle: extern "efiapi" fn(
        search_type: usize,
        protocol: *const [u8; 16],
        search_key: *const (),
        buffer_size: *mut usize,
        buffer: *mut *mut (),
    ) -> usize,
    _locate_device_path: usize,
    _install_configuration_table: usize,
    // Image Services
    _load_image: usize,
    _start_image: usize,
    _exit: usize,
    _unload_image: usize,
    pub exit_boot_services: extern "efiapi" fn(image_handle: *mut (), map_key: usize) -> usize,
    // Miscellaneous Services
    _get_next_monotonic_count: usize,
    pub stall: extern "efiapi" fn(microseconds: usize) -> usize,
    /// Timeout in seconds, 0 disables
    pub set_watchdog_timer: extern "efiapi" fn(
        timeout: usize,
        watchdog_code: u64,
        data_size: usize,
        watchdog_data: *const u16,
    ) -> usize,
    // Driver Support Services
    _connect_controller: usize,
    _disconnect_controller: usize,
    // Open/Close Protocol Services
    _open_protocol: usize,
    _close_protocol: usize,
    _open_protocol_information: usize,
    // Library Services
    _protocols_per_handle: usize,
    _locate_handle_buffer: usize,
    pub locate_protocol: extern "efiapi" fn(
        protocol: *const [u8; 16],
        registration: *const (),
        interface: *mut *mut (),
    ) -> usize,
    _install_multiple_protocol_interfaces: usize,
    _uninstall_multiple_protocol_interfaces: usize,
}

/// Every handle supporting `protocol`
pub fn locate_handles(
    bs: &BootServices,
    protocol: &[u8; 16],
) -> Result<alloc::vec::Vec<*mut ()>, usize> {
    let mut buffer_size: usize = 0;
    let _ = (bs.locate_handle)(
        BY_PROTOCOL,
        protocol,
        core::ptr::null(),
        &mut buffer_size,
        core::ptr::null_mut(),
    );
    if buffer_size == 0 {
        return Ok(alloc::vec::Vec::new());
    }

    let count = buffer_size / core::mem::size_of::<*mut ()>();
    let mut handles = alloc::vec![core::ptr::null_mut::<()>(); count];
    let status = (bs.locate_handle)(
        BY_PROTOCOL,
        protocol,
        core::ptr::null(),
        &mut buffer_size,
        handles.as_mut_ptr(),
    );
    if status != EFI_SUCCESS {
        return Err(status);
    }

    handles.truncate(buffer_size / core::mem::size_of::<*mut ()>());
    Ok(handles)
}
