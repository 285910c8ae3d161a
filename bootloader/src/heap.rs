//! Loader heap
//!
//! `linked_list_allocator` over pages taken from the firmware as
//! `EfiLoaderData`, so no kernel placement can land on them. The range is
//! also passed on as a loader buffer so the kernel's memory map reports it
//! as reserved.
//!
//! # Safety
//!
//! - `init()` must run before the first allocation
//! - Single core, no interrupts; the spin lock is never contended

use crate::uefi::{BootServices, ALLOCATE_ANY_PAGES, EFI_SUCCESS, LOADER_DATA, PAGE_SIZE};
use core::alloc::{GlobalAlloc, Layout};
use core::ops::Range;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use linked_list_allocator::Heap;

/// Directory extents and transfer bounce buffers; files go straight to
/// their final placement
const HEAP_SIZE: usize = 4 * 1024 * 1024;

/// Locked heap wrapper implementing GlobalAlloc
pub struct LockedHeap {
    inner: spin::Mutex<Heap>,
}

impl LockedHeap {
    pub const fn empty() -> Self {
        Self {
            inner: spin::Mutex::new(Heap::empty()),
        }
    }

    /// # Safety
    /// The region must be valid, writable and used by nothing else.
    unsafe fn init(&self, start: *mut u8, size: usize) {
        self.inner.lock().init(start, size);
    }
}

unsafe impl GlobalAlloc for LockedHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.inner
            .lock()
            .allocate_first_fit(layout)
            .map(|nn| nn.as_ptr())
            .unwrap_or(core::ptr::null_mut())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if let Some(nn) = NonNull::new(ptr) {
            self.inner.lock().deallocate(nn, layout);
        }
    }
}

#[global_allocator]
static GLOBAL: LockedHeap = LockedHeap::empty();

static HEAP_INITIALIZED: AtomicBool = AtomicBool::new(false);

static HEAP_START: AtomicU64 = AtomicU64::new(0);

/// Take the heap pages from the firmware and return their range; only the
/// first call allocates
pub fn init(bs: &BootServices) -> Result<Range<u64>, usize> {
    if HEAP_INITIALIZED.swap(true, Ordering::SeqCst) {
        let start = HEAP_START.load(Ordering::SeqCst);
        return Ok(start..start + HEAP_SIZE as u64);
    }

    let pages = HEAP_SIZE / PAGE_SIZE;
    let mut address = 0u64;
    let status = (bs.allocate_pages)(ALLOCATE_ANY_PAGES, LOADER_DATA, pages, &mut address);
    if status != EFI_SUCCESS {
        HEAP_INITIALIZED.store(false, Ordering::SeqCst);
        return Err(status);
    }

    // SAFETY: freshly allocated, identity mapped, owned by the heap from now on
    unsafe { GLOBAL.init(address as *mut u8, HEAP_SIZE) };
    HEAP_START.store(address, Ordering::SeqCst);
    Ok(address..address + HEAP_SIZE as u64)
}
