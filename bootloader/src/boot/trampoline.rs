//! Long mode to 32-bit protected mode
//!
//! The kernel is entered with paging off, a flat 4 GiB code and data
//! segment, `EAX` = Multiboot magic, `EBX` = boot information address and
//! interrupts disabled.
//!
//! The trampoline leaves long mode through compatibility mode, so it has to
//! run from identity-mapped memory below 4 GiB. It is position independent
//! and copied into a low code page claimed before the firmware map snapshot.

use crate::uefi::{BootServices, EFI_SUCCESS, LOADER_CODE, PAGE_SIZE};
use core::arch::global_asm;
use core::ops::Range;

/// `AllocateMaxAddress`
const ALLOCATE_MAX_ADDRESS: usize = 1;

/// Highest page the trampoline may start at
const LOW_MEMORY_MAX: u64 = 0xFFFF_F000;

global_asm!(
    r#"
.text
.code64

.global keel_trampoline
.global keel_trampoline_end

# rdi = entry, rsi = magic, rdx = info (sysv64)
keel_trampoline:
    cli
    cld
    mov ebx, edx

    lea rax, [rip + keel_gdt]
    sub rsp, 16
    mov word ptr [rsp], 23
    mov qword ptr [rsp + 2], rax
    lgdt [rsp]

    push 0x08
    lea rax, [rip + keel_compat]
    push rax
    retfq

.code32
keel_compat:
    mov ax, 0x10
    mov ds, ax
    mov es, ax
    mov fs, ax
    mov gs, ax
    mov ss, ax

    # Paging off drops the CPU out of long mode
    mov eax, cr0
    and eax, 0x7FFFFFFF
    mov cr0, eax

    mov ecx, 0xC0000080
    rdmsr
    btr eax, 8
    wrmsr

    mov eax, cr4
    and eax, 0xFFFFFFDF
    mov cr4, eax

    mov eax, esi
    jmp edi

.align 8
keel_gdt:
    .quad 0
    .quad 0x00CF9A000000FFFF
    .quad 0x00CF92000000FFFF
keel_trampoline_end:
.code64
"#
);

extern "C" {
    fn keel_trampoline();
    fn keel_trampoline_end();
}

type EnterFn = extern "sysv64" fn(entry: u32, magic: u32, info: u32) -> !;

/// Low copy of the trampoline
#[derive(Debug, Clone, Copy)]
pub struct Trampoline {
    address: u64,
}

impl Trampoline {
    /// Copy the trampoline below 4 GiB
    pub fn install(bs: &BootServices) -> Result<Self, usize> {
        let start = keel_trampoline as usize;
        let len = keel_trampoline_end as usize - start;

        let mut address = LOW_MEMORY_MAX;
        let status = (bs.allocate_pages)(ALLOCATE_MAX_ADDRESS, LOADER_CODE, 1, &mut address);
        if status != EFI_SUCCESS {
            return Err(status);
        }
        debug_assert!(len <= PAGE_SIZE);

        // SAFETY: fresh identity-mapped page; the blob is position independent
        unsafe {
            core::ptr::copy_nonoverlapping(start as *const u8, address as *mut u8, len);
        }

        keel_core::log_debug!("Trampoline at {:#x} ({} bytes)", address, len);
        Ok(Self { address })
    }

    /// The page holding the trampoline and its GDT
    pub fn page(&self) -> Range<u64> {
        self.address..self.address + PAGE_SIZE as u64
    }

    /// Jump to a 32-bit kernel
    ///
    /// # Safety
    /// Boot services must have been exited and `info` must hold the encoded
    /// boot information.
    pub unsafe fn enter(self, entry: u32, magic: u32, info: u32) -> ! {
        let enter: EnterFn = core::mem::transmute(self.address as usize);
        enter(entry, magic, info)
    }
}
