//! ELF header parsing
//!
//! Only what a fixed-address kernel needs: the file header and the program
//! header table. Little-endian, `ET_EXEC` only.

use super::{ImageError, TargetArch};

/// `e_ident[0..4]`
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
/// 32-bit class
pub const ELFCLASS32: u8 = 1;
/// 64-bit class
pub const ELFCLASS64: u8 = 2;
/// Little-endian data encoding
pub const ELFDATA2LSB: u8 = 1;
/// Only defined ELF version
pub const EV_CURRENT: u8 = 1;
/// Executable file type
pub const ET_EXEC: u16 = 2;
/// Intel 80386
pub const EM_386: u16 = 3;
/// AMD x86-64
pub const EM_X86_64: u16 = 62;
/// Loadable segment
pub const PT_LOAD: u32 = 1;

/// Bytes read up front; covers both header classes
pub const HEADER_READ: usize = 64;

const EHDR32_SIZE: usize = 52;
const EHDR64_SIZE: usize = 64;
const PHDR32_SIZE: u16 = 32;
const PHDR64_SIZE: u16 = 56;

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(raw)
}

/// Validated file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    /// Architecture the header was checked against
    pub target: TargetArch,
    /// `e_entry`
    pub entry: u64,
    /// File offset of the program header table
    pub phoff: u64,
    /// Bytes per program header
    pub phentsize: u16,
    /// Number of program headers
    pub phnum: u16,
}

impl ElfHeader {
    /// Parse the first bytes of an image (up to [`HEADER_READ`])
    ///
    /// Checks run in order: magic, class and encoding against `target`,
    /// header completeness, machine and type.
    pub fn parse(data: &[u8], target: TargetArch) -> Result<Self, ImageError> {
        if data.len() < 4 || data[..4] != ELF_MAGIC {
            return Err(ImageError::BadMagic);
        }
        if data.len() < 16 {
            return Err(ImageError::Malformed);
        }

        let class = data[4];
        if class != target.elf_class() || data[5] != ELFDATA2LSB || data[6] != EV_CURRENT {
            return Err(ImageError::UnsupportedClass);
        }

        let header_size = match target {
            TargetArch::I386 => EHDR32_SIZE,
            TargetArch::X86_64 => EHDR64_SIZE,
        };
        if data.len() < header_size {
            return Err(ImageError::Malformed);
        }

        let elf_type = read_u16(data, 16);
        let machine = read_u16(data, 18);
        if machine != target.machine() || elf_type != ET_EXEC {
            return Err(ImageError::UnsupportedClass);
        }

        let (entry, phoff, phentsize, phnum) = match target {
            TargetArch::I386 => (
                read_u32(data, 24) as u64,
                read_u32(data, 28) as u64,
                read_u16(data, 42),
                read_u16(data, 44),
            ),
            TargetArch::X86_64 => (
                read_u64(data, 24),
                read_u64(data, 32),
                read_u16(data, 54),
                read_u16(data, 56),
            ),
        };

        if phentsize < target.phdr_size() {
            return Err(ImageError::Malformed);
        }

        Ok(Self {
            target,
            entry,
            phoff,
            phentsize,
            phnum,
        })
    }

    /// Byte length of the program header table
    pub fn table_len(&self) -> u64 {
        self.phentsize as u64 * self.phnum as u64
    }
}

/// One program header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
}

impl ProgramHeader {
    /// Parse one entry; `data` is at least the class's entry size
    pub fn parse(data: &[u8], target: TargetArch) -> Self {
        match target {
            TargetArch::I386 => Self {
                p_type: read_u32(data, 0),
                offset: read_u32(data, 4) as u64,
                vaddr: read_u32(data, 8) as u64,
                paddr: read_u32(data, 12) as u64,
                filesz: read_u32(data, 16) as u64,
                memsz: read_u32(data, 20) as u64,
            },
            TargetArch::X86_64 => Self {
                p_type: read_u32(data, 0),
                offset: read_u64(data, 8),
                vaddr: read_u64(data, 16),
                paddr: read_u64(data, 24),
                filesz: read_u64(data, 32),
                memsz: read_u64(data, 40),
            },
        }
    }

    /// `PT_LOAD` with something to place
    pub fn is_loadable(&self) -> bool {
        self.p_type == PT_LOAD && self.memsz != 0
    }
}

impl TargetArch {
    /// `EI_CLASS` the image must carry
    pub fn elf_class(self) -> u8 {
        match self {
            TargetArch::I386 => ELFCLASS32,
            TargetArch::X86_64 => ELFCLASS64,
        }
    }

    /// `e_machine` the image must carry
    pub fn machine(self) -> u16 {
        match self {
            TargetArch::I386 => EM_386,
            TargetArch::X86_64 => EM_X86_64,
        }
    }

    fn phdr_size(self) -> u16 {
        match self {
            TargetArch::I386 => PHDR32_SIZE,
            TargetArch::X86_64 => PHDR64_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header32() -> [u8; 52] {
        let mut h = [0u8; 52];
        h[..4].copy_from_slice(&ELF_MAGIC);
        h[4] = ELFCLASS32;
        h[5] = ELFDATA2LSB;
        h[6] = EV_CURRENT;
        h[16..18].copy_from_slice(&ET_EXEC.to_le_bytes());
        h[18..20].copy_from_slice(&EM_386.to_le_bytes());
        h[24..28].copy_from_slice(&0x100020u32.to_le_bytes());
        h[28..32].copy_from_slice(&52u32.to_le_bytes());
        h[42..44].copy_from_slice(&32u16.to_le_bytes());
        h[44..46].copy_from_slice(&2u16.to_le_bytes());
        h
    }

    #[test]
    fn test_parse_elf32_header() {
        let header = ElfHeader::parse(&header32(), TargetArch::I386).unwrap();
        assert_eq!(header.entry, 0x100020);
        assert_eq!(header.phoff, 52);
        assert_eq!(header.phnum, 2);
        assert_eq!(header.table_len(), 64);
    }

    #[test]
    fn test_header_rejections() {
        let mut bad = header32();
        bad[1] = b'X';
        assert_eq!(ElfHeader::parse(&bad, TargetArch::I386), Err(ImageError::BadMagic));
        assert_eq!(ElfHeader::parse(&[], TargetArch::I386), Err(ImageError::BadMagic));

        assert_eq!(
            ElfHeader::parse(&header32(), TargetArch::X86_64),
            Err(ImageError::UnsupportedClass)
        );

        let mut arm = header32();
        arm[18..20].copy_from_slice(&40u16.to_le_bytes());
        assert_eq!(ElfHeader::parse(&arm, TargetArch::I386), Err(ImageError::UnsupportedClass));

        let mut big_endian = header32();
        big_endian[5] = 2;
        assert_eq!(
            ElfHeader::parse(&big_endian, TargetArch::I386),
            Err(ImageError::UnsupportedClass)
        );

        let mut shared = header32();
        shared[16..18].copy_from_slice(&3u16.to_le_bytes());
        assert_eq!(
            ElfHeader::parse(&shared, TargetArch::I386),
            Err(ImageError::UnsupportedClass)
        );

        assert_eq!(
            ElfHeader::parse(&header32()[..30], TargetArch::I386),
            Err(ImageError::Malformed)
        );

        let mut tiny_entries = header32();
        tiny_entries[42..44].copy_from_slice(&16u16.to_le_bytes());
        assert_eq!(
            ElfHeader::parse(&tiny_entries, TargetArch::I386),
            Err(ImageError::Malformed)
        );
    }

    #[test]
    fn test_program_header32() {
        let mut raw = [0u8; 32];
        raw[0..4].copy_from_slice(&PT_LOAD.to_le_bytes());
        raw[4..8].copy_from_slice(&0x1000u32.to_le_bytes());
        raw[8..12].copy_from_slice(&0xC0100000u32.to_le_bytes());
        raw[12..16].copy_from_slice(&0x100000u32.to_le_bytes());
        raw[16..20].copy_from_slice(&0x200u32.to_le_bytes());
        raw[20..24].copy_from_slice(&0x800u32.to_le_bytes());

        let ph = ProgramHeader::parse(&raw, TargetArch::I386);
        assert!(ph.is_loadable());
        assert_eq!(ph.paddr, 0x100000);
        assert_eq!(ph.vaddr, 0xC0100000);
        assert_eq!(ph.filesz, 0x200);
        assert_eq!(ph.memsz, 0x800);
    }
}
