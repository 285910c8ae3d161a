//! Minimal little-endian ELF executable writer

use keel_core::image::elf::{EM_386, EM_X86_64, ET_EXEC, PT_LOAD};
use keel_core::image::TargetArch;

struct Segment {
    p_type: u32,
    paddr: u64,
    data: Vec<u8>,
    memsz: u64,
}

pub struct ElfWriter {
    target: TargetArch,
    entry: u64,
    segments: Vec<Segment>,
}

impl ElfWriter {
    pub fn new(target: TargetArch) -> Self {
        Self {
            target,
            entry: 0,
            segments: Vec::new(),
        }
    }

    pub fn entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    /// `PT_LOAD` segment at `paddr`; `memsz` past `data.len()` is bss
    pub fn segment(mut self, paddr: u64, data: &[u8], memsz: u64) -> Self {
        self.segments.push(Segment {
            p_type: PT_LOAD,
            paddr,
            data: data.to_vec(),
            memsz,
        });
        self
    }

    /// Non-loadable entry (`PT_NOTE`)
    pub fn note(mut self, data: &[u8]) -> Self {
        self.segments.push(Segment {
            p_type: 4,
            paddr: 0,
            data: data.to_vec(),
            memsz: 0,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let is64 = self.target == TargetArch::X86_64;
        let (ehsize, phentsize) = if is64 { (64usize, 56usize) } else { (52, 32) };
        let table_end = ehsize + phentsize * self.segments.len();

        let mut offsets = Vec::new();
        let mut cursor = (table_end + 15) & !15;
        for segment in &self.segments {
            offsets.push(cursor);
            cursor = (cursor + segment.data.len() + 15) & !15;
        }

        let mut out = vec![0u8; cursor.max(table_end)];
        out[..4].copy_from_slice(&[0x7F, b'E', b'L', b'F']);
        out[4] = if is64 { 2 } else { 1 };
        out[5] = 1;
        out[6] = 1;
        out[16..18].copy_from_slice(&ET_EXEC.to_le_bytes());
        let machine = if is64 { EM_X86_64 } else { EM_386 };
        out[18..20].copy_from_slice(&machine.to_le_bytes());
        out[20..24].copy_from_slice(&1u32.to_le_bytes());

        if is64 {
            out[24..32].copy_from_slice(&self.entry.to_le_bytes());
            out[32..40].copy_from_slice(&(ehsize as u64).to_le_bytes());
            out[52..54].copy_from_slice(&(ehsize as u16).to_le_bytes());
            out[54..56].copy_from_slice(&(phentsize as u16).to_le_bytes());
            out[56..58].copy_from_slice(&(self.segments.len() as u16).to_le_bytes());
        } else {
            out[24..28].copy_from_slice(&(self.entry as u32).to_le_bytes());
            out[28..32].copy_from_slice(&(ehsize as u32).to_le_bytes());
            out[40..42].copy_from_slice(&(ehsize as u16).to_le_bytes());
            out[42..44].copy_from_slice(&(phentsize as u16).to_le_bytes());
            out[44..46].copy_from_slice(&(self.segments.len() as u16).to_le_bytes());
        }

        for (i, segment) in self.segments.iter().enumerate() {
            let ph = ehsize + i * phentsize;
            let offset = offsets[i] as u64;
            let filesz = segment.data.len() as u64;
            if is64 {
                out[ph..ph + 4].copy_from_slice(&segment.p_type.to_le_bytes());
                out[ph + 8..ph + 16].copy_from_slice(&offset.to_le_bytes());
                out[ph + 16..ph + 24].copy_from_slice(&segment.paddr.to_le_bytes());
                out[ph + 24..ph + 32].copy_from_slice(&segment.paddr.to_le_bytes());
                out[ph + 32..ph + 40].copy_from_slice(&filesz.to_le_bytes());
                out[ph + 40..ph + 48].copy_from_slice(&segment.memsz.to_le_bytes());
            } else {
                out[ph..ph + 4].copy_from_slice(&segment.p_type.to_le_bytes());
                out[ph + 4..ph + 8].copy_from_slice(&(offset as u32).to_le_bytes());
                out[ph + 8..ph + 12].copy_from_slice(&(segment.paddr as u32).to_le_bytes());
                out[ph + 12..ph + 16].copy_from_slice(&(segment.paddr as u32).to_le_bytes());
                out[ph + 16..ph + 20].copy_from_slice(&(filesz as u32).to_le_bytes());
                out[ph + 20..ph + 24].copy_from_slice(&(segment.memsz as u32).to_le_bytes());
            }
            out[offsets[i]..offsets[i] + segment.data.len()].copy_from_slice(&segment.data);
        }

        out
    }
}
