//! Byte-exact ISO9660 image builder
//!
//! Layout: descriptors at 16 (primary) and 17 (terminator), directories from
//! 18 in creation order, then file data. Directory records are packed into
//! 2048-byte blocks without straddling a boundary, so large directories span
//! several blocks.

use crate::common::MemoryBlockDevice;

const BLOCK: usize = 2048;

enum Node {
    Dir { name: String, parent: usize, children: Vec<usize> },
    File { name: String, data: Vec<u8> },
}

pub struct IsoBuilder {
    nodes: Vec<Node>,
    volume_id: String,
    device_sector_size: usize,
    version_suffix: bool,
}

impl IsoBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Dir {
                name: String::new(),
                parent: 0,
                children: Vec::new(),
            }],
            volume_id: "KEEL_TEST".to_string(),
            device_sector_size: BLOCK,
            version_suffix: true,
        }
    }

    /// Present the image through a device with smaller sectors
    pub fn device_sector_size(mut self, size: usize) -> Self {
        self.device_sector_size = size;
        self
    }

    /// Record file names without the `;1` suffix
    pub fn without_versions(mut self) -> Self {
        self.version_suffix = false;
        self
    }

    pub fn volume_id(mut self, id: &str) -> Self {
        self.volume_id = id.to_string();
        self
    }

    /// Add a file, creating intermediate directories (`MOD/ZERO.KO`)
    pub fn file(mut self, path: &str, content: &[u8]) -> Self {
        let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let file_name = parts.pop().expect("file name");

        let mut dir = 0;
        for part in parts {
            dir = self.child_dir(dir, part);
        }

        let index = self.nodes.len();
        let name = if self.version_suffix {
            format!("{};1", file_name)
        } else {
            file_name.to_string()
        };
        self.nodes.push(Node::File {
            name,
            data: content.to_vec(),
        });
        self.children_mut(dir).push(index);
        self
    }

    /// Add an empty directory
    pub fn dir(mut self, path: &str) -> Self {
        let mut dir = 0;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            dir = self.child_dir(dir, part);
        }
        self
    }

    fn children_mut(&mut self, dir: usize) -> &mut Vec<usize> {
        match &mut self.nodes[dir] {
            Node::Dir { children, .. } => children,
            Node::File { .. } => panic!("not a directory"),
        }
    }

    fn child_dir(&mut self, dir: usize, name: &str) -> usize {
        let existing = match &self.nodes[dir] {
            Node::Dir { children, .. } => children.iter().copied().find(|&c| {
                matches!(&self.nodes[c], Node::Dir { name: n, .. } if n == name)
            }),
            Node::File { .. } => panic!("not a directory"),
        };
        if let Some(found) = existing {
            return found;
        }

        let index = self.nodes.len();
        self.nodes.push(Node::Dir {
            name: name.to_string(),
            parent: dir,
            children: Vec::new(),
        });
        self.children_mut(dir).push(index);
        index
    }

    fn record_len(name_len: usize) -> usize {
        let len = 33 + name_len;
        len + len % 2
    }

    fn name_of(&self, index: usize) -> &str {
        match &self.nodes[index] {
            Node::Dir { name, .. } | Node::File { name, .. } => name,
        }
    }

    /// Blocks a directory occupies once its records are packed
    fn dir_blocks(&self, children: &[usize]) -> usize {
        let mut blocks = 1;
        let mut offset = 2 * Self::record_len(1);
        for &child in children {
            let len = Self::record_len(self.name_of(child).len());
            if offset + len > BLOCK {
                blocks += 1;
                offset = 0;
            }
            offset += len;
        }
        blocks
    }

    pub fn build(self) -> MemoryBlockDevice {
        // (lba, byte length) per node
        let mut extents = vec![(0u32, 0u32); self.nodes.len()];
        let mut next = 18u32;

        for (index, node) in self.nodes.iter().enumerate() {
            if let Node::Dir { children, .. } = node {
                let blocks = self.dir_blocks(children);
                extents[index] = (next, (blocks * BLOCK) as u32);
                next += blocks as u32;
            }
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let Node::File { data, .. } = node {
                extents[index] = (next, data.len() as u32);
                next += data.len().div_ceil(BLOCK) as u32;
            }
        }

        let total_blocks = next as usize;
        let mut data = vec![0u8; total_blocks * BLOCK];

        // Primary Volume Descriptor
        let pvd = 16 * BLOCK;
        data[pvd] = 1;
        data[pvd + 1..pvd + 6].copy_from_slice(b"CD001");
        data[pvd + 6] = 1;
        let mut id = [b' '; 32];
        id[..self.volume_id.len()].copy_from_slice(self.volume_id.as_bytes());
        data[pvd + 40..pvd + 72].copy_from_slice(&id);
        write_both_endian_u32(&mut data[pvd + 80..], total_blocks as u32);
        write_both_endian_u16(&mut data[pvd + 120..], 1);
        write_both_endian_u16(&mut data[pvd + 124..], 1);
        write_both_endian_u16(&mut data[pvd + 128..], BLOCK as u16);
        let mut offset = pvd + 156;
        write_record(&mut data, &mut offset, extents[0], 0x02, &[0x00]);

        // Terminator
        let term = 17 * BLOCK;
        data[term] = 255;
        data[term + 1..term + 6].copy_from_slice(b"CD001");
        data[term + 6] = 1;

        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Dir { parent, children, .. } => {
                    let start = extents[index].0 as usize * BLOCK;
                    let mut offset = start;
                    write_record(&mut data, &mut offset, extents[index], 0x02, &[0x00]);
                    write_record(&mut data, &mut offset, extents[*parent], 0x02, &[0x01]);

                    for &child in children {
                        let name = self.name_of(child).as_bytes();
                        let len = Self::record_len(name.len());
                        let used = (offset - start) % BLOCK;
                        if used + len > BLOCK {
                            offset += BLOCK - used;
                        }
                        let flags = match self.nodes[child] {
                            Node::Dir { .. } => 0x02,
                            Node::File { .. } => 0x00,
                        };
                        write_record(&mut data, &mut offset, extents[child], flags, name);
                    }
                }
                Node::File { data: content, .. } => {
                    let start = extents[index].0 as usize * BLOCK;
                    data[start..start + content.len()].copy_from_slice(content);
                }
            }
        }

        MemoryBlockDevice::new(data, self.device_sector_size)
    }
}

fn write_both_endian_u32(dst: &mut [u8], value: u32) {
    dst[0..4].copy_from_slice(&value.to_le_bytes());
    dst[4..8].copy_from_slice(&value.to_be_bytes());
}

fn write_both_endian_u16(dst: &mut [u8], value: u16) {
    dst[0..2].copy_from_slice(&value.to_le_bytes());
    dst[2..4].copy_from_slice(&value.to_be_bytes());
}

fn write_record(data: &mut [u8], offset: &mut usize, extent: (u32, u32), flags: u8, name: &[u8]) {
    let len = IsoBuilder::record_len(name.len());
    let start = *offset;
    data[start] = len as u8;
    write_both_endian_u32(&mut data[start + 2..], extent.0);
    write_both_endian_u32(&mut data[start + 10..], extent.1);
    data[start + 25] = flags;
    write_both_endian_u16(&mut data[start + 28..], 1);
    data[start + 32] = name.len() as u8;
    data[start + 33..start + 33 + name.len()].copy_from_slice(name);
    *offset += len;
}
