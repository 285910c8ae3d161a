//! Directory record parsing and navigation

pub mod record;

use crate::error::{FsError, Result};
use crate::trace::trace;
use crate::types::{DirectoryRecord, VolumeDescriptor, MAX_DIRECTORY_DEPTH, MAX_LOGICAL_BLOCK};
use crate::utils::string::names_match;
use blockio::BlockError;
use gpt_disk_io::BlockIo;
use gpt_disk_types::Lba;
use record::RawRecord;

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(is_separator)
        .filter(|component| !component.is_empty() && *component != ".")
}

/// Resolve a path to its directory record
///
/// Walks the tree from the root, scanning one directory per component.
/// Separators are `/` and `\`; empty and `.` components are ignored, so an
/// empty path yields the root directory. Matching ignores ASCII case, the
/// `;version` suffix and a trailing dot.
///
/// # Errors
/// - `PathTooDeep` if the path has more than [`MAX_DIRECTORY_DEPTH`] components
/// - `NotFound` if any component has no match
/// - `NotADirectory` if a non-terminal component names a file
///
/// # Example
/// ```ignore
/// let volume = iso9660::open(&mut device, 0)?;
/// let module = iso9660::resolve(&mut device, &volume, "/MOD/ZERO.KO")?;
/// ```
pub fn resolve<B: BlockIo<Error = BlockError>>(
    block_io: &mut B,
    volume: &VolumeDescriptor,
    path: &str,
) -> Result<DirectoryRecord> {
    if components(path).count() > MAX_DIRECTORY_DEPTH {
        return Err(FsError::PathTooDeep);
    }

    let mut current = volume.root.clone();
    for component in components(path) {
        if !current.is_directory() {
            return Err(FsError::NotADirectory);
        }
        current = find_entry(block_io, volume, &current, component)?.ok_or_else(|| {
            trace("iso9660: path component not found");
            FsError::NotFound
        })?;
    }

    Ok(current)
}

/// Scan one directory extent for `name`
///
/// Reads the extent one logical block at a time into a stack buffer; only a
/// matching record is copied out. Records never straddle a block boundary, a
/// zero length byte pads to the next block.
pub fn find_entry<B: BlockIo<Error = BlockError>>(
    block_io: &mut B,
    volume: &VolumeDescriptor,
    directory: &DirectoryRecord,
    name: &str,
) -> Result<Option<DirectoryRecord>> {
    if !volume.contains_extent(directory) {
        return Err(FsError::ExtentOutOfBounds);
    }

    let block_size = volume.logical_block_size as usize;
    let mut block = [0u8; MAX_LOGICAL_BLOCK];
    let block = &mut block[..block_size];

    let mut remaining = directory.data_length as usize;
    let mut index = 0u64;

    while remaining > 0 {
        let lba = volume.device_sector(directory.extent_lba as u64 + index);
        block_io.read_blocks(Lba(lba), block)?;

        let used = remaining.min(block_size);
        let mut offset = 0usize;
        while offset < used {
            if block[offset] == 0 {
                break;
            }

            let raw = RawRecord::parse(&block[offset..])?;
            if !raw.is_self_or_parent() && names_match(raw.identifier(), name) {
                return Ok(Some(raw.to_record()));
            }
            offset += raw.length();
        }

        remaining -= used;
        index += 1;
    }

    Ok(None)
}
