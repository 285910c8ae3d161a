//! Both-endian field helpers
//!
//! ECMA-119 stores most numbers twice, little-endian first. A field whose
//! halves disagree is treated as corrupt.

/// Read a both-endian u32 at `offset`
pub fn both_endian_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 8)?;
    let le = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let be = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    (le == be).then_some(le)
}

/// Read a both-endian u16 at `offset`
pub fn both_endian_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 4)?;
    let le = u16::from_le_bytes([bytes[0], bytes[1]]);
    let be = u16::from_be_bytes([bytes[2], bytes[3]]);
    (le == be).then_some(le)
}

/// Read the little-endian half of a both-endian u32
///
/// Directory record fields use the little-endian copy only.
pub fn le_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_endian_consistency() {
        let mut field = [0u8; 8];
        field[..4].copy_from_slice(&2048u32.to_le_bytes());
        field[4..].copy_from_slice(&2048u32.to_be_bytes());
        assert_eq!(both_endian_u32(&field, 0), Some(2048));

        field[7] = 0xFF;
        assert_eq!(both_endian_u32(&field, 0), None);
        assert_eq!(both_endian_u32(&field, 4), None);
    }

    #[test]
    fn test_both_endian_u16() {
        let field = [0x00, 0x08, 0x08, 0x00];
        assert_eq!(both_endian_u16(&field, 0), Some(2048));
    }
}
