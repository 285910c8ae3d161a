//! String handling utilities
//!
//! ISO9660 identifiers carry a `;version` suffix and, for names without an
//! extension, a lone trailing dot (`KERNEL.;1`).

/// Trim trailing spaces from byte slice
pub fn trim_trailing_spaces(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == b' ' {
        end -= 1;
    }
    &bytes[..end]
}

/// Strip version suffix and one trailing dot
///
/// `FILE.TXT;1` -> `FILE.TXT`, `KERNEL.;1` -> `KERNEL`, `KERNEL.` -> `KERNEL`
pub fn strip_version(name: &[u8]) -> &[u8] {
    let base = match name.iter().position(|&b| b == b';') {
        Some(semi) => &name[..semi],
        None => name,
    };
    base.strip_suffix(b".").unwrap_or(base)
}

/// Compare an on-disk identifier with a requested path component
///
/// Both sides are normalised with [`strip_version`] and compared ASCII
/// case-insensitively.
pub fn names_match(on_disk: &[u8], wanted: &str) -> bool {
    strip_version(on_disk).eq_ignore_ascii_case(strip_version(wanted.as_bytes()))
}
