//! Raw accessors for the fields that sit at the front of page 0.
//!
//! Reference: `ZealFSHeader` in `include/common.h` (V1) and
//! `include/zealfs_v2.h` (V2). These are free functions over a byte slice
//! rather than a `#[repr(packed)]` struct overlay, matching `entry.rs`'s
//! explicit-accessor approach and the teacher's `mach.rs`/`page_buf.rs` style.

use crate::layout::{Layout, Version};
use crate::mach;

pub const MAGIC: u8 = b'Z';

pub fn read_magic(bytes: &[u8]) -> u8 {
    bytes[0]
}

pub fn write_magic(bytes: &mut [u8]) {
    bytes[0] = MAGIC;
}

pub fn read_version(bytes: &[u8]) -> Option<Version> {
    match bytes[1] {
        1 => Some(Version::V1),
        2 => Some(Version::V2),
        _ => None,
    }
}

pub fn write_version(bytes: &mut [u8], version: Version) {
    bytes[1] = match version {
        Version::V1 => 1,
        Version::V2 => 2,
    };
}

pub fn read_bitmap_size(bytes: &[u8], version: Version) -> usize {
    match version {
        Version::V1 => bytes[2] as usize,
        Version::V2 => mach::read_u16(&bytes[2..4]) as usize,
    }
}

pub fn write_bitmap_size(bytes: &mut [u8], version: Version, value: usize) {
    match version {
        Version::V1 => bytes[2] = value as u8,
        Version::V2 => mach::write_u16(&mut bytes[2..4], value as u16),
    }
}

pub fn read_free_pages(bytes: &[u8], version: Version) -> u32 {
    match version {
        Version::V1 => bytes[3] as u32,
        Version::V2 => mach::read_u16(&bytes[4..6]) as u32,
    }
}

pub fn write_free_pages(bytes: &mut [u8], version: Version, value: u32) {
    match version {
        Version::V1 => bytes[3] = value as u8,
        Version::V2 => mach::write_u16(&mut bytes[4..6], value as u16),
    }
}

/// V2 only: the page-size code stored at offset 6 (`log2(page_size/256)`).
pub fn read_page_size_code(bytes: &[u8]) -> u8 {
    bytes[6]
}

pub fn write_page_size_code(bytes: &mut [u8], code: u8) {
    bytes[6] = code;
}

pub fn bitmap_slice(bytes: &[u8], layout: &Layout) -> &[u8] {
    let start = layout.bitmap_offset();
    &bytes[start..start + layout.bitmap_size]
}

pub fn bitmap_slice_mut(bytes: &mut [u8], layout: &Layout) -> &mut [u8] {
    let start = layout.bitmap_offset();
    &mut bytes[start..start + layout.bitmap_size]
}

/// Parse the `Layout` implied by an already-written header. Returns `None`
/// if the magic byte or version field do not match a known format.
pub fn parse_layout(bytes: &[u8]) -> Option<Layout> {
    if read_magic(bytes) != MAGIC {
        return None;
    }
    let version = read_version(bytes)?;
    let bitmap_size = read_bitmap_size(bytes, version);
    let page_size = match version {
        Version::V1 => 256,
        Version::V2 => 256usize << read_page_size_code(bytes),
    };
    Some(Layout::from_header(version, page_size, bitmap_size))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn v1_header_fields_round_trip() {
        let mut bytes = [0u8; 64];
        write_magic(&mut bytes);
        write_version(&mut bytes, Version::V1);
        write_bitmap_size(&mut bytes, Version::V1, 4);
        write_free_pages(&mut bytes, Version::V1, 15);

        assert_eq!(read_magic(&bytes), MAGIC);
        assert_eq!(read_version(&bytes), Some(Version::V1));
        assert_eq!(read_bitmap_size(&bytes, Version::V1), 4);
        assert_eq!(read_free_pages(&bytes, Version::V1), 15);
    }

    #[test]
    fn v2_header_fields_round_trip() {
        let mut bytes = [0u8; 16];
        write_magic(&mut bytes);
        write_version(&mut bytes, Version::V2);
        write_bitmap_size(&mut bytes, Version::V2, 300);
        write_free_pages(&mut bytes, Version::V2, 9000);
        write_page_size_code(&mut bytes, 3);

        assert_eq!(read_bitmap_size(&bytes, Version::V2), 300);
        assert_eq!(read_free_pages(&bytes, Version::V2), 9000);
        assert_eq!(read_page_size_code(&bytes), 3);
    }
}
