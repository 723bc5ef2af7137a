//! The 32-byte packed directory-entry record.
//!
//! Reference: `include/common.h`'s `ZealFileEntry` (V1) and
//! `include/zealfs_v2.h`'s `ZealFileEntry` (V2). Both are exactly 32 bytes;
//! V1 stores an 8-bit `start_page`/16-bit `size` and 4 reserved trailer
//! bytes, V2 stores a 16-bit `start_page`/32-bit `size` and 1 reserved byte.
//! This crate never overlays a `#[repr(C)]` struct on the mapped image
//! (`SPEC_FULL.md` §9 "Packed byte layout") — every field is read and
//! written through explicit little-endian accessors, the way the teacher's
//! `page_buf.rs`/`mach.rs` decode fields out of a raw page slice.

use crate::bcd::Timestamp;
use crate::mach;

pub const NAME_MAX_LEN: usize = 16;
pub const ENTRY_SIZE: usize = 32;

pub const FLAG_IS_DIR: u8 = 1 << 0;
pub const FLAG_OCCUPIED: u8 = 1 << 7;
/// Bits that must always read as zero (everything but dir/occupied).
pub const FLAG_RESERVED_MASK: u8 = !(FLAG_IS_DIR | FLAG_OCCUPIED);

/// A decoded directory entry, independent of the on-disk width of
/// `start_page`/`size` (that width is a property of the `Layout`, see
/// `layout.rs`; `DirEntry` always holds the widened values in memory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub flags: u8,
    pub name: [u8; NAME_MAX_LEN],
    pub start_page: u32,
    pub size: u64,
    pub timestamp: Timestamp,
}

impl DirEntry {
    pub fn empty() -> DirEntry {
        DirEntry {
            flags: 0,
            name: [0; NAME_MAX_LEN],
            start_page: 0,
            size: 0,
            timestamp: Timestamp {
                year: 0,
                month: 0,
                day: 0,
                weekday: 0,
                hour: 0,
                minute: 0,
                second: 0,
            },
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.flags & FLAG_OCCUPIED != 0
    }

    pub fn is_dir(&self) -> bool {
        self.flags & FLAG_IS_DIR != 0
    }

    /// Name with trailing zero padding stripped.
    pub fn name_bytes(&self) -> &[u8] {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_MAX_LEN);
        &self.name[..len]
    }

    pub fn name_matches(&self, other: &[u8]) -> bool {
        // strncmp semantics: compare up to NAME_MAX_LEN bytes of the padded
        // array, not the trimmed name, matching `browse_path`'s
        // `strncmp(entries[i].name, tmp_name, NAME_MAX_LEN)`.
        let mut padded = [0u8; NAME_MAX_LEN];
        let n = other.len().min(NAME_MAX_LEN);
        padded[..n].copy_from_slice(&other[..n]);
        self.name == padded
    }

    pub fn set_name(&mut self, name: &[u8]) {
        self.name = [0; NAME_MAX_LEN];
        let n = name.len().min(NAME_MAX_LEN);
        self.name[..n].copy_from_slice(&name[..n]);
    }

    /// Decode a 32-byte record. `wide` selects the V2 (u16 start_page / u32
    /// size) layout; otherwise the V1 (u8 / u16) layout is used.
    pub fn decode(bytes: &[u8], wide: bool) -> DirEntry {
        debug_assert_eq!(bytes.len(), ENTRY_SIZE);

        let flags = bytes[0];
        let mut name = [0u8; NAME_MAX_LEN];
        name.copy_from_slice(&bytes[1..17]);

        let (start_page, size, year, month, day, weekday, hours, minutes, seconds) = if wide {
            let start_page = mach::read_u16(&bytes[17..19]) as u32;
            let size = mach::read_u32(&bytes[19..23]) as u64;
            (
                start_page,
                size,
                [bytes[23], bytes[24]],
                bytes[25],
                bytes[26],
                bytes[27],
                bytes[28],
                bytes[29],
                bytes[30],
            )
        } else {
            let start_page = bytes[17] as u32;
            let size = mach::read_u16(&bytes[18..20]) as u64;
            (
                start_page,
                size,
                [bytes[20], bytes[21]],
                bytes[22],
                bytes[23],
                bytes[24],
                bytes[25],
                bytes[26],
                bytes[27],
            )
        };

        DirEntry {
            flags,
            name,
            start_page,
            size,
            timestamp: Timestamp::from_bcd_fields(year, month, day, weekday, hours, minutes, seconds),
        }
    }

    /// Encode back into a 32-byte record, zeroing the reserved trailer.
    pub fn encode(&self, out: &mut [u8], wide: bool) {
        debug_assert_eq!(out.len(), ENTRY_SIZE);

        out.fill(0);
        out[0] = self.flags;
        out[1..17].copy_from_slice(&self.name);

        let (year, month, day, weekday, hours, minutes, seconds) = self.timestamp.to_bcd_fields();

        if wide {
            mach::write_u16(&mut out[17..19], self.start_page as u16);
            mach::write_u32(&mut out[19..23], self.size as u32);
            out[23] = year[0];
            out[24] = year[1];
            out[25] = month;
            out[26] = day;
            out[27] = weekday;
            out[28] = hours;
            out[29] = minutes;
            out[30] = seconds;
        } else {
            out[17] = self.start_page as u8;
            mach::write_u16(&mut out[18..20], self.size as u16);
            out[20] = year[0];
            out[21] = year[1];
            out[22] = month;
            out[23] = day;
            out[24] = weekday;
            out[25] = hours;
            out[26] = minutes;
            out[27] = seconds;
        }
    }
}

/// A POSIX-like status record, the in-memory analogue of `stat_from_entry`'s
/// `struct stat` in zealfs_v1.c/zealfs_v2.c. The mode bits are left at the
/// fixed `0o777`; it is the external adapter's job to OR in `S_IFDIR`/`S_IFREG`
/// (this crate has no reason to depend on `libc::mode_t`).
#[derive(Debug, Clone, Copy)]
pub struct FileStat {
    pub is_dir: bool,
    pub size: u64,
    pub nlink: u32,
    pub mode_bits: u32,
    pub mtime: std::time::SystemTime,
    pub atime: std::time::SystemTime,
    pub ctime: std::time::SystemTime,
}

pub fn stat_from_entry(entry: &DirEntry, page_size: usize) -> FileStat {
    let time = entry.timestamp.to_system_time();
    FileStat {
        is_dir: entry.is_dir(),
        size: if entry.is_dir() {
            page_size as u64
        } else {
            entry.size
        },
        nlink: if entry.is_dir() { 2 } else { 1 },
        mode_bits: 0o777,
        mtime: time,
        atime: time,
        ctime: time,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode_decode_round_trip_v1() {
        let mut entry = DirEntry::empty();
        entry.flags = FLAG_OCCUPIED;
        entry.set_name(b"hello.txt");
        entry.start_page = 7;
        entry.size = 1234;
        entry.timestamp = Timestamp::now();

        let mut buf = [0u8; ENTRY_SIZE];
        entry.encode(&mut buf, false);
        let decoded = DirEntry::decode(&buf, false);

        assert_eq!(decoded.flags, entry.flags);
        assert_eq!(decoded.name_bytes(), b"hello.txt");
        assert_eq!(decoded.start_page, 7);
        assert_eq!(decoded.size, 1234);
    }

    #[test]
    fn encode_decode_round_trip_v2() {
        let mut entry = DirEntry::empty();
        entry.flags = FLAG_OCCUPIED | FLAG_IS_DIR;
        entry.set_name(b"subdir");
        entry.start_page = 70000 % 65536;
        entry.size = 5_000_000;

        let mut buf = [0u8; ENTRY_SIZE];
        entry.encode(&mut buf, true);
        let decoded = DirEntry::decode(&buf, true);

        assert_eq!(decoded.start_page, entry.start_page);
        assert_eq!(decoded.size, entry.size);
        assert!(decoded.is_dir());
    }

    #[test]
    fn name_exactly_sixteen_bytes_has_no_null_terminator() {
        let mut entry = DirEntry::empty();
        entry.set_name(b"1234567890123456");
        assert_eq!(entry.name_bytes().len(), 16);
    }
}
