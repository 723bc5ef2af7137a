//! Optional MBR partitioning for V2 images.
//!
//! Reference: `mbr.c`/`include/mbr.h`. A classic 512-byte MBR: four
//! 16-byte partition entries starting at offset 446, the `0x55AA`
//! signature at 510/511, and a custom partition type byte (`0x5A`, the
//! same value as the ZealFS magic) marking the one ZealFS partition the
//! original tooling cares about. `mbr_find_partition` also accepts a
//! raw, MBR-less image: if the signature is absent but the first byte is
//! still the ZealFS magic, the whole file is the partition.

use crate::mach;

pub const MBR_SIZE: usize = 512;
pub const SECTOR_SIZE: u64 = 512;
const PARTITION_TABLE_OFFSET: usize = 446;
const PARTITION_ENTRY_SIZE: usize = 16;
const PARTITION_COUNT: usize = 4;

const PARTITION_STATUS_OFFSET: usize = 0;
const PARTITION_TYPE_OFFSET: usize = 4;
const LBA_OFFSET: usize = 8;
const SECTOR_COUNT_OFFSET: usize = 12;

/// `TARGET_TYPE` in zealfs_v2.c: also the ZealFS magic byte, `'Z'`.
pub const PARTITION_TYPE: u8 = crate::header::MAGIC;

/// Build a 512-byte MBR with a single ZealFS partition entry.
/// `part_offset`/`part_size` must both be multiples of `SECTOR_SIZE`.
pub fn create(part_offset: u64, part_size: u64) -> Option<[u8; MBR_SIZE]> {
    if part_offset % SECTOR_SIZE != 0 || part_size % SECTOR_SIZE != 0 {
        return None;
    }

    let mut mbr = [0u8; MBR_SIZE];
    let entry = &mut mbr[PARTITION_TABLE_OFFSET..PARTITION_TABLE_OFFSET + PARTITION_ENTRY_SIZE];
    entry[PARTITION_STATUS_OFFSET] = 0x00;
    entry[PARTITION_TYPE_OFFSET] = PARTITION_TYPE;
    entry[5] = 0x00;
    entry[6] = 0x00;
    entry[7] = 0x00;

    let lba = (part_offset / SECTOR_SIZE) as u32;
    mach::write_u32(&mut entry[LBA_OFFSET..LBA_OFFSET + 4], lba);

    let sectors = (part_size / SECTOR_SIZE) as u32;
    mach::write_u32(
        &mut entry[SECTOR_COUNT_OFFSET..SECTOR_COUNT_OFFSET + 4],
        sectors,
    );

    mbr[510] = 0x55;
    mbr[511] = 0xAA;
    Some(mbr)
}

/// Locate the ZealFS partition in a file whose first `MBR_SIZE` bytes are
/// `first_sector`. Returns `(byte_offset, byte_size)`. Falls back to
/// treating the whole file as a raw, MBR-less ZealFS image when no MBR
/// signature is present but the magic byte still matches.
pub fn find_partition(first_sector: &[u8], file_size: u64) -> Option<(u64, u64)> {
    debug_assert!(first_sector.len() >= MBR_SIZE);

    if first_sector[510] != 0x55 || first_sector[511] != 0xAA {
        if first_sector[0] == PARTITION_TYPE {
            return Some((0, file_size));
        }
        return None;
    }

    for i in 0..PARTITION_COUNT {
        let entry_offset = PARTITION_TABLE_OFFSET + i * PARTITION_ENTRY_SIZE;
        let entry = &first_sector[entry_offset..entry_offset + PARTITION_ENTRY_SIZE];
        if entry[PARTITION_TYPE_OFFSET] != PARTITION_TYPE {
            continue;
        }
        let lba = mach::read_u32(&entry[LBA_OFFSET..LBA_OFFSET + 4]);
        let sectors = mach::read_u32(&entry[SECTOR_COUNT_OFFSET..SECTOR_COUNT_OFFSET + 4]);
        return Some((lba as u64 * SECTOR_SIZE, sectors as u64 * SECTOR_SIZE));
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_round_trips_through_find() {
        let mbr = create(SECTOR_SIZE * 2, SECTOR_SIZE * 64).unwrap();
        let (offset, size) = find_partition(&mbr, mbr.len() as u64).unwrap();
        assert_eq!(offset, SECTOR_SIZE * 2);
        assert_eq!(size, SECTOR_SIZE * 64);
    }

    #[test]
    fn rejects_misaligned_offsets() {
        assert!(create(100, SECTOR_SIZE).is_none());
        assert!(create(SECTOR_SIZE, 100).is_none());
    }

    #[test]
    fn raw_image_without_mbr_signature_is_detected() {
        let mut sector = [0u8; MBR_SIZE];
        sector[0] = PARTITION_TYPE;
        assert_eq!(find_partition(&sector, 32 * 1024).unwrap(), (0, 32 * 1024));
    }

    #[test]
    fn neither_mbr_nor_raw_magic_is_rejected() {
        let sector = [0u8; MBR_SIZE];
        assert!(find_partition(&sector, 32 * 1024).is_none());
    }
}
