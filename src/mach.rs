// Functions related to encoding.
use byteorder::{ByteOrder, LittleEndian};

// The Zeal 8-bit OS stores every multi-byte on-disk field little-endian.
// The least significant byte is at the lowest address.
type E = LittleEndian;

pub fn read_u16(buf: &[u8]) -> u16 {
    E::read_u16(buf)
}

pub fn read_u32(buf: &[u8]) -> u32 {
    E::read_u32(buf)
}

pub fn write_u16(buf: &mut [u8], value: u16) {
    E::write_u16(buf, value)
}

pub fn write_u32(buf: &mut [u8], value: u32) {
    E::write_u32(buf, value)
}
