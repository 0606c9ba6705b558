//! Big-endian wire conversions for integer and IEEE-754 payloads.
//! All multi-byte CBOR payloads are network order; floats travel as the
//! bit pattern of the same-width unsigned integer.

use byteorder::{BigEndian, ByteOrder};

/// Reads a `width`-byte big-endian unsigned integer from the front of
/// `bytes`. `width` must be 1, 2, 4 or 8 and `bytes` at least that long.
#[inline]
pub(crate) fn read_uint(bytes: &[u8], width: usize) -> u64 {
    BigEndian::read_uint(bytes, width)
}

/// Writes `value` as a `width`-byte big-endian integer into `bytes`.
#[inline]
pub(crate) fn write_uint(bytes: &mut [u8], value: u64, width: usize) {
    BigEndian::write_uint(bytes, value, width);
}

#[inline]
pub(crate) fn read_u16(bytes: &[u8]) -> u16 {
    BigEndian::read_u16(bytes)
}

#[inline]
pub(crate) fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_bits(BigEndian::read_u32(bytes))
}

#[inline]
pub(crate) fn read_f64(bytes: &[u8]) -> f64 {
    f64::from_bits(BigEndian::read_u64(bytes))
}

#[inline]
pub(crate) fn write_f32(bytes: &mut [u8], value: f32) {
    BigEndian::write_u32(bytes, value.to_bits());
}

#[inline]
pub(crate) fn write_f64(bytes: &mut [u8], value: f64) {
    BigEndian::write_u64(bytes, value.to_bits());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_widths() {
        assert_eq!(read_uint(&[0xab], 1), 0xab);
        assert_eq!(read_uint(&[0x12, 0x34], 2), 0x1234);
        assert_eq!(read_uint(&[0x00, 0x0f, 0x42, 0x3f], 4), 999_999);
        assert_eq!(
            read_uint(&[0x00, 0x00, 0x00, 0xe8, 0xd4, 0xa5, 0x10, 0x00], 8),
            1_000_000_000_000
        );
    }

    #[test]
    fn uint_write_read() {
        let mut buf = [0u8; 8];
        for &(value, width) in &[(0x17u64, 1usize), (0x1234, 2), (0xdead_beef, 4), (u64::MAX, 8)] {
            write_uint(&mut buf[..width], value, width);
            assert_eq!(read_uint(&buf[..width], width), value);
        }
    }

    #[test]
    fn float_bit_patterns() {
        // 100000.0f32 is 0x47C35000 on the wire.
        assert_eq!(read_f32(&[0x47, 0xc3, 0x50, 0x00]), 100_000.0);

        let mut buf = [0u8; 4];
        write_f32(&mut buf, 100_000.0);
        assert_eq!(buf, [0x47, 0xc3, 0x50, 0x00]);

        let mut buf = [0u8; 8];
        write_f64(&mut buf, 1363896240.5);
        assert_eq!(read_f64(&buf), 1363896240.5);
        assert_eq!(buf, [0x41, 0xd4, 0x52, 0xd9, 0xec, 0x20, 0x00, 0x00]);
    }
}
