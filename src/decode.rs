// src/decode.rs

use half::f16;

use crate::endian;
use crate::error::Error;
use crate::item::{Item, ItemKind, Value};

/// Major types, per the wire format (top three header bits).
pub(crate) const MAJOR_UINT: u8 = 0;
pub(crate) const MAJOR_NINT: u8 = 1;
pub(crate) const MAJOR_BSTR: u8 = 2;
pub(crate) const MAJOR_STR: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;
pub(crate) const MAJOR_SPECIAL: u8 = 7;

/// Additional-information values with payload widths.
pub(crate) const ADDITIONAL_1BYTE: u8 = 24;
pub(crate) const ADDITIONAL_2BYTE: u8 = 25;
pub(crate) const ADDITIONAL_4BYTE: u8 = 26;
pub(crate) const ADDITIONAL_8BYTE: u8 = 27;
pub(crate) const ADDITIONAL_INDEFINITE: u8 = 31;

/// Simple values under major type 7.
pub(crate) const SIMPLE_FALSE: u64 = 20;
pub(crate) const SIMPLE_TRUE: u64 = 21;
pub(crate) const SIMPLE_NULL: u64 = 22;
pub(crate) const SIMPLE_UNDEFINED: u64 = 23;

/// Hard cap on definite-container nesting in non-streamed mode, where
/// the decoder recurses to size children. Adversarial inputs can nest a
/// container per byte, so the cap bounds stack use. Tree decoding is
/// iterative and not subject to this limit.
pub const MAX_DECODE_DEPTH: usize = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Container children are walked to compute sizes; the cursor lands
    /// after the whole item.
    Decode,
    /// Containers record only their header; the cursor lands on the
    /// first child.
    Streamed,
}

/// One-shot streaming decoder over a borrowed buffer.
///
/// Each [`Decoder::decode`] call reads exactly one item at the cursor.
/// Decoded items borrow the input; the decoder never copies payloads.
#[derive(Debug)]
pub struct Decoder<'b> {
    mode: Mode,
    input: &'b [u8],
    pos: usize,
}

impl<'b> Decoder<'b> {
    /// Decoder that fully sizes each item, nested children included.
    pub fn new(input: &'b [u8]) -> Self {
        Decoder {
            mode: Mode::Decode,
            input,
            pos: 0,
        }
    }

    /// Decoder that stops at container headers, leaving the cursor on
    /// the first child. Indefinite strings are still walked whole (their
    /// chunks are not separate items).
    pub fn new_streamed(input: &'b [u8]) -> Self {
        Decoder {
            mode: Mode::Streamed,
            input,
            pos: 0,
        }
    }

    /// Cursor offset from the start of the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn bytes_left(&self) -> usize {
        self.input.len() - self.pos
    }

    /// Decodes the next item.
    ///
    /// `Err(EndOfBuffer)` on an empty cursor is the clean loop
    /// terminator. A stop code at this boundary has no enclosing
    /// indefinite container and is reported as `UnexpectedStopCode`.
    pub fn decode(&mut self) -> Result<Item<'b>, Error> {
        match self.decode_next(None, 0) {
            Err(Error::EndOfIndefinite) => Err(Error::UnexpectedStopCode),
            other => other,
        }
    }

    /// Reads one item at the cursor. `chunk_of` is set while walking the
    /// chunks of an indefinite string and carries the enclosing string's
    /// kind; `depth` counts definite-container recursion.
    pub(crate) fn decode_next(
        &mut self,
        chunk_of: Option<ItemKind>,
        depth: usize,
    ) -> Result<Item<'b>, Error> {
        if self.bytes_left() == 0 {
            return Err(Error::EndOfBuffer);
        }

        let header = self.input[self.pos];
        let major = header >> 5;
        let additional = header & 0x1f;
        self.pos += 1;

        // Chunks must repeat the enclosing string's major type; anything
        // else is either the terminator or a framing error. Bail before
        // parsing so a malformed indefinite string cannot recurse.
        if let Some(expected) = chunk_of {
            let expected_major = match expected {
                ItemKind::Bytes => MAJOR_BSTR,
                _ => MAJOR_STR,
            };
            if major != expected_major {
                if major == MAJOR_SPECIAL && additional == ADDITIONAL_INDEFINITE {
                    return Err(Error::EndOfIndefinite);
                }
                return Err(Error::ChunkTypeMismatch);
            }
        }

        match major {
            MAJOR_UINT => {
                let (value, size) = self.read_uint_payload(additional)?;
                let mut item = Item::new(Value::Uint(value));
                item.size = size;
                Ok(item)
            }

            MAJOR_NINT => {
                let (raw, size) = self.read_uint_payload(additional)?;
                let mut item = Item::new(Value::Nint {
                    raw,
                    int: (-1i64).wrapping_sub(raw as i64),
                });
                item.size = size;
                Ok(item)
            }

            MAJOR_BSTR | MAJOR_STR => {
                self.decode_string(major, additional, chunk_of.is_some(), depth)
            }

            MAJOR_ARRAY | MAJOR_MAP => self.decode_container(major, additional, depth),

            MAJOR_TAG => self.decode_tag(additional, depth),

            MAJOR_SPECIAL => self.decode_special(additional),

            // A three-bit major type cannot reach here.
            _ => Err(Error::Unknown),
        }
    }

    /// Reads the unsigned payload selected by `additional` and returns
    /// `(value, header size)`, the size counting the header byte itself.
    fn read_uint_payload(&mut self, additional: u8) -> Result<(u64, usize), Error> {
        if additional < ADDITIONAL_1BYTE {
            return Ok((additional as u64, 1));
        }
        let width = match additional {
            ADDITIONAL_1BYTE => 1,
            ADDITIONAL_2BYTE => 2,
            ADDITIONAL_4BYTE => 4,
            ADDITIONAL_8BYTE => 8,
            _ => return Err(Error::InvalidAdditional),
        };
        if self.bytes_left() < width {
            return Err(Error::UnexpectedEnd);
        }
        let value = endian::read_uint(&self.input[self.pos..], width);
        self.pos += width;
        Ok((value, 1 + width))
    }

    fn decode_string(
        &mut self,
        major: u8,
        additional: u8,
        is_chunk: bool,
        depth: usize,
    ) -> Result<Item<'b>, Error> {
        let kind = if major == MAJOR_BSTR {
            ItemKind::Bytes
        } else {
            ItemKind::Text
        };

        if additional == ADDITIONAL_INDEFINITE {
            if is_chunk {
                return Err(Error::NestedIndefiniteString);
            }

            let region_start = self.pos;
            let mut size = 1usize;
            let mut length = 0usize;
            let mut chunks = 0usize;

            loop {
                match self.decode_next(Some(kind), depth) {
                    Ok(chunk) => {
                        size += chunk.size;
                        length += chunk.length;
                        chunks += 1;
                    }
                    Err(Error::EndOfIndefinite) => {
                        // Meter the stop code.
                        size += 1;
                        break;
                    }
                    Err(Error::EndOfBuffer) => return Err(Error::UnexpectedEnd),
                    Err(err) => return Err(err),
                }
            }

            // The chunk region spans every chunk, stop code excluded.
            let data = &self.input[region_start..self.pos - 1];
            let mut item = Item::new(match kind {
                ItemKind::Bytes => Value::Bytes { data, chunks },
                _ => Value::Text { data, chunks },
            });
            item.size = size;
            item.length = length;
            item.indefinite = true;
            Ok(item)
        } else {
            let (len, header_size) = self.read_uint_payload(additional)?;
            let len = usize::try_from(len).map_err(|_| Error::UnexpectedEnd)?;
            if self.bytes_left() < len {
                return Err(Error::UnexpectedEnd);
            }
            let data = &self.input[self.pos..self.pos + len];
            self.pos += len;

            let mut item = Item::new(match kind {
                ItemKind::Bytes => Value::Bytes { data, chunks: 0 },
                _ => Value::Text { data, chunks: 0 },
            });
            item.size = header_size + len;
            item.length = len;
            Ok(item)
        }
    }

    fn decode_container(
        &mut self,
        major: u8,
        additional: u8,
        depth: usize,
    ) -> Result<Item<'b>, Error> {
        let is_map = major == MAJOR_MAP;

        if additional == ADDITIONAL_INDEFINITE {
            let region_start = self.pos;

            if self.mode == Mode::Streamed {
                let mut item = Item::new(container_value(is_map, &self.input[region_start..]));
                item.size = 1;
                item.indefinite = true;
                return Ok(item);
            }

            if depth >= MAX_DECODE_DEPTH {
                return Err(Error::DepthExceeded);
            }

            let mut size = 1usize;
            let mut count = 0usize;
            loop {
                match self.decode_next(None, depth + 1) {
                    Ok(child) => {
                        size += child.size;
                        count += 1;
                    }
                    Err(Error::EndOfIndefinite) => {
                        size += 1;
                        break;
                    }
                    Err(Error::EndOfBuffer) => return Err(Error::UnexpectedEnd),
                    Err(err) => return Err(err),
                }
            }

            if is_map && count % 2 != 0 {
                return Err(Error::KeyValueMismatch);
            }

            let region = &self.input[region_start..self.pos - 1];
            let mut item = Item::new(container_value(is_map, region));
            item.size = size;
            item.length = count;
            item.indefinite = true;
            Ok(item)
        } else {
            let (len, header_size) = self.read_uint_payload(additional)?;
            let mut slots = usize::try_from(len).map_err(|_| Error::UnexpectedEnd)?;
            if is_map {
                // Children are counted in slots; the wire carries pairs.
                slots = slots.checked_mul(2).ok_or(Error::UnexpectedEnd)?;
            }
            let region_start = self.pos;

            if self.mode == Mode::Streamed {
                let mut item = Item::new(container_value(is_map, &self.input[region_start..]));
                item.size = header_size;
                item.length = slots;
                return Ok(item);
            }

            if depth >= MAX_DECODE_DEPTH {
                return Err(Error::DepthExceeded);
            }

            let mut size = header_size;
            for _ in 0..slots {
                match self.decode_next(None, depth + 1) {
                    Ok(child) => size += child.size,
                    Err(Error::EndOfIndefinite) => return Err(Error::UnexpectedStopCode),
                    Err(Error::EndOfBuffer) => return Err(Error::UnexpectedEnd),
                    Err(err) => return Err(err),
                }
            }

            let region = &self.input[region_start..self.pos];
            let mut item = Item::new(container_value(is_map, region));
            item.size = size;
            item.length = slots;
            Ok(item)
        }
    }

    fn decode_tag(&mut self, additional: u8, depth: usize) -> Result<Item<'b>, Error> {
        // Indefinite tags do not exist; additional 31 falls through to
        // the invalid-additional check.
        let (number, header_size) = self.read_uint_payload(additional)?;
        let region_start = self.pos;
        let mut size = header_size;

        if self.mode == Mode::Decode {
            if depth >= MAX_DECODE_DEPTH {
                return Err(Error::DepthExceeded);
            }
            let child = match self.decode_next(None, depth + 1) {
                Ok(child) => child,
                Err(Error::EndOfBuffer) => return Err(Error::UnexpectedEnd),
                Err(Error::EndOfIndefinite) => return Err(Error::UnexpectedStopCode),
                Err(err) => return Err(err),
            };
            size += child.size;
        }

        let content = if self.mode == Mode::Decode {
            &self.input[region_start..self.pos]
        } else {
            &self.input[region_start..]
        };

        let mut item = Item::new(Value::Tag { number, content });
        item.size = size;
        item.length = 1;
        Ok(item)
    }

    fn decode_special(&mut self, additional: u8) -> Result<Item<'b>, Error> {
        match additional {
            ADDITIONAL_INDEFINITE => Err(Error::EndOfIndefinite),

            0..=ADDITIONAL_1BYTE => {
                let (value, size) = self.read_uint_payload(additional)?;
                let mut item = Item::new(match value {
                    SIMPLE_FALSE => Value::Bool(false),
                    SIMPLE_TRUE => Value::Bool(true),
                    SIMPLE_NULL => Value::Null,
                    SIMPLE_UNDEFINED => Value::Undefined,
                    _ => return Err(Error::NotSupported),
                });
                item.size = size;
                Ok(item)
            }

            ADDITIONAL_2BYTE => {
                // Half float; widened to f32, bit-exact for every
                // binary16 value.
                if self.bytes_left() < 2 {
                    return Err(Error::UnexpectedEnd);
                }
                let bits = endian::read_u16(&self.input[self.pos..]);
                self.pos += 2;
                let mut item = Item::new(Value::Fp32(f16::from_bits(bits).to_f32()));
                item.size = 3;
                Ok(item)
            }

            ADDITIONAL_4BYTE => {
                if self.bytes_left() < 4 {
                    return Err(Error::UnexpectedEnd);
                }
                let value = endian::read_f32(&self.input[self.pos..]);
                self.pos += 4;
                let mut item = Item::new(Value::Fp32(value));
                item.size = 5;
                Ok(item)
            }

            ADDITIONAL_8BYTE => {
                if self.bytes_left() < 8 {
                    return Err(Error::UnexpectedEnd);
                }
                let value = endian::read_f64(&self.input[self.pos..]);
                self.pos += 8;
                let mut item = Item::new(Value::Fp64(value));
                item.size = 9;
                Ok(item)
            }

            // 28..=30 are unassigned.
            _ => Err(Error::NotSupported),
        }
    }
}

fn container_value(is_map: bool, region: &[u8]) -> Value<'_> {
    if is_map {
        Value::Map(region)
    } else {
        Value::Array(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_uint() {
        let mut dec = Decoder::new(&[0x17]);
        let item = dec.decode().unwrap();
        assert_eq!(item.as_u8(), Ok(23));
        assert_eq!(item.size(), 1);
        assert_eq!(dec.bytes_left(), 0);
    }

    #[test]
    fn simple_values() {
        assert_eq!(Decoder::new(&[0xf4]).decode().unwrap().as_bool(), Ok(false));
        assert_eq!(Decoder::new(&[0xf5]).decode().unwrap().as_bool(), Ok(true));
        assert_eq!(Decoder::new(&[0xf6]).decode().unwrap().kind(), ItemKind::Null);
        assert_eq!(
            Decoder::new(&[0xf7]).decode().unwrap().kind(),
            ItemKind::Undefined
        );
        // Simple value 16 is unassigned.
        assert_eq!(Decoder::new(&[0xf0]).decode(), Err(Error::NotSupported));
    }

    #[test]
    fn invalid_additional_bits() {
        // Additional 28 under major 0.
        assert_eq!(Decoder::new(&[0x1c]).decode(), Err(Error::InvalidAdditional));
        // Additional 31 under majors 0, 1 and 6.
        assert_eq!(Decoder::new(&[0x1f]).decode(), Err(Error::InvalidAdditional));
        assert_eq!(Decoder::new(&[0x3f]).decode(), Err(Error::InvalidAdditional));
        assert_eq!(Decoder::new(&[0xdf]).decode(), Err(Error::InvalidAdditional));
        // 28..=30 under major 7 are unassigned, not invalid framing.
        assert_eq!(Decoder::new(&[0xfc]).decode(), Err(Error::NotSupported));
    }

    #[test]
    fn half_float_widens_to_f32() {
        let item = Decoder::new(&[0xf9, 0x3c, 0x00]).decode().unwrap();
        assert_eq!(item.kind(), ItemKind::Fp32);
        assert_eq!(item.as_f32(), Ok(1.0));
        assert_eq!(item.size(), 3);

        let nan = Decoder::new(&[0xf9, 0x7e, 0x00]).decode().unwrap();
        assert!(nan.as_f32().unwrap().is_nan());
    }

    #[test]
    fn streamed_container_stops_at_header() {
        // [1, 2] — streamed decode leaves the cursor on the first child.
        let mut dec = Decoder::new_streamed(&[0x82, 0x01, 0x02]);
        let array = dec.decode().unwrap();
        assert_eq!(array.kind(), ItemKind::Array);
        assert_eq!(array.size(), 1);
        assert_eq!(dec.position(), 1);
        assert_eq!(dec.decode().unwrap().as_u8(), Ok(1));
        assert_eq!(dec.decode().unwrap().as_u8(), Ok(2));
        assert_eq!(dec.decode(), Err(Error::EndOfBuffer));
    }

    #[test]
    fn depth_cap_in_sizing_mode() {
        // 40 nested single-element arrays around a uint.
        let mut buf = [0x81u8; 41];
        buf[40] = 0x01;
        assert_eq!(Decoder::new(&buf).decode(), Err(Error::DepthExceeded));

        // Streamed mode does not recurse and is not capped.
        let mut dec = Decoder::new_streamed(&buf);
        for _ in 0..40 {
            assert_eq!(dec.decode().unwrap().kind(), ItemKind::Array);
        }
        assert_eq!(dec.decode().unwrap().as_u8(), Ok(1));
    }
}
