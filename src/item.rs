// src/item.rs

use crate::decode::Decoder;
use crate::error::Error;

/// Item families. The first eight mirror the wire major types; the rest
/// are translations of major type 7. `StopCode` exists only so the
/// streamed encoder can emit the 0xFF terminator; `None` is the
/// uninitialized value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ItemKind {
    None,
    Uint,
    Nint,
    Bytes,
    Text,
    Array,
    Map,
    Tag,
    Fp32,
    Fp64,
    Bool,
    Null,
    Undefined,
    StopCode,
}

/// The decoded or constructed payload of an item. Variants carry only
/// what their family needs; byte ranges borrow the decode buffer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value<'b> {
    None,
    Uint(u64),
    /// `raw` is the wire form `|v| - 1`; `int` the semantic `-1 - raw`.
    Nint { raw: u64, int: i64 },
    /// Definite: `data` is the payload, `chunks == 0`.
    /// Indefinite: `data` spans the chunk sequence (stop code excluded).
    Bytes { data: &'b [u8], chunks: usize },
    Text { data: &'b [u8], chunks: usize },
    /// Wire region of the children, starting at the first child byte.
    Array(&'b [u8]),
    Map(&'b [u8]),
    /// `content` starts at the tagged child's header byte.
    Tag { number: u64, content: &'b [u8] },
    Fp32(f32),
    Fp64(f64),
    Bool(bool),
    Null,
    Undefined,
    StopCode,
}

/// A single CBOR item.
///
/// `size` is the full serialized length (header plus payload plus, for
/// containers, all children); `length` is the semantic length (payload
/// bytes for strings, element count for arrays, key/value slots for
/// maps, 1 for tags). Items built by the constructors below have
/// `size == 0` until they pass through the encoder.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item<'b> {
    pub value: Value<'b>,
    pub(crate) size: usize,
    pub(crate) length: usize,
    pub(crate) indefinite: bool,
}

macro_rules! uint_accessor {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self) -> Result<$ty, Error> {
            match self.value {
                Value::Uint(raw) => {
                    if self.size.saturating_sub(1) > core::mem::size_of::<$ty>() {
                        return Err(Error::ValueOverflow);
                    }
                    Ok(raw as $ty)
                }
                _ => Err(Error::TypeMismatch),
            }
        }
    };
}

macro_rules! int_accessor {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self) -> Result<$ty, Error> {
            match self.value {
                Value::Nint { int, .. } => {
                    if self.size.saturating_sub(1) > core::mem::size_of::<$ty>() {
                        return Err(Error::ValueOverflow);
                    }
                    Ok(int as $ty)
                }
                _ => Err(Error::TypeMismatch),
            }
        }
    };
}

impl<'b> Item<'b> {
    /// The zero item.
    pub const NONE: Item<'static> = Item {
        value: Value::None,
        size: 0,
        length: 0,
        indefinite: false,
    };

    pub(crate) const fn new(value: Value<'b>) -> Self {
        Item {
            value,
            size: 0,
            length: 0,
            indefinite: false,
        }
    }

    // ------------------------------------------------------------------
    // Builders. All are total; the resulting item is well formed for the
    // encoder (size stays 0 until serialization).
    // ------------------------------------------------------------------

    pub const fn uint(value: u64) -> Self {
        Item::new(Value::Uint(value))
    }

    /// Signed constructor; dispatches on sign (CBOR has no signed major
    /// type, negatives travel as `-1 - raw`).
    pub const fn int(value: i64) -> Self {
        if value >= 0 {
            Item::new(Value::Uint(value as u64))
        } else {
            Item::new(Value::Nint {
                raw: (-1 - value) as u64,
                int: value,
            })
        }
    }

    pub const fn bytes(data: &'b [u8]) -> Self {
        let mut item = Item::new(Value::Bytes { data, chunks: 0 });
        item.length = data.len();
        item
    }

    pub const fn text(data: &'b str) -> Self {
        let mut item = Item::new(Value::Text {
            data: data.as_bytes(),
            chunks: 0,
        });
        item.length = data.len();
        item
    }

    pub const fn fp32(value: f32) -> Self {
        Item::new(Value::Fp32(value))
    }

    pub const fn fp64(value: f64) -> Self {
        Item::new(Value::Fp64(value))
    }

    pub const fn bool(value: bool) -> Self {
        Item::new(Value::Bool(value))
    }

    pub const fn null() -> Self {
        Item::new(Value::Null)
    }

    pub const fn undefined() -> Self {
        Item::new(Value::Undefined)
    }

    /// The indefinite terminator, for streamed encoding.
    pub const fn stop_code() -> Self {
        Item::new(Value::StopCode)
    }

    /// A tag header without a linked child; the streamed encoder emits
    /// the header and the caller encodes the child next. For complete
    /// graphs use [`crate::Tree::tag`].
    pub const fn tag_token(number: u64) -> Self {
        let mut item = Item::new(Value::Tag {
            number,
            content: &[],
        });
        item.length = 1;
        item
    }

    /// An array header for `len` elements. Without linked children this
    /// only encodes in streamed mode (or with `len == 0`).
    pub const fn array_token(len: usize) -> Self {
        let mut item = Item::new(Value::Array(&[]));
        item.length = len;
        item
    }

    pub const fn indefinite_array_token() -> Self {
        let mut item = Item::new(Value::Array(&[]));
        item.indefinite = true;
        item
    }

    /// A map header for `pairs` key/value pairs (`length` counts slots,
    /// so it is `2 * pairs`).
    pub const fn map_token(pairs: usize) -> Self {
        let mut item = Item::new(Value::Map(&[]));
        item.length = pairs * 2;
        item
    }

    pub const fn indefinite_map_token() -> Self {
        let mut item = Item::new(Value::Map(&[]));
        item.indefinite = true;
        item
    }

    /// Header of an indefinite byte string; the caller streams definite
    /// chunks and a stop code after it.
    pub const fn indefinite_bytes_token() -> Self {
        let mut item = Item::new(Value::Bytes {
            data: &[],
            chunks: 0,
        });
        item.indefinite = true;
        item
    }

    pub const fn indefinite_text_token() -> Self {
        let mut item = Item::new(Value::Text {
            data: &[],
            chunks: 0,
        });
        item.indefinite = true;
        item
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub const fn kind(&self) -> ItemKind {
        match self.value {
            Value::None => ItemKind::None,
            Value::Uint(_) => ItemKind::Uint,
            Value::Nint { .. } => ItemKind::Nint,
            Value::Bytes { .. } => ItemKind::Bytes,
            Value::Text { .. } => ItemKind::Text,
            Value::Array(_) => ItemKind::Array,
            Value::Map(_) => ItemKind::Map,
            Value::Tag { .. } => ItemKind::Tag,
            Value::Fp32(_) => ItemKind::Fp32,
            Value::Fp64(_) => ItemKind::Fp64,
            Value::Bool(_) => ItemKind::Bool,
            Value::Null => ItemKind::Null,
            Value::Undefined => ItemKind::Undefined,
            Value::StopCode => ItemKind::StopCode,
        }
    }

    /// Serialized size in bytes, header included. Zero for items that
    /// were built rather than decoded.
    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn is_indefinite(&self) -> bool {
        self.indefinite
    }

    /// Semantic length: payload bytes for strings, element count for
    /// arrays, pair count for maps. Other kinds have no length.
    pub fn length(&self) -> Result<usize, Error> {
        match self.kind() {
            ItemKind::Bytes | ItemKind::Text | ItemKind::Array => Ok(self.length),
            ItemKind::Map => Ok(self.length / 2),
            _ => Err(Error::TypeMismatch),
        }
    }

    // ------------------------------------------------------------------
    // Integers. The width check is against the encoded payload, not the
    // numeric value: a `u16`-encoded 5 does not fit `as_u8`.
    // ------------------------------------------------------------------

    uint_accessor!(as_u8, u8);
    uint_accessor!(as_u16, u16);
    uint_accessor!(as_u32, u32);
    uint_accessor!(as_u64, u64);

    int_accessor!(as_i8, i8);
    int_accessor!(as_i16, i16);
    int_accessor!(as_i32, i32);
    int_accessor!(as_i64, i64);

    // ------------------------------------------------------------------
    // Floats, bool, tag
    // ------------------------------------------------------------------

    pub fn as_f32(&self) -> Result<f32, Error> {
        match self.value {
            Value::Fp32(v) => Ok(v),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn as_f64(&self) -> Result<f64, Error> {
        match self.value {
            Value::Fp64(v) => Ok(v),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self.value {
            Value::Bool(v) => Ok(v),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn tag_number(&self) -> Result<u64, Error> {
        match self.value {
            Value::Tag { number, .. } => Ok(number),
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Re-decodes the tagged child from its wire position.
    pub fn tag_item(&self) -> Result<Item<'b>, Error> {
        match self.value {
            Value::Tag { content, .. } => {
                Decoder::new(content).decode().map_err(at_end_is_invalid)
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// The borrowed payload of a definite byte string.
    pub fn as_bytes(&self) -> Result<&'b [u8], Error> {
        match self.value {
            Value::Bytes { data, .. } => {
                if self.indefinite {
                    return Err(Error::StringIsChunked);
                }
                Ok(data)
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    /// The borrowed payload of a definite text string. The codec does
    /// not validate UTF-8; the raw byte range is returned.
    pub fn as_text(&self) -> Result<&'b [u8], Error> {
        match self.value {
            Value::Text { data, .. } => {
                if self.indefinite {
                    return Err(Error::StringIsChunked);
                }
                Ok(data)
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Number of chunks of an indefinite string.
    pub fn chunk_count(&self) -> Result<usize, Error> {
        match self.value {
            Value::Bytes { chunks, .. } | Value::Text { chunks, .. } => {
                if !self.indefinite {
                    return Err(Error::StringNotChunked);
                }
                Ok(chunks)
            }
            _ => Err(Error::TypeMismatch),
        }
    }

    /// Re-decodes the `index`-th chunk of an indefinite string. Chunks
    /// are located linearly from the stored chunk region.
    pub fn chunk(&self, index: usize) -> Result<Item<'b>, Error> {
        let (region, chunks) = match self.value {
            Value::Bytes { data, chunks } | Value::Text { data, chunks } => (data, chunks),
            _ => return Err(Error::TypeMismatch),
        };
        if !self.indefinite {
            return Err(Error::StringNotChunked);
        }
        if index >= chunks {
            return Err(Error::IndexOutOfBounds);
        }

        let mut decoder = Decoder::new(region);
        let mut chunk = Item::NONE;
        for _ in 0..=index {
            chunk = decoder.decode().map_err(at_end_is_invalid)?;
        }

        if chunk.kind() != self.kind() {
            return Err(Error::ChunkTypeMismatch);
        }
        if chunk.is_indefinite() {
            return Err(Error::NestedIndefiniteString);
        }
        Ok(chunk)
    }

    // ------------------------------------------------------------------
    // Containers. Items decoded without a tree pool carry no links, so
    // child access re-decodes the stored wire region.
    // ------------------------------------------------------------------

    /// Re-decodes the `index`-th element of an array.
    pub fn array_item(&self, index: usize) -> Result<Item<'b>, Error> {
        let region = match self.value {
            Value::Array(region) => region,
            _ => return Err(Error::TypeMismatch),
        };
        if index >= self.length {
            return Err(Error::IndexOutOfBounds);
        }

        let mut decoder = Decoder::new(region);
        let mut item = Item::NONE;
        for _ in 0..=index {
            item = decoder.decode().map_err(at_end_is_invalid)?;
        }
        Ok(item)
    }

    /// Re-decodes the `index`-th key/value pair of a map.
    pub fn map_item(&self, index: usize) -> Result<(Item<'b>, Item<'b>), Error> {
        let region = match self.value {
            Value::Map(region) => region,
            _ => return Err(Error::TypeMismatch),
        };
        if index * 2 >= self.length {
            return Err(Error::IndexOutOfBounds);
        }

        let mut decoder = Decoder::new(region);
        let mut key = Item::NONE;
        let mut value = Item::NONE;
        for _ in 0..=index {
            key = decoder.decode().map_err(at_end_is_invalid)?;
            value = decoder.decode().map_err(at_end_is_invalid)?;
        }
        Ok((key, value))
    }
}

/// A clean end-of-buffer from a sub-decode means the recorded length
/// overruns the stored region, which is malformed, not a clean end.
fn at_end_is_invalid(err: Error) -> Error {
    match err {
        Error::EndOfBuffer => Error::UnexpectedEnd,
        other => other,
    }
}
