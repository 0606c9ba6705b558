// src/encode.rs

use crate::decode::{
    ADDITIONAL_1BYTE, ADDITIONAL_2BYTE, ADDITIONAL_4BYTE, ADDITIONAL_8BYTE,
    ADDITIONAL_INDEFINITE, MAJOR_ARRAY, MAJOR_BSTR, MAJOR_MAP, MAJOR_NINT, MAJOR_SPECIAL,
    MAJOR_STR, MAJOR_TAG, MAJOR_UINT, SIMPLE_FALSE, SIMPLE_NULL, SIMPLE_TRUE, SIMPLE_UNDEFINED,
};
use crate::endian;
use crate::error::Error;
use crate::item::{Item, ItemKind, Value};
use crate::tree::{NodeId, Tree};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Mode {
    /// Definite items only; container children are serialized in the
    /// same call via their links.
    Encode,
    /// Containers and indefinite strings emit their header alone; the
    /// caller streams children and the stop code.
    Streamed,
}

/// Serializer writing into a caller-supplied buffer.
///
/// Every emission is bounds-checked; a short buffer yields
/// [`Error::UnexpectedEnd`] with the cursor left at the failure point,
/// and the partial output must be discarded.
#[derive(Debug)]
pub struct Encoder<'o> {
    mode: Mode,
    out: &'o mut [u8],
    pos: usize,
}

impl<'o> Encoder<'o> {
    pub fn new(out: &'o mut [u8]) -> Self {
        Encoder {
            mode: Mode::Encode,
            out,
            pos: 0,
        }
    }

    pub fn new_streamed(out: &'o mut [u8]) -> Self {
        Encoder {
            mode: Mode::Streamed,
            out,
            pos: 0,
        }
    }

    /// Bytes emitted so far.
    pub fn bytes_written(&self) -> usize {
        self.pos
    }

    /// The encoded prefix of the output buffer.
    pub fn encoded(&self) -> &[u8] {
        &self.out[..self.pos]
    }

    /// Serializes one standalone item or stream token.
    ///
    /// Definite containers with elements, and tags, carry their children
    /// in a [`Tree`]; standalone they can only be emitted in streamed
    /// mode (the caller following up with the children) or with a length
    /// of zero. Use [`Encoder::encode_tree`] for complete graphs.
    pub fn encode(&mut self, item: &Item<'_>) -> Result<(), Error> {
        self.encode_entry(item, None)
    }

    /// Serializes a composed item graph depth-first, children in link
    /// order. In streamed mode only headers are emitted, matching
    /// [`Encoder::encode`].
    pub fn encode_tree(&mut self, tree: &Tree<'_, '_>, id: NodeId) -> Result<(), Error> {
        self.encode_entry(tree.item(id), Some((tree, id)))
    }

    fn encode_entry(
        &mut self,
        item: &Item<'_>,
        link: Option<(&Tree<'_, '_>, NodeId)>,
    ) -> Result<(), Error> {
        match item.value {
            Value::Uint(value) => self.emit_uint(MAJOR_UINT, value),

            // `raw` already is the wire form `-1 - int`.
            Value::Nint { raw, .. } => self.emit_uint(MAJOR_NINT, raw),

            Value::Bytes { data, .. } => self.encode_string(MAJOR_BSTR, data, item),
            Value::Text { data, .. } => self.encode_string(MAJOR_STR, data, item),

            Value::Array(_) | Value::Map(_) => {
                let is_map = item.kind() == ItemKind::Map;
                let major = if is_map { MAJOR_MAP } else { MAJOR_ARRAY };

                if item.is_indefinite() {
                    if self.mode == Mode::Encode {
                        return Err(Error::CannotEncodeIndefinite);
                    }
                    return self.emit_header(major, ADDITIONAL_INDEFINITE);
                }

                let slots = item.length;
                let written_len = if is_map {
                    if slots % 2 != 0 {
                        return Err(Error::KeyValueMismatch);
                    }
                    slots / 2
                } else {
                    slots
                };
                self.emit_uint(major, written_len as u64)?;

                if self.mode == Mode::Encode && slots > 0 {
                    let (tree, id) = link.ok_or(Error::MissingChild)?;
                    let mut current = tree.node(id).child();
                    for _ in 0..slots {
                        let child = current.ok_or(Error::MissingChild)?;
                        self.encode_entry(tree.item(child), Some((tree, child)))?;
                        current = tree.node(child).next();
                    }
                }
                Ok(())
            }

            Value::Tag { number, .. } => {
                self.emit_uint(MAJOR_TAG, number)?;
                if self.mode == Mode::Encode {
                    let (tree, id) = link.ok_or(Error::MissingChild)?;
                    let child = tree.node(id).child().ok_or(Error::MissingChild)?;
                    self.encode_entry(tree.item(child), Some((tree, child)))?;
                }
                Ok(())
            }

            Value::StopCode => self.emit_header(MAJOR_SPECIAL, ADDITIONAL_INDEFINITE),

            Value::Fp32(value) => {
                self.emit_header(MAJOR_SPECIAL, ADDITIONAL_4BYTE)?;
                self.need(4)?;
                endian::write_f32(&mut self.out[self.pos..], value);
                self.pos += 4;
                Ok(())
            }

            Value::Fp64(value) => {
                self.emit_header(MAJOR_SPECIAL, ADDITIONAL_8BYTE)?;
                self.need(8)?;
                endian::write_f64(&mut self.out[self.pos..], value);
                self.pos += 8;
                Ok(())
            }

            Value::Bool(value) => {
                let simple = if value { SIMPLE_TRUE } else { SIMPLE_FALSE };
                self.emit_header(MAJOR_SPECIAL, simple as u8)
            }

            Value::Null => self.emit_header(MAJOR_SPECIAL, SIMPLE_NULL as u8),

            Value::Undefined => self.emit_header(MAJOR_SPECIAL, SIMPLE_UNDEFINED as u8),

            Value::None => Err(Error::TypeMismatch),
        }
    }

    fn encode_string(&mut self, major: u8, data: &[u8], item: &Item<'_>) -> Result<(), Error> {
        if item.is_indefinite() {
            if self.mode == Mode::Encode {
                return Err(Error::CannotEncodeIndefinite);
            }
            // Header only; the caller streams definite chunks and the
            // stop code.
            return self.emit_header(major, ADDITIONAL_INDEFINITE);
        }

        self.emit_uint(major, item.length as u64)?;
        if self.mode == Mode::Encode && item.length > 0 {
            self.need(data.len())?;
            self.out[self.pos..self.pos + data.len()].copy_from_slice(data);
            self.pos += data.len();
        }
        Ok(())
    }

    /// Writes `(major, value)` with the shortest header form: the value
    /// immediate in the additional bits up to 23, else a 1/2/4/8-byte
    /// big-endian payload.
    fn emit_uint(&mut self, major: u8, value: u64) -> Result<(), Error> {
        let (additional, width) = if value < 24 {
            (value as u8, 0)
        } else if value <= 0xff {
            (ADDITIONAL_1BYTE, 1)
        } else if value <= 0xffff {
            (ADDITIONAL_2BYTE, 2)
        } else if value <= 0xffff_ffff {
            (ADDITIONAL_4BYTE, 4)
        } else {
            (ADDITIONAL_8BYTE, 8)
        };

        self.need(1 + width)?;
        self.out[self.pos] = (major << 5) | (additional & 0x1f);
        self.pos += 1;
        if width > 0 {
            endian::write_uint(&mut self.out[self.pos..], value, width);
            self.pos += width;
        }
        Ok(())
    }

    fn emit_header(&mut self, major: u8, additional: u8) -> Result<(), Error> {
        self.need(1)?;
        self.out[self.pos] = (major << 5) | (additional & 0x1f);
        self.pos += 1;
        Ok(())
    }

    fn need(&self, n: usize) -> Result<(), Error> {
        if self.out.len() - self.pos < n {
            return Err(Error::UnexpectedEnd);
        }
        Ok(())
    }
}
