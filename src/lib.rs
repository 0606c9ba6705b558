#![no_std]

//! A `no_std`, zero-allocation CBOR (RFC 7049) codec.
//!
//! Decoding borrows the input buffer and never copies payloads; tree
//! decoding assembles a linked item graph in a caller-supplied node
//! pool. Encoding writes into a caller-supplied byte buffer, either
//! whole item graphs at once or item-by-item in streamed mode.
//!
//! ```
//! use picocbor::{Node, Tree};
//!
//! // {"a": 1, "b": [2, 3]}
//! let input = [0xa2, 0x61, 0x61, 0x01, 0x61, 0x62, 0x82, 0x02, 0x03];
//!
//! let mut nodes = [Node::EMPTY; 8];
//! let mut tree = Tree::new(&mut nodes);
//! let root = tree.decode(&input).unwrap();
//!
//! let (key, value) = tree.map_item(root, 1).unwrap();
//! assert_eq!(tree.item(key).as_text(), Ok(&b"b"[..]));
//! assert_eq!(tree.array_item(value, 0).map(|id| tree.item(id).as_u8()),
//!            Ok(Ok(2)));
//! ```

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod decode;
pub mod encode;
mod endian;
pub mod error;
pub mod item;
pub mod tree;

pub use decode::{Decoder, MAX_DECODE_DEPTH};
pub use encode::Encoder;
pub use error::Error;
pub use item::{Item, ItemKind, Value};
pub use tree::{Node, NodeId, Tree};

/// Decodes exactly one item from the front of `input`.
///
/// Convenience over [`Decoder::new`] + [`Decoder::decode`] for callers
/// that do not need the cursor afterwards. The item borrows `input`.
pub fn decode(input: &[u8]) -> Result<Item<'_>, Error> {
    Decoder::new(input).decode()
}
