// src/error.rs

/// Errors reported by the codec.
///
/// Every variant carries a stable numeric code (see [`Error::code`])
/// grouped by class: 1 internal, 20–29 missing-item, 30 mode, 50–59
/// bounds, 100–109 semantic, 200–201 control-flow sentinels. The codes
/// are kept stable so embedders that forward them over an FFI or wire
/// boundary do not break between releases.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// Internal inconsistency (a link chain shorter than the recorded
    /// length). Should not happen on trees built by this crate.
    Unknown,

    /// A container walk needed a child that was never linked (e.g. an
    /// `array_token` with non-zero length handed to the non-streamed
    /// encoder).
    MissingChild,

    /// An operation was invoked on a context in the wrong mode.
    /// Unreachable through this API (modes are fixed at construction);
    /// the code is reserved so the numeric space stays stable.
    WrongMode,

    /// The input or output buffer ended inside an unfinished item.
    UnexpectedEnd,

    /// The caller-supplied node pool has no free slots left.
    PoolExhausted,

    /// The caller-supplied node pool has zero capacity.
    EmptyPool,

    /// A child or chunk index is past the end of the item.
    IndexOutOfBounds,

    /// Raw bytes were requested from a chunked (indefinite) string.
    StringIsChunked,

    /// Chunk data was requested from a definite string.
    StringNotChunked,

    /// The encoded integer payload is wider than the requested type.
    ValueOverflow,

    /// Definite containers nest deeper than the decoder's depth cap.
    DepthExceeded,

    /// Half floats outside binary16, unassigned simple values, or other
    /// constructs this codec recognizes but does not decode.
    NotSupported,

    /// The additional-information bits of a header byte are not valid
    /// for the item's major type.
    InvalidAdditional,

    /// A chunk inside an indefinite string has a different major type
    /// than the string itself.
    ChunkTypeMismatch,

    /// An indefinite string contains another indefinite string.
    NestedIndefiniteString,

    /// A map's children do not pair up (odd wire count, or key/value
    /// slices of different lengths handed to the map composer).
    KeyValueMismatch,

    /// A stop code (0xFF) appeared outside an indefinite container.
    UnexpectedStopCode,

    /// A typed accessor was called on an item of a different type.
    TypeMismatch,

    /// Indefinite items cannot be produced by the non-streamed encoder.
    CannotEncodeIndefinite,

    /// The cursor was already empty when a decode was requested. This is
    /// the clean loop terminator, not a malformed input.
    EndOfBuffer,

    /// A stop code was consumed inside an indefinite item. Internal to
    /// the decoder; public calls translate stray occurrences into
    /// [`Error::UnexpectedStopCode`].
    EndOfIndefinite,
}

impl Error {
    /// Stable numeric code for this error.
    pub const fn code(self) -> u32 {
        match self {
            Self::Unknown => 1,
            Self::MissingChild => 20,
            Self::WrongMode => 30,
            Self::UnexpectedEnd => 50,
            Self::PoolExhausted => 51,
            Self::EmptyPool => 52,
            Self::IndexOutOfBounds => 53,
            Self::StringIsChunked => 54,
            Self::StringNotChunked => 55,
            Self::ValueOverflow => 56,
            Self::DepthExceeded => 57,
            Self::NotSupported => 100,
            Self::InvalidAdditional => 101,
            Self::ChunkTypeMismatch => 102,
            Self::NestedIndefiniteString => 103,
            Self::KeyValueMismatch => 104,
            Self::UnexpectedStopCode => 105,
            Self::TypeMismatch => 106,
            Self::CannotEncodeIndefinite => 107,
            Self::EndOfBuffer => 200,
            Self::EndOfIndefinite => 201,
        }
    }
}

// Manual implementation of Display for no_std environments.
impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Internal link inconsistency"),
            Self::MissingChild => write!(f, "Container child is not linked"),
            Self::WrongMode => write!(f, "Operation not allowed in this mode"),
            Self::UnexpectedEnd => write!(f, "Buffer ended inside an item"),
            Self::PoolExhausted => write!(f, "Node pool exhausted"),
            Self::EmptyPool => write!(f, "Node pool has zero capacity"),
            Self::IndexOutOfBounds => write!(f, "Index past end of item"),
            Self::StringIsChunked => write!(f, "String is chunked (indefinite)"),
            Self::StringNotChunked => write!(f, "String is not chunked (definite)"),
            Self::ValueOverflow => write!(f, "Integer wider than requested type"),
            Self::DepthExceeded => write!(f, "Nesting deeper than the decode depth cap"),
            Self::NotSupported => write!(f, "Recognized but unsupported construct"),
            Self::InvalidAdditional => write!(f, "Invalid additional-information bits"),
            Self::ChunkTypeMismatch => write!(f, "Chunk major type differs from string"),
            Self::NestedIndefiniteString => write!(f, "Nested indefinite string"),
            Self::KeyValueMismatch => write!(f, "Map children do not pair up"),
            Self::UnexpectedStopCode => write!(f, "Stop code outside an indefinite container"),
            Self::TypeMismatch => write!(f, "Item has a different type"),
            Self::CannotEncodeIndefinite => {
                write!(f, "Indefinite items need the streamed encoder")
            }
            Self::EndOfBuffer => write!(f, "End of buffer"),
            Self::EndOfIndefinite => write!(f, "End of indefinite item"),
        }
    }
}

// Enable standard Error trait if the "std" feature is on.
#[cfg(feature = "std")]
impl std::error::Error for Error {}
