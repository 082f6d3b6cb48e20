use crate::packet::Cookie;
use crate::types::TypeTag;

/// Errors that can occur while encoding, decoding or framing records.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A wire tag outside the supported set, or a value that cannot be sent.
    #[error("unsupported record type {tag}: {reason}")]
    UnsupportedType { tag: u8, reason: &'static str },

    /// A strict accessor was called on a record of another type.
    #[error("type error: expected {expected} record, found {found}")]
    TypeError { expected: TypeTag, found: TypeTag },

    /// A record's declared length does not fit the bytes available.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The packet envelope is structurally invalid.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// The reply carries a different cookie than the request.
    #[error("cookie mismatch (expected {expected}, found {found})")]
    CookieMismatch { expected: Cookie, found: Cookie },

    /// The stream ended before the declared length was read.
    #[error("incomplete response ({received} of {expected} bytes before end of stream)")]
    IncompleteResponse { expected: usize, received: usize },

    /// The conversion layer cannot produce the requested kind.
    #[error("cannot convert {from} record to {to}: {reason}")]
    ConversionError {
        from: TypeTag,
        to: &'static str,
        reason: String,
    },

    /// A packet body exceeds the configured maximum.
    #[error("packet too large ({size} bytes, max {max})")]
    PacketTooLarge { size: usize, max: usize },

    /// The peer answered with a fault packet.
    #[error("peer fault {code}: {message}")]
    Fault { code: i64, message: String },

    /// An I/O error from the underlying stream, passed through unchanged.
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
