//! BINRPC record codec and request/response packet framing.
//!
//! This is the core of the workspace. Every value on the wire is a record:
//! - A 1-byte header (extended-length flag, size field, type tag)
//! - An optional big-endian length when the payload is 8 bytes or more
//! - The payload itself
//!
//! Packets wrap a sequence of records in an envelope carrying the body length
//! and a correlation cookie. Readers and writers work over any blocking
//! `Read`/`Write` stream; nothing here opens connections.

pub mod codec;
pub mod convert;
pub mod cookie;
pub mod error;
pub mod packet;
pub mod reader;
pub mod record;
pub mod types;
pub mod writer;

pub use codec::{decode_record, decode_records, encode_header, encode_record, MAX_NESTING_DEPTH};
pub use convert::FromRecord;
pub use cookie::{CookieSource, RandomCookies, SequentialCookies};
pub use error::{CodecError, Result};
pub use packet::{
    decode_envelope, encode_envelope, envelope_size, CodecConfig, Cookie, Envelope, PacketKind,
    DEFAULT_MAX_BODY_SIZE, FIXED_HEADER_SIZE, MAX_HEADER_SIZE,
};
pub use reader::{read_response, ResponseReader};
pub use record::{Record, StructItem, Value};
pub use types::TypeTag;
pub use writer::{write_request, RequestWriter};
