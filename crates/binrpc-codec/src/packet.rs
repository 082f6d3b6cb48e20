use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};

// Layout follows BINRPC revision 1 as spoken by Kamailio's ctl module.
// Interop caveat: Kamailio encodes integers as 32-bit values, so a negative
// number arrives as 4 payload bytes and decodes here as its unsigned value
// (-1 reads as 4294967295). Records from this crate always use 8 bytes for
// negatives and round-trip exactly.

/// Protocol magic, high nibble of the first envelope byte.
pub const MAGIC: u8 = 0xA;

/// Protocol revision, low nibble of the first envelope byte.
pub const VERSION: u8 = 0x1;

/// Magic/version byte plus the flags/length-sizes byte.
pub const FIXED_HEADER_SIZE: usize = 2;

/// Fixed header plus at most 4 length bytes and 4 cookie bytes.
pub const MAX_HEADER_SIZE: usize = FIXED_HEADER_SIZE + 4 + 4;

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Packet type carried in the high nibble of the second envelope byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    Request = 0,
    Reply = 1,
    /// Error reply: body is an integer code followed by a message string.
    Fault = 3,
}

impl PacketKind {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(PacketKind::Request),
            1 => Some(PacketKind::Reply),
            3 => Some(PacketKind::Fault),
            _ => None,
        }
    }
}

/// Correlation token pairing a request with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cookie(u32);

impl Cookie {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Cookie {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The fixed-format header in front of every packet body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub kind: PacketKind,
    pub body_len: usize,
    pub cookie: Cookie,
}

/// Configuration for packet framing.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Maximum body size in bytes, for requests and replies. Default: 16 MiB.
    pub max_body_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Minimal big-endian bytes of `value`, never fewer than one.
fn minimal_be(value: u32) -> ([u8; 4], usize) {
    let bytes = value.to_be_bytes();
    let start = bytes.iter().take_while(|&&b| b == 0).count().min(3);
    (bytes, start)
}

/// Encode a packet envelope.
///
/// Wire format:
/// ```text
/// ┌───────────────┬──────────────────────────┬───────────┬───────────┐
/// │ magic|version │ type|(LL-1)<<2|(CL-1)    │ body len  │ cookie    │
/// │ 0xA1          │ 1 byte                   │ LL bytes  │ CL bytes  │
/// └───────────────┴──────────────────────────┴───────────┴───────────┘
/// ```
///
/// Length and cookie are big-endian and use as few bytes as possible (1–4).
pub fn encode_envelope(envelope: &Envelope, dst: &mut BytesMut) -> Result<()> {
    let body_len = u32::try_from(envelope.body_len).map_err(|_| CodecError::PacketTooLarge {
        size: envelope.body_len,
        max: u32::MAX as usize,
    })?;

    let (len_bytes, len_start) = minimal_be(body_len);
    let (cookie_bytes, cookie_start) = minimal_be(envelope.cookie.value());
    let len_size = (4 - len_start) as u8;
    let cookie_size = (4 - cookie_start) as u8;

    dst.reserve(FIXED_HEADER_SIZE + usize::from(len_size + cookie_size));
    dst.put_u8((MAGIC << 4) | VERSION);
    dst.put_u8(((envelope.kind as u8) << 4) | ((len_size - 1) << 2) | (cookie_size - 1));
    dst.put_slice(&len_bytes[len_start..]);
    dst.put_slice(&cookie_bytes[cookie_start..]);
    Ok(())
}

/// Validate the two fixed bytes and return the full envelope size they announce.
pub fn envelope_size(fixed: [u8; FIXED_HEADER_SIZE]) -> Result<usize> {
    let magic = fixed[0] >> 4;
    let version = fixed[0] & 0x0F;
    if magic != MAGIC {
        return Err(CodecError::MalformedPacket(format!(
            "bad magic {magic:#x} (expected {MAGIC:#x})"
        )));
    }
    if version != VERSION {
        return Err(CodecError::MalformedPacket(format!(
            "unsupported protocol version {version} (expected {VERSION})"
        )));
    }
    if PacketKind::from_bits(fixed[1] >> 4).is_none() {
        return Err(CodecError::MalformedPacket(format!(
            "unknown packet type {}",
            fixed[1] >> 4
        )));
    }

    let len_size = usize::from((fixed[1] >> 2) & 0x03) + 1;
    let cookie_size = usize::from(fixed[1] & 0x03) + 1;
    Ok(FIXED_HEADER_SIZE + len_size + cookie_size)
}

/// Decode an envelope from the start of `src`.
///
/// Returns `Ok(None)` if `src` doesn't hold the complete envelope yet;
/// otherwise the envelope and the number of header bytes it occupied.
pub fn decode_envelope(src: &[u8]) -> Result<Option<(Envelope, usize)>> {
    let Some(fixed) = src.get(..FIXED_HEADER_SIZE) else {
        return Ok(None);
    };
    let size = envelope_size([fixed[0], fixed[1]])?;
    if src.len() < size {
        return Ok(None);
    }

    let kind = PacketKind::from_bits(src[1] >> 4)
        .ok_or_else(|| CodecError::MalformedPacket("unknown packet type".into()))?;
    let len_size = usize::from((src[1] >> 2) & 0x03) + 1;
    let len_end = FIXED_HEADER_SIZE + len_size;

    let be = |bytes: &[u8]| bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    let body_len = be(&src[FIXED_HEADER_SIZE..len_end]) as usize;
    let cookie = Cookie(be(&src[len_end..size]));

    Ok(Some((
        Envelope {
            kind,
            body_len,
            cookie,
        },
        size,
    )))
}
