use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::decode_records;
use crate::error::{CodecError, Result};
use crate::packet::{
    decode_envelope, envelope_size, CodecConfig, Cookie, Envelope, PacketKind,
    FIXED_HEADER_SIZE, MAX_HEADER_SIZE,
};
use crate::record::Record;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Reads complete reply packets from any `Read` stream.
///
/// Reads exactly one packet per call and never buffers past it, so the
/// stream stays aligned on the next packet even after a cookie mismatch.
pub struct ResponseReader<T> {
    inner: T,
    buf: BytesMut,
    config: CodecConfig,
}

impl<T: Read> ResponseReader<T> {
    /// Create a new response reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new response reader with explicit configuration.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the reply to the request that was sent with `expected` (blocking).
    ///
    /// The whole body is consumed before the cookie is compared. A fault
    /// reply with the right cookie becomes [`CodecError::Fault`].
    pub fn read_response(&mut self, expected: Cookie) -> Result<Vec<Record>> {
        let envelope = self.read_envelope()?;

        if envelope.body_len > self.config.max_body_size {
            return Err(CodecError::PacketTooLarge {
                size: envelope.body_len,
                max: self.config.max_body_size,
            });
        }

        self.buf.clear();
        self.buf.resize(envelope.body_len, 0);
        let received = read_full(&mut self.inner, &mut self.buf)?;
        if received < envelope.body_len {
            return Err(CodecError::IncompleteResponse {
                expected: envelope.body_len,
                received,
            });
        }

        if envelope.cookie != expected {
            return Err(CodecError::CookieMismatch {
                expected,
                found: envelope.cookie,
            });
        }

        let records = match envelope.kind {
            PacketKind::Reply => decode_records(&self.buf)?,
            PacketKind::Fault => return Err(fault(decode_records(&self.buf)?)),
            PacketKind::Request => {
                return Err(CodecError::MalformedPacket(
                    "expected a reply, received a request".into(),
                ))
            }
        };

        trace!(cookie = %expected, records = records.len(), "read response");
        Ok(records)
    }

    fn read_envelope(&mut self) -> Result<Envelope> {
        let mut header = [0u8; MAX_HEADER_SIZE];

        let received = read_full(&mut self.inner, &mut header[..FIXED_HEADER_SIZE])?;
        if received < FIXED_HEADER_SIZE {
            return Err(CodecError::IncompleteResponse {
                expected: FIXED_HEADER_SIZE,
                received,
            });
        }

        let size = envelope_size([header[0], header[1]])?;
        let received = read_full(&mut self.inner, &mut header[FIXED_HEADER_SIZE..size])?;
        if received < size - FIXED_HEADER_SIZE {
            return Err(CodecError::IncompleteResponse {
                expected: size,
                received: FIXED_HEADER_SIZE + received,
            });
        }

        let (envelope, _) = decode_envelope(&header[..size])?.ok_or_else(|| {
            CodecError::MalformedPacket("envelope shorter than announced".into())
        })?;
        Ok(envelope)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reader configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

/// Read one reply for `expected` from `input`.
pub fn read_response<R: Read>(input: &mut R, expected: Cookie) -> Result<Vec<Record>> {
    ResponseReader::new(input).read_response(expected)
}

/// Fill `buf` from `inner`, returning how many bytes arrived before EOF.
fn read_full<T: Read>(inner: &mut T, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(CodecError::Io(err)),
        }
    }
    Ok(filled)
}

fn fault(records: Vec<Record>) -> CodecError {
    let mut records = records.into_iter();
    let code = records.next().and_then(|r| r.as_int().ok());
    let message = records
        .next()
        .and_then(|r| r.as_str().ok().map(str::to_string))
        .unwrap_or_default();
    match code {
        Some(code) => CodecError::Fault { code, message },
        None => CodecError::MalformedPacket("fault reply without an integer code".into()),
    }
}
