use std::io::Write;

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{encode_header, encode_record};
use crate::cookie::{CookieSource, RandomCookies};
use crate::error::{CodecError, Result};
use crate::packet::{encode_envelope, CodecConfig, Cookie, Envelope, PacketKind, MAX_HEADER_SIZE};
use crate::record::Record;
use crate::types::TypeTag;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Writes complete request packets to any `Write` stream.
pub struct RequestWriter<T, C = RandomCookies> {
    inner: T,
    buf: BytesMut,
    body: BytesMut,
    config: CodecConfig,
    cookies: C,
}

impl<T: Write> RequestWriter<T> {
    /// Create a new request writer with default configuration and random cookies.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, CodecConfig::default())
    }

    /// Create a new request writer with explicit configuration.
    pub fn with_config(inner: T, config: CodecConfig) -> Self {
        Self::with_cookie_source(inner, config, RandomCookies)
    }
}

impl<T: Write, C: CookieSource> RequestWriter<T, C> {
    /// Create a request writer drawing cookies from `cookies`.
    pub fn with_cookie_source(inner: T, config: CodecConfig, cookies: C) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            body: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            cookies,
        }
    }

    /// Encode and send one request (blocking).
    ///
    /// The body is the method name as a string record followed by one record
    /// per argument, in order. Arguments must be scalars. Nothing is written
    /// if encoding fails. Returns the cookie the reply must carry.
    pub fn write_request(&mut self, method: &str, args: &[Record]) -> Result<Cookie> {
        self.body.clear();
        encode_header(TypeTag::String, method.len() + 1, &mut self.body)?;
        self.body.extend_from_slice(method.as_bytes());
        self.body.extend_from_slice(&[0]);
        for arg in args {
            encode_record(arg, &mut self.body)?;
        }

        if self.body.len() > self.config.max_body_size {
            return Err(CodecError::PacketTooLarge {
                size: self.body.len(),
                max: self.config.max_body_size,
            });
        }

        let cookie = self.cookies.next_cookie();
        self.buf.clear();
        self.buf.reserve(MAX_HEADER_SIZE + self.body.len());
        encode_envelope(
            &Envelope {
                kind: PacketKind::Request,
                body_len: self.body.len(),
                cookie,
            },
            &mut self.buf,
        )?;
        self.buf.extend_from_slice(&self.body);

        self.inner.write_all(&self.buf)?;
        self.inner.flush()?;

        trace!(method, %cookie, body_len = self.body.len(), "wrote request");
        Ok(cookie)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current writer configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

/// Write one request to `output` with a random cookie.
pub fn write_request<W: Write>(output: &mut W, method: &str, args: &[Record]) -> Result<Cookie> {
    RequestWriter::new(output).write_request(method, args)
}
