use std::io::{Read, Write};
use std::time::Duration;

use binrpc_codec::{CodecConfig, Record, RequestWriter, ResponseReader};
use binrpc_transport::TransportStream;
use tracing::debug;

use crate::error::Result;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bound on TCP connection establishment. Default: 5 s.
    pub connect_timeout: Option<Duration>,
    /// Read timeout applied to the stream. Default: 5 s.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to the stream. Default: 5 s.
    pub write_timeout: Option<Duration>,
    /// Packet size limits.
    pub codec: CodecConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            read_timeout: Some(Duration::from_secs(5)),
            write_timeout: Some(Duration::from_secs(5)),
            codec: CodecConfig::default(),
        }
    }
}

/// A connection to a BINRPC server.
///
/// One request is in flight at a time: [`Client::issue`] writes the request
/// and blocks until the matching reply has been read.
pub struct Client<R = TransportStream, W = TransportStream> {
    reader: ResponseReader<R>,
    writer: RequestWriter<W>,
    issued: u64,
}

impl<R: Read, W: Write> Client<R, W> {
    /// Build a client from the two halves of a duplex stream.
    pub fn from_streams(reader: R, writer: W, codec: CodecConfig) -> Self {
        Self {
            reader: ResponseReader::with_config(reader, codec.clone()),
            writer: RequestWriter::with_config(writer, codec),
            issued: 0,
        }
    }

    /// Call `method` with `args` and return the reply's records.
    ///
    /// Arguments must be integer, string or double records.
    pub fn issue(&mut self, method: &str, args: &[Record]) -> Result<Vec<Record>> {
        let cookie = self.writer.write_request(method, args)?;
        let records = self.reader.read_response(cookie)?;
        self.issued += 1;
        debug!(method, %cookie, records = records.len(), "call completed");
        Ok(records)
    }

    /// Number of calls that completed successfully.
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Consume the client and return both stream halves.
    pub fn into_streams(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }
}

impl Client<TransportStream, TransportStream> {
    /// Build a client over a connected transport stream, applying timeouts.
    pub fn from_transport(stream: TransportStream, config: &ClientConfig) -> Result<Self> {
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        let reader = stream.try_clone()?;
        Ok(Self::from_streams(reader, stream, config.codec.clone()))
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        self.reader.get_ref().transport_name()
    }
}

impl<R, W> std::fmt::Debug for Client<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("issued", &self.issued)
            .finish_non_exhaustive()
    }
}
