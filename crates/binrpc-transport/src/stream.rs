use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::Result;
use crate::udp::DatagramStream;

/// A connected transport stream. Implements `Read` and `Write`.
///
/// This is the I/O type returned by [`crate::connect`]. Timeouts set here are
/// what bound a blocking BINRPC round trip; the codec itself never waits.
pub struct TransportStream {
    inner: StreamInner,
}

enum StreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    Tcp(TcpStream),
    Udp(DatagramStream),
}

impl Read for TransportStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.read(buf),
            StreamInner::Tcp(stream) => stream.read(buf),
            StreamInner::Udp(stream) => stream.read(buf),
        }
    }
}

impl Write for TransportStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.write(buf),
            StreamInner::Tcp(stream) => stream.write(buf),
            StreamInner::Udp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.flush(),
            StreamInner::Tcp(stream) => stream.flush(),
            StreamInner::Udp(stream) => stream.flush(),
        }
    }
}

impl TransportStream {
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: StreamInner::Unix(stream),
        }
    }

    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        Self {
            inner: StreamInner::Tcp(stream),
        }
    }

    pub(crate) fn from_datagram(stream: DatagramStream) -> Self {
        Self {
            inner: StreamInner::Udp(stream),
        }
    }

    /// Set read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            StreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            StreamInner::Udp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            StreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            StreamInner::Udp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new socket handle).
    ///
    /// Datagram streams get fresh, empty read and write buffers.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            StreamInner::Tcp(stream) => Ok(Self::from_tcp(stream.try_clone()?)),
            StreamInner::Udp(stream) => Ok(Self::from_datagram(stream.try_clone()?)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            StreamInner::Unix(_) => "unix",
            StreamInner::Tcp(_) => "tcp",
            StreamInner::Udp(_) => "udp",
        }
    }
}

impl std::fmt::Debug for TransportStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportStream")
            .field("type", &self.transport_name())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn unix_pair_roundtrip_and_clone() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut left = TransportStream::from_unix(left);
        let right = TransportStream::from_unix(right);
        let mut reader = right.try_clone().unwrap();

        left.write_all(b"ping").unwrap();
        left.flush().unwrap();

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");
        assert_eq!(right.transport_name(), "unix");
    }

    #[test]
    fn read_timeout_applies() {
        let (_left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut right = TransportStream::from_unix(right);
        right
            .set_read_timeout(Some(Duration::from_millis(10)))
            .unwrap();
        right
            .set_write_timeout(Some(Duration::from_millis(10)))
            .unwrap();

        let mut buf = [0u8; 1];
        let err = right.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
        ));
    }

    #[test]
    fn debug_names_transport() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let stream = TransportStream::from_unix(left);
        assert_eq!(format!("{stream:?}"), "TransportStream { type: \"unix\" }");
    }
}
