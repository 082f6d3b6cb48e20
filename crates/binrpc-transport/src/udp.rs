use std::io::{self, Read, Write};
use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// Largest datagram a UDP socket can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65_535;

/// A connected UDP socket that looks like a byte stream.
///
/// Writes accumulate until [`Write::flush`], which sends everything buffered
/// as a single datagram. Each flushed datagram is answered by exactly one
/// received datagram: reads drain it across calls and then report end of
/// stream until the next flush. A flush discards any unread tail of the
/// previous reply. Clones share the flush count, so a reader clone follows
/// requests sent through a writer clone.
pub struct DatagramStream {
    socket: UdpSocket,
    rbuf: Vec<u8>,
    rpos: usize,
    wbuf: Vec<u8>,
    sent: Arc<AtomicU64>,
    answered: u64,
}

impl DatagramStream {
    /// Bind an ephemeral local port and connect it to `addr`.
    pub fn connect(addr: &str) -> Result<Self> {
        let connect_err = |source| TransportError::Connect {
            endpoint: format!("udp:{addr}"),
            source,
        };

        let remote = addr
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| {
                connect_err(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "address resolved to nothing",
                ))
            })?;
        let local = if remote.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };

        let socket = UdpSocket::bind(local).map_err(connect_err)?;
        socket.connect(remote).map_err(connect_err)?;
        debug!(%remote, "connected udp socket");
        Ok(Self::from_socket(socket))
    }

    /// Wrap an already connected UDP socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self::with_counter(socket, Arc::new(AtomicU64::new(0)))
    }

    fn with_counter(socket: UdpSocket, sent: Arc<AtomicU64>) -> Self {
        let answered = sent.load(Ordering::Acquire);
        Self {
            socket,
            rbuf: Vec::new(),
            rpos: 0,
            wbuf: Vec::new(),
            sent,
            answered,
        }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_read_timeout(timeout)
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.socket.set_write_timeout(timeout)
    }

    /// Clone the socket handle. The clone starts with empty buffers and
    /// shares the flush count.
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(Self::with_counter(
            self.socket.try_clone()?,
            Arc::clone(&self.sent),
        ))
    }

    /// Borrow the underlying socket.
    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }
}

impl Read for DatagramStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let sent = self.sent.load(Ordering::Acquire);
        if self.answered != sent {
            // A newer request went out; the rest of the old reply is stale.
            self.rbuf.clear();
            self.rpos = 0;
        }

        if self.rpos >= self.rbuf.len() {
            if self.answered == sent {
                return Ok(0);
            }
            self.rbuf.resize(MAX_DATAGRAM_SIZE, 0);
            let received = match self.socket.recv(&mut self.rbuf) {
                Ok(n) => n,
                Err(err) => {
                    self.rbuf.clear();
                    self.rpos = 0;
                    return Err(err);
                }
            };
            self.rbuf.truncate(received);
            self.rpos = 0;
            self.answered = sent;
        }

        let available = &self.rbuf[self.rpos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.rpos += n;
        Ok(n)
    }
}

impl Write for DatagramStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.wbuf.len() + buf.len() > MAX_DATAGRAM_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "datagram exceeds maximum UDP payload",
            ));
        }
        self.wbuf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.wbuf.is_empty() {
            return Ok(());
        }
        let sent = self.socket.send(&self.wbuf)?;
        if sent != self.wbuf.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "datagram truncated on send",
            ));
        }
        self.wbuf.clear();
        self.sent.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl std::fmt::Debug for DatagramStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramStream")
            .field("peer", &self.socket.peer_addr().ok())
            .field("buffered_read", &(self.rbuf.len() - self.rpos.min(self.rbuf.len())))
            .field("buffered_write", &self.wbuf.len())
            .finish()
    }
}
