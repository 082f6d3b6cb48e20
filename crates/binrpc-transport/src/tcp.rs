use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::TransportStream;

/// Connect to a TCP `host:port` (blocking).
///
/// With a `timeout`, every resolved address is tried in turn with
/// `TcpStream::connect_timeout`; the last failure is reported.
pub fn connect(addr: &str, timeout: Option<Duration>) -> Result<TransportStream> {
    let connect_err = |source| TransportError::Connect {
        endpoint: format!("tcp:{addr}"),
        source,
    };

    let stream = match timeout {
        None => TcpStream::connect(addr).map_err(connect_err)?,
        Some(timeout) => {
            let mut last_err = io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "address resolved to nothing",
            );
            let mut connected = None;
            for candidate in addr.to_socket_addrs().map_err(connect_err)? {
                match TcpStream::connect_timeout(&candidate, timeout) {
                    Ok(stream) => {
                        connected = Some(stream);
                        break;
                    }
                    Err(err) => last_err = err,
                }
            }
            connected.ok_or_else(|| connect_err(last_err))?
        }
    };

    stream.set_nodelay(true)?;
    debug!(addr, "connected to tcp endpoint");
    Ok(TransportStream::from_tcp(stream))
}
