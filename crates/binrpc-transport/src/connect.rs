use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::stream::TransportStream;
use crate::udp::DatagramStream;

/// Open a blocking stream to `endpoint`.
///
/// `timeout` bounds TCP connection establishment only; Unix and UDP connects
/// do not block on the peer.
pub fn connect(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<TransportStream> {
    match endpoint {
        #[cfg(unix)]
        Endpoint::Unix(path) => crate::uds::UnixDomainSocket::connect(path),
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(crate::error::TransportError::Unsupported("unix")),
        Endpoint::Tcp(addr) => crate::tcp::connect(addr, timeout),
        Endpoint::Udp(addr) => Ok(TransportStream::from_datagram(DatagramStream::connect(
            addr,
        )?)),
    }
}
