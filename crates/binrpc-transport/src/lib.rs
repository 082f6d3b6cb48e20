//! Blocking stream transports for BINRPC clients.
//!
//! Provides a unified duplex byte stream over the socket kinds a BINRPC
//! control interface usually listens on:
//! - Unix domain stream sockets
//! - TCP
//! - UDP, wrapped so that one flushed write is one datagram
//!
//! This is glue only. The codec never depends on it; anything implementing
//! `Read + Write` can carry BINRPC packets.

pub mod connect;
pub mod endpoint;
pub mod error;
pub mod stream;
pub mod tcp;
pub mod udp;

#[cfg(unix)]
pub mod uds;

pub use connect::connect;
pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use stream::TransportStream;
pub use udp::DatagramStream;

#[cfg(unix)]
pub use uds::UnixDomainSocket;
