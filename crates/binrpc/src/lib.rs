//! Client side of the BINRPC wire protocol.
//!
//! # Crate Structure
//!
//! - [`transport`]: Connected byte streams (Unix sockets, TCP, UDP)
//! - [`codec`]: Record encoding and request/response packet framing
//! - [`client`]: Blocking method calls over a transport (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use binrpc_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use binrpc_codec::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use binrpc_client::*;
}
