//! Blocking BINRPC client.
//!
//! This is the "just works" layer. Connect to an endpoint, issue a method
//! call with scalar arguments, and get the reply's records back.

pub mod client;
pub mod connector;
pub mod error;

pub use client::{Client, ClientConfig};
pub use connector::{connect, connect_with_config};
pub use error::{ClientError, Result};
